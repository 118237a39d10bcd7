//! Equation pipeline
//!
//! Jobs are collected while the document loads. This module converts them on
//! a worker pool, validates the output and remaps offsets once paragraphs are
//! merged into decisions.

pub mod convert;
pub(crate) mod omml;
pub mod remap;
pub mod validate;

use tracing::info;

use crate::config::Config;
use crate::document::{Document, EquationRecord};

pub use convert::{
    BuiltinConverter, CommandConverter, ConfiguredConverter, ConversionPool, Converter,
    ERROR_MARKER,
};
pub use remap::{remap_equations, render_converted};
pub use validate::{BracketImbalance, Validation, build_records, unconverted_records, validate};

/// Convert and validate every equation of a document with the given converter
pub async fn convert_with<C: Converter>(
    document: &Document,
    converter: C,
    config: &Config,
) -> Vec<EquationRecord> {
    let pool = ConversionPool::new(converter, &config.conversion);
    let results = pool.convert_all(&document.equations).await;
    let records = build_records(&document.equations, &results, &config.validation);

    info!(
        equations = records.len(),
        invalid = records.iter().filter(|record| !record.is_valid).count(),
        "equations converted"
    );

    records
}

/// Convert with the converter named in the configuration
pub async fn convert_document(document: &Document, config: &Config) -> Vec<EquationRecord> {
    convert_with(
        document,
        ConfiguredConverter::from_config(&config.conversion),
        config,
    )
    .await
}
