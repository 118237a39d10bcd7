//! Document parsing and data structures module
//!
//! This module reads .docx meeting reports and converts them into the
//! structured representation consumed by section location, equation
//! conversion and decision extraction.

pub mod loader;
pub mod models;
pub mod package;
pub(crate) mod parsing;

pub use loader::{annotate_paragraph_xml, load_document, parse_package};
pub use models::*;
pub use package::DocumentPackage;
pub use parsing::formatting::{Highlight, TextFormatting};
pub use parsing::styles::StyleMap;
pub use parsing::toc::reconstruct;
