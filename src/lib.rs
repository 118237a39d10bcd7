//! minutex: structure and content extraction for .docx meeting reports
//!
//! This library reads Word meeting reports and produces formatting-annotated
//! text, a reconstructed table of contents, located section ranges, converted
//! equations and the decisions recorded in the report.

pub mod cli;
pub mod config;
pub mod decision;
pub mod document;
pub mod equation;
pub mod error;
pub mod section;

// Re-export commonly used types
pub use config::Config;
pub use decision::{DecisionExtractor, detect_meeting, extract_decisions};
pub use document::{Document, load_document};
pub use error::{ConversionError, LocateError, PackageError, PatternError};
pub use section::{SectionQuery, locate, locate_or_empty};
