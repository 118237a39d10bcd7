//! Error taxonomy
//!
//! Only [`PackageError`] is fatal for a document. Section lookups and equation
//! conversions fail locally and are recovered by their callers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The container could not be opened or is missing a required part.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "invalid file format: expected .docx, got .{0}\n\
        Note: only Word .docx containers are supported (not .doc, .xlsx, .zip, etc.)"
    )]
    UnsupportedExtension(String),

    #[error("this appears to be an Excel file (.xlsx); only Word documents (.docx) are supported")]
    Spreadsheet,

    #[error("unreadable container: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("invalid .docx file: missing {0}")]
    MissingPart(&'static str),

    #[error("failed to read {part}: {source}")]
    Read {
        part: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in {part}: {message}")]
    Xml { part: &'static str, message: String },
}

/// A section could not be found by any strategy of the search cascade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("section {id} ({title:?}) not found in document text")]
    BoundaryNotFound { id: String, title: String },
}

/// A single equation failed to convert.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to prepare scratch space: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("failed to launch converter {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("converter produced no output")]
    EmptyOutput,

    #[error("malformed equation markup: {0}")]
    Markup(String),

    #[error("batch deadline exceeded before dispatch")]
    BatchDeadline,

    #[error("conversion worker aborted: {0}")]
    Worker(String),
}

/// A configured pattern is not a valid regular expression.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern for {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: regex::Error,
    },
}
