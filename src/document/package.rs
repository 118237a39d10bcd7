//! Container access
//!
//! Opens the OOXML zip container, validates it is a Word document and pulls
//! the XML parts the pipeline needs into memory.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::error::PackageError;

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const STYLES_PART: &str = "word/styles.xml";
const SPREADSHEET_PART: &str = "xl/workbook.xml";

/// Raw XML parts of one document
#[derive(Debug, Clone)]
pub struct DocumentPackage {
    pub document_xml: String,
    /// Absent when the container carries no style definitions
    pub styles_xml: Option<String>,
}

/// Validates that the file is a .docx container and reads its parts
pub fn open(file_path: &Path) -> Result<DocumentPackage, PackageError> {
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    if !extension.eq_ignore_ascii_case("docx") {
        return Err(PackageError::UnsupportedExtension(extension.to_string()));
    }

    let file = File::open(file_path).map_err(|source| PackageError::Open {
        path: file_path.to_path_buf(),
        source,
    })?;

    read_package(file)
}

/// Reads the parts from any seekable zip source
pub fn read_package<R: Read + Seek>(reader: R) -> Result<DocumentPackage, PackageError> {
    let mut archive = ZipArchive::new(reader)?;

    let Some(document_xml) = read_part(&mut archive, DOCUMENT_PART)? else {
        if archive.by_name(SPREADSHEET_PART).is_ok() {
            return Err(PackageError::Spreadsheet);
        }
        return Err(PackageError::MissingPart(DOCUMENT_PART));
    };

    let styles_xml = read_part(&mut archive, STYLES_PART)?;

    Ok(DocumentPackage {
        document_xml,
        styles_xml,
    })
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &'static str,
) -> Result<Option<String>, PackageError> {
    let mut entry = match archive.by_name(part) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(PackageError::Archive(e)),
    };

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|source| PackageError::Read { part, source })?;

    // Some producers emit a byte order mark
    if let Some(stripped) = content.strip_prefix('\u{feff}') {
        content = stripped.to_string();
    }

    Ok(Some(content))
}
