//! Document loading and orchestration
//!
//! This module contains `load_document()`, which reads the container, resolves
//! styles, annotates every paragraph, collects equations and rebuilds the
//! table of contents.

use std::path::Path;
use tracing::{debug, info};

use super::models::*;
use super::package::{self, DocumentPackage, DOCUMENT_PART, STYLES_PART};
use super::parsing::equation::EquationCollector;
use super::parsing::formatting::{annotate, annotate_paragraph};
use super::parsing::styles::{paragraph_kind, StyleMap};
use super::parsing::toc::{collect_toc_entries, reconstruct};
use super::parsing::xml::{self, XmlElement};
use crate::error::PackageError;

/// Block containers whose paragraphs belong to the body flow, in document order
const BLOCK_CONTAINERS: &[&str] = &[
    "w:body",
    "w:tbl",
    "w:tr",
    "w:tc",
    "w:sdt",
    "w:sdtContent",
    "w:customXml",
];

/// Load and parse a .docx meeting report
pub fn load_document(file_path: &Path) -> Result<Document, PackageError> {
    let package = package::open(file_path)?;
    let file_size = std::fs::metadata(file_path).map(|m| m.len()).unwrap_or(0);

    let title = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled Document")
        .to_string();

    let mut document = parse_package(&package, &title)?;
    document.metadata.file_path = file_path.to_string_lossy().to_string();
    document.metadata.file_size = file_size;

    info!(
        path = %file_path.display(),
        paragraphs = document.paragraphs.len(),
        equations = document.equations.len(),
        toc_nodes = document.toc.len(),
        "document loaded"
    );

    Ok(document)
}

/// Parse already-read package parts
pub fn parse_package(package: &DocumentPackage, title: &str) -> Result<Document, PackageError> {
    let styles = match &package.styles_xml {
        Some(styles_xml) => {
            let root = xml::parse(styles_xml).map_err(|message| PackageError::Xml {
                part: STYLES_PART,
                message,
            })?;
            StyleMap::from_styles(&root)
        }
        None => {
            debug!("no style part, paragraph styles resolve to raw ids");
            StyleMap::default()
        }
    };

    let root = xml::parse(&package.document_xml).map_err(|message| PackageError::Xml {
        part: DOCUMENT_PART,
        message,
    })?;
    let body = root
        .child("w:body")
        .ok_or(PackageError::MissingPart("w:body"))?;

    let mut paragraph_elements = Vec::new();
    collect_paragraphs(body, &mut paragraph_elements);

    let mut paragraphs = Vec::with_capacity(paragraph_elements.len());
    let mut collector = EquationCollector::new();
    let mut text = String::new();
    let mut word_count = 0;

    for (index, element) in paragraph_elements.into_iter().enumerate() {
        let style = element
            .child("w:pPr")
            .and_then(|props| props.child("w:pStyle"))
            .and_then(|style| style.attr("w:val"))
            .map(|style_id| styles.lookup(style_id));
        let kind = paragraph_kind(style.as_ref());

        let mut annotation = annotate_paragraph(element);
        word_count += annotation.plain.split_whitespace().count();

        if index > 0 {
            text.push('\n');
        }

        // Headings are rendered as ATX lines over their plain text
        let (line, escapes) = match kind {
            ParagraphKind::Heading { level } => {
                text.push_str(&"#".repeat(level as usize));
                text.push(' ');
                for math in &mut annotation.math {
                    math.offset = math.plain_offset;
                }
                (annotation.plain.replace('\n', " "), Vec::new())
            }
            ParagraphKind::TocEntry { .. } => {
                for math in &mut annotation.math {
                    math.offset = math.plain_offset;
                }
                escape_heading_lookalikes(&annotation.plain)
            }
            ParagraphKind::Body => escape_heading_lookalikes(&annotation.marked),
        };

        let offset = text.len();
        text.push_str(&line);

        let equations = collector.collect(index, offset, &escapes, annotation.math);

        paragraphs.push(Paragraph {
            index,
            style,
            kind,
            plain: annotation.plain,
            marked: annotation.marked,
            offset,
            equations,
            bookmark: annotation.bookmark,
            anchor: annotation.anchor,
        });
    }

    let equations = collector.finish();
    let toc_entries = collect_toc_entries(&paragraphs);
    let toc = reconstruct(&toc_entries);

    debug!(
        styles = styles.len(),
        toc_entries = toc_entries.len(),
        "document structure parsed"
    );

    let metadata = DocumentMetadata {
        file_path: String::new(),
        file_size: 0,
        paragraph_count: paragraphs.len(),
        equation_count: equations.len(),
        word_count,
    };

    Ok(Document {
        title: title.to_string(),
        metadata,
        styles,
        paragraphs,
        text: AnnotatedText::new(text),
        toc_entries,
        toc,
        equations,
    })
}

/// Annotate a single serialized `w:p` element
pub fn annotate_paragraph_xml(paragraph_xml: &str) -> Result<String, PackageError> {
    let paragraph = xml::parse(paragraph_xml).map_err(|message| PackageError::Xml {
        part: DOCUMENT_PART,
        message,
    })?;
    Ok(annotate(&paragraph))
}

/// Backslash-escape lines that would read as headings: a leading `#` or a
/// bare `===`/`---` rule. Returns the text and the byte positions, in the
/// unescaped input, where a backslash was inserted.
fn escape_heading_lookalikes(content: &str) -> (String, Vec<usize>) {
    let mut escaped = String::with_capacity(content.len());
    let mut escapes = Vec::new();
    let mut position = 0;

    for (index, line) in content.split('\n').enumerate() {
        if index > 0 {
            escaped.push('\n');
        }
        if line.starts_with('#') || is_rule(line) {
            escaped.push('\\');
            escapes.push(position);
        }
        escaped.push_str(line);
        position += line.len() + 1;
    }

    (escaped, escapes)
}

fn is_rule(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && (line.chars().all(|c| c == '=') || line.chars().all(|c| c == '-'))
}

fn collect_paragraphs<'a>(container: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    for element in container.elements() {
        if element.is("w:p") {
            out.push(element);
        } else if BLOCK_CONTAINERS.contains(&element.name.as_str()) {
            collect_paragraphs(element, out);
        }
    }
}
