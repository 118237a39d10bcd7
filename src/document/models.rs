//! Core data structures for document representation
//!
//! This module defines the public types produced by the extraction pipeline:
//! paragraphs, TOC entries and nodes, section ranges, equations and decisions.

use serde::{Deserialize, Serialize};

use super::parsing::styles::StyleMap;

/// Result of looking up a paragraph style id in the style definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StyleLookup {
    /// The id was declared in the style part; holds the normalized name
    Resolved(String),
    /// The id was not declared; the raw id stands in for the name
    RawId(String),
}

impl StyleLookup {
    pub fn name(&self) -> &str {
        match self {
            StyleLookup::Resolved(name) | StyleLookup::RawId(name) => name,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, StyleLookup::Resolved(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphKind {
    Heading { level: u8 },
    TocEntry { depth: u8 },
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    #[default]
    Inline,
    Block,
}

/// One paragraph of the body, in document order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub index: usize,
    pub style: Option<StyleLookup>,
    pub kind: ParagraphKind,
    /// Unformatted text, equations included as their plain text
    pub plain: String,
    /// Formatting-annotated text
    pub marked: String,
    /// Offset of this paragraph's line in the annotated document text
    pub offset: usize,
    /// Global indices of the equations found in this paragraph
    pub equations: Vec<usize>,
    /// First bookmark name, used as a TOC anchor for headings
    pub bookmark: Option<String>,
    /// Hyperlink anchor, present on generated TOC lines
    pub anchor: Option<String>,
}

impl Paragraph {
    pub fn is_heading(&self) -> bool {
        matches!(self.kind, ParagraphKind::Heading { .. })
    }

    pub fn is_toc(&self) -> bool {
        matches!(self.kind, ParagraphKind::TocEntry { .. })
    }
}

/// Immutable annotated document text; all ranges are byte offsets into it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotatedText(String);

impl AnnotatedText {
    pub fn new(text: impl Into<String>) -> Self {
        AnnotatedText(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slice(&self, range: &SectionRange) -> &str {
        self.0.get(range.start..range.end).unwrap_or("")
    }
}

impl std::fmt::Display for AnnotatedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTocEntry {
    pub text: String,
    pub style_name: String,
    pub depth: u8,
    pub page: Option<u32>,
    pub anchor: Option<String>,
    pub unnumbered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocNode {
    pub id: String,
    pub title: String,
    pub depth: u8,
    pub parent: Option<String>,
    pub children: Vec<String>,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRange {
    pub start: usize,
    pub end: usize,
}

impl SectionRange {
    pub fn empty() -> Self {
        SectionRange { start: 0, end: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A section range tagged with the TOC id it was located for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedSection {
    pub id: String,
    pub depth: u8,
    #[serde(flatten)]
    pub range: SectionRange,
}

/// A math element collected from a paragraph, awaiting conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationJob {
    pub global_index: usize,
    /// The `m:oMath` subtree serialized back to markup
    pub omml: String,
    pub paragraph_index: usize,
    pub position_in_paragraph: usize,
    pub plain_text: String,
    pub display: DisplayType,
    /// Offset within the paragraph's text as it appears in the document text
    pub paragraph_offset: usize,
    pub document_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub latex: String,
    pub success: bool,
    pub diagnostic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationRecord {
    pub global_index: usize,
    /// Sequential index within the paragraph, or within the decision after remapping
    pub position: usize,
    pub plain_text: String,
    pub converted_markup: String,
    pub paragraph_offset: usize,
    /// Document offset until remapped, decision-local offset afterwards
    pub offset: usize,
    pub length: usize,
    pub display: DisplayType,
    pub is_valid: bool,
    pub note: Option<String>,
    /// Set once the decision-level remap located the equation in the content
    pub remapped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFlags {
    pub ffs: bool,
    pub tbd: bool,
    pub has_equations: bool,
    pub has_invalid_equation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub decision_type: String,
    pub meeting_id: String,
    pub section_id: Option<String>,
    pub document_offset: usize,
    pub raw_content: String,
    pub marked_content: String,
    pub converted_content: String,
    pub equations: Vec<EquationRecord>,
    pub external_reference_ids: Vec<String>,
    pub flags: DecisionFlags,
}

/// Meeting identity used in decision ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingInfo {
    pub id: String,
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_path: String,
    pub file_size: u64,
    pub paragraph_count: usize,
    pub equation_count: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub metadata: DocumentMetadata,
    pub styles: StyleMap,
    pub paragraphs: Vec<Paragraph>,
    pub text: AnnotatedText,
    pub toc_entries: Vec<RawTocEntry>,
    pub toc: Vec<TocNode>,
    pub equations: Vec<EquationJob>,
}

impl Document {
    pub fn toc_node(&self, id: &str) -> Option<&TocNode> {
        self.toc.iter().find(|node| node.id == id)
    }
}
