//! Paragraph style resolution
//!
//! Maps `w:pStyle` ids to normalized style names and derives heading levels
//! and TOC depths from those names.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::super::models::{ParagraphKind, StyleLookup};
use super::xml::XmlElement;

static HEADING_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^heading\s*(\d)$").unwrap());
static TOC_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^toc\s*(\d)$").unwrap());

/// styleId -> normalized style name, immutable once built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleMap {
    names: HashMap<String, String>,
}

impl StyleMap {
    /// Build from the root element of `word/styles.xml`
    pub(crate) fn from_styles(root: &XmlElement) -> Self {
        let mut names = HashMap::new();

        for style in root.elements().filter(|element| element.is("w:style")) {
            let Some(style_id) = style.attr("w:styleId") else {
                continue;
            };
            let name = style
                .child("w:name")
                .and_then(|name| name.attr("w:val"))
                .unwrap_or(style_id);
            names.insert(style_id.to_string(), normalize_style_name(name));
        }

        StyleMap { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn lookup(&self, style_id: &str) -> StyleLookup {
        match self.names.get(style_id) {
            Some(name) => StyleLookup::Resolved(name.clone()),
            None => StyleLookup::RawId(style_id.to_string()),
        }
    }
}

/// Lowercase, collapse whitespace
pub(crate) fn normalize_style_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub(crate) fn heading_level(style: &StyleLookup) -> Option<u8> {
    level_from(&HEADING_STYLE, style)
}

pub(crate) fn toc_depth(style: &StyleLookup) -> Option<u8> {
    level_from(&TOC_STYLE, style)
}

fn level_from(pattern: &Regex, style: &StyleLookup) -> Option<u8> {
    // Raw ids like `Heading2` or `TOC1` are normalized the same way as names
    let name = normalize_style_name(style.name());
    let captures = pattern.captures(&name)?;
    let level = captures.get(1)?.as_str().parse::<u8>().ok()?;
    (level >= 1).then_some(level)
}

/// Classify a paragraph by its style
pub(crate) fn paragraph_kind(style: Option<&StyleLookup>) -> ParagraphKind {
    let Some(style) = style else {
        return ParagraphKind::Body;
    };
    if let Some(level) = heading_level(style) {
        return ParagraphKind::Heading { level };
    }
    if let Some(depth) = toc_depth(style) {
        return ParagraphKind::TocEntry { depth };
    }
    ParagraphKind::Body
}
