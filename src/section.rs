//! Section location in the annotated text
//!
//! Section titles in the TOC and in the body drift apart (renumbering,
//! duplicated titles), so boundaries are found by an ordered list of search
//! strategies: explicit number first, title second, underline-style headings
//! last. The first strategy that matches wins.

use regex::Regex;
use tracing::warn;

use crate::config::LocatorConfig;
use crate::document::{AnnotatedText, Document, LocatedSection, SectionRange, TocNode};
use crate::error::LocateError;

/// What to look for: a TOC id and its title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionQuery<'a> {
    pub id: &'a str,
    pub title: &'a str,
    /// Synthetic ids never appear in the text, only the title is searched
    pub is_virtual: bool,
}

impl<'a> SectionQuery<'a> {
    pub fn new(id: &'a str, title: &'a str) -> Self {
        SectionQuery {
            id,
            title,
            is_virtual: false,
        }
    }

    /// Query for an entry that carried no number of its own
    pub fn unnumbered(id: &'a str, title: &'a str) -> Self {
        SectionQuery {
            id,
            title,
            is_virtual: true,
        }
    }

    pub fn from_node(node: &'a TocNode) -> Self {
        SectionQuery {
            id: &node.id,
            title: &node.title,
            is_virtual: node.is_virtual,
        }
    }
}

/// A heading found in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeadingMatch {
    line_start: usize,
    /// First byte after the heading (and its underline rule, if any)
    content_start: usize,
    level: usize,
}

type Strategy = fn(&str, usize, &SectionQuery, &LocatorConfig) -> Option<HeadingMatch>;

const START_STRATEGIES: &[Strategy] = &[by_number, by_title, by_underline];
const END_STRATEGIES: &[Strategy] = &[by_number, by_title];

fn run_strategies(
    strategies: &[Strategy],
    text: &str,
    from: usize,
    query: &SectionQuery,
    config: &LocatorConfig,
) -> Option<HeadingMatch> {
    strategies
        .iter()
        .find_map(|strategy| strategy(text, from, query, config))
}

fn line_end(text: &str, position: usize) -> usize {
    text[position..]
        .find('\n')
        .map(|i| position + i + 1)
        .unwrap_or(text.len())
}

fn title_prefix(title: &str, config: &LocatorConfig) -> Option<String> {
    let prefix: String = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(config.title_prefix_len.max(1))
        .collect();
    (!prefix.is_empty()).then_some(prefix)
}

fn atx_match(text: &str, from: usize, pattern: &str) -> Option<HeadingMatch> {
    let regex = Regex::new(pattern).ok()?;
    let captures = regex.captures(&text[from..])?;
    let whole = captures.get(0)?;
    let line_start = from + whole.start();
    Some(HeadingMatch {
        line_start,
        content_start: line_end(text, line_start),
        level: captures.get(1)?.as_str().len(),
    })
}

/// A heading marker immediately followed by the section number
fn by_number(
    text: &str,
    from: usize,
    query: &SectionQuery,
    _config: &LocatorConfig,
) -> Option<HeadingMatch> {
    let id = query.id.trim();
    if id.is_empty() || query.is_virtual {
        return None;
    }
    let pattern = format!(r"(?m)^(#{{1,9}})[ \t]+{}\.?(?:[ \t:]|$)", regex::escape(id));
    atx_match(text, from, &pattern)
}

/// A heading marker whose text contains the title prefix
fn by_title(
    text: &str,
    from: usize,
    query: &SectionQuery,
    config: &LocatorConfig,
) -> Option<HeadingMatch> {
    let prefix = title_prefix(query.title, config)?;
    let pattern = format!(r"(?mi)^(#{{1,9}})[ \t]+[^\n]*?{}", regex::escape(&prefix));
    atx_match(text, from, &pattern)
}

/// A title line followed by a rule of `=` or `-`
fn by_underline(
    text: &str,
    from: usize,
    query: &SectionQuery,
    config: &LocatorConfig,
) -> Option<HeadingMatch> {
    let prefix = title_prefix(query.title, config)?;
    let pattern = format!(
        r"(?mi)^[^\n]*{}[^\n]*\n(={{3,}}|-{{3,}})[ \t]*$",
        regex::escape(&prefix)
    );
    let regex = Regex::new(&pattern).ok()?;
    let captures = regex.captures(&text[from..])?;
    let whole = captures.get(0)?;
    let rule = captures.get(1)?.as_str();
    Some(HeadingMatch {
        line_start: from + whole.start(),
        content_start: line_end(text, from + whole.end()),
        level: if rule.starts_with('=') { 1 } else { 2 },
    })
}

/// Heading level of the line starting at `position`, if it is a heading
fn heading_level_at(text: &str, position: usize) -> Option<usize> {
    let end = line_end(text, position);
    let line = text[position..end].trim_end_matches('\n');

    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=9).contains(&hashes) && line[hashes..].starts_with([' ', '\t']) {
        return Some(hashes);
    }

    if line.trim().is_empty() || end >= text.len() {
        return None;
    }
    let next_end = line_end(text, end);
    let rule = text[end..next_end].trim();
    if rule.len() >= 3 && rule.chars().all(|c| c == '=') {
        return Some(1);
    }
    if rule.len() >= 3 && rule.chars().all(|c| c == '-') {
        return Some(2);
    }
    None
}

/// Start of the next heading at `level` or shallower
fn next_heading_at_or_above(text: &str, from: usize, level: usize) -> Option<usize> {
    let mut position = from;
    while position < text.len() {
        if heading_level_at(text, position).is_some_and(|found| found <= level) {
            return Some(position);
        }
        position = line_end(text, position);
    }
    None
}

/// Trim whitespace off both ends of a range
fn trimmed(text: &str, start: usize, end: usize) -> SectionRange {
    let slice = &text[start..end];
    if slice.trim().is_empty() {
        return SectionRange { start, end: start };
    }
    SectionRange {
        start: start + (slice.len() - slice.trim_start().len()),
        end: start + slice.trim_end().len(),
    }
}

/// Find the body range of a section, excluding its own heading line
pub fn locate(
    text: &AnnotatedText,
    current: &SectionQuery,
    next: Option<&SectionQuery>,
    config: &LocatorConfig,
) -> Result<SectionRange, LocateError> {
    let text = text.as_str();

    let start = run_strategies(START_STRATEGIES, text, 0, current, config).ok_or_else(|| {
        LocateError::BoundaryNotFound {
            id: current.id.to_string(),
            title: current.title.to_string(),
        }
    })?;
    let content_start = start.content_start.min(text.len());

    let end = next
        .and_then(|next| run_strategies(END_STRATEGIES, text, content_start, next, config))
        .map(|found| found.line_start)
        .or_else(|| next_heading_at_or_above(text, content_start, start.level))
        .unwrap_or(text.len());

    Ok(trimmed(text, content_start, end.max(content_start)))
}

/// Like [`locate`], recovering a missing section as an empty range
pub fn locate_or_empty(
    text: &AnnotatedText,
    current: &SectionQuery,
    next: Option<&SectionQuery>,
    config: &LocatorConfig,
) -> SectionRange {
    match locate(text, current, next, config) {
        Ok(range) => range,
        Err(err) => {
            warn!(section = current.id, error = %err, "section boundary not found");
            SectionRange::empty()
        }
    }
}

/// Locate a TOC node by id; with duplicate ids the first node wins
pub fn locate_node(
    document: &Document,
    id: &str,
    config: &LocatorConfig,
) -> Result<SectionRange, LocateError> {
    let Some(index) = document.toc.iter().position(|node| node.id == id) else {
        return Err(LocateError::BoundaryNotFound {
            id: id.to_string(),
            title: String::new(),
        });
    };
    locate_at(document, index, config)
}

/// Locate the TOC node at `index`; the end boundary is the next node that is not a descendant
fn locate_at(
    document: &Document,
    index: usize,
    config: &LocatorConfig,
) -> Result<SectionRange, LocateError> {
    let node = &document.toc[index];
    let next = document.toc[index + 1..]
        .iter()
        .find(|candidate| candidate.depth <= node.depth)
        .map(SectionQuery::from_node);

    locate(
        &document.text,
        &SectionQuery::from_node(node),
        next.as_ref(),
        config,
    )
}

/// Locate every TOC node; sections that cannot be found are skipped with a warning
pub fn locate_all(document: &Document, config: &LocatorConfig) -> Vec<LocatedSection> {
    document
        .toc
        .iter()
        .enumerate()
        .filter_map(|(index, node)| match locate_at(document, index, config) {
            Ok(range) => Some(LocatedSection {
                id: node.id.clone(),
                depth: node.depth,
                range,
            }),
            Err(err) => {
                warn!(section = %node.id, error = %err, "section boundary not found");
                None
            }
        })
        .collect()
}
