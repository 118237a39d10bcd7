//! Decision extraction
//!
//! Paragraphs are scanned once, in document order. A paragraph that opens with
//! a decision-type prefix starts a decision; following paragraphs are
//! appended until a heading, another prefix or an annex heading. Everything
//! from the first annex heading on is ignored.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{Config, DecisionConfig, DecisionType};
use crate::document::{
    DecisionFlags, DecisionRecord, Document, EquationRecord, LocatedSection, MeetingInfo,
    Paragraph, SectionRange,
};
use crate::equation::{remap_equations, render_converted};
use crate::error::PatternError;
use crate::section::{locate_all, locate_node};

static ANNEX_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*annex\b").unwrap());

static FFS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bffs\b|\bfor\s+further\s+study\b").unwrap());

static TBD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btbd\b|\bto\s+be\s+determined\b").unwrap());

// "RAN1#116", "TSG RAN WG1 #116bis", "#116-e"
static MEETING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([^\s#]+)\s*)?#\s*(\d+[A-Za-z-]*)").unwrap());

static STEM_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[A-Za-z-]*").unwrap());

/// Paragraphs searched for the meeting number
const MEETING_SEARCH_PARAGRAPHS: usize = 20;

/// Meeting identity from an explicit id, the opening paragraphs, or the file name
pub fn detect_meeting(document: &Document, explicit: Option<&str>) -> MeetingInfo {
    if let Some(id) = explicit {
        let number = MEETING_NUMBER
            .captures(id)
            .and_then(|captures| captures.get(2))
            .or_else(|| STEM_NUMBER.find(id))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| id.to_string());
        return MeetingInfo {
            id: id.to_string(),
            number,
        };
    }

    for paragraph in document.paragraphs.iter().take(MEETING_SEARCH_PARAGRAPHS) {
        if let Some(captures) = MEETING_NUMBER.captures(&paragraph.plain) {
            let number = captures[2].to_string();
            let id = match captures.get(1) {
                Some(body) => format!("{}#{number}", body.as_str()),
                None => format!("#{number}"),
            };
            debug!(meeting = %id, "meeting detected from document text");
            return MeetingInfo { id, number };
        }
    }

    let stem = Path::new(&document.metadata.file_path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&document.title)
        .to_string();
    let number = STEM_NUMBER
        .find(&stem)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| stem.clone());
    MeetingInfo { id: stem, number }
}

/// Id of the innermost located section overlapping `[start, end)`
pub fn attribute_section(sections: &[LocatedSection], start: usize, end: usize) -> Option<String> {
    sections
        .iter()
        .filter(|section| overlaps(&section.range, start, end))
        .max_by_key(|section| (section.depth, section.range.start))
        .map(|section| section.id.clone())
}

fn overlaps(range: &SectionRange, start: usize, end: usize) -> bool {
    range.start < end.max(start + 1) && start < range.end
}

/// Byte span of the line starting at `offset` in the document text
fn line_span(document: &Document, offset: usize) -> (usize, usize) {
    let text = document.text.as_str();
    let start = offset.min(text.len());
    let end = text[start..]
        .find('\n')
        .map_or(text.len(), |position| start + position);
    (start, end)
}

struct TypeMatcher {
    name: String,
    id_prefix: String,
    prefix: Regex,
}

impl TypeMatcher {
    fn new(decision_type: &DecisionType) -> Result<Self, PatternError> {
        let prefix = Regex::new(&format!(r"(?i)^\s*(?:{})\s*(?::|$)", decision_type.pattern))
            .map_err(|source| PatternError::Invalid {
                name: decision_type.name.clone(),
                source,
            })?;
        Ok(Self {
            name: decision_type.name.clone(),
            id_prefix: decision_type.id_prefix.clone(),
            prefix,
        })
    }
}

/// A decision being assembled
struct PendingDecision {
    matcher: usize,
    document_offset: usize,
    span_end: usize,
    raw: Vec<String>,
    marked: Vec<String>,
    equations: Vec<EquationRecord>,
}

impl PendingDecision {
    fn append(&mut self, paragraph: &Paragraph, raw: &str, records: &[EquationRecord]) {
        self.raw.push(raw.trim().to_string());
        self.marked.push(paragraph.marked.clone());
        self.equations.extend(
            paragraph
                .equations
                .iter()
                .filter_map(|&index| records.get(index).cloned()),
        );
    }
}

enum ScanState {
    Scanning,
    InDecision(PendingDecision),
    InAnnex,
}

/// Scans a document for decisions
pub struct DecisionExtractor {
    types: Vec<TypeMatcher>,
    references: Regex,
}

impl DecisionExtractor {
    pub fn new(config: &DecisionConfig) -> Result<Self, PatternError> {
        let types = config
            .types
            .iter()
            .map(TypeMatcher::new)
            .collect::<Result<Vec<_>, _>>()?;
        let references =
            Regex::new(&config.reference_pattern).map_err(|source| PatternError::Invalid {
                name: "reference_pattern".to_string(),
                source,
            })?;
        Ok(Self { types, references })
    }

    /// Matched type index and the text after the prefix
    fn match_start<'p>(&self, paragraph: &'p Paragraph) -> Option<(usize, &'p str)> {
        self.types.iter().enumerate().find_map(|(index, matcher)| {
            matcher
                .prefix
                .find(&paragraph.plain)
                .map(|found| (index, &paragraph.plain[found.end()..]))
        })
    }

    /// Extract decisions from the whole document.
    ///
    /// `equations` holds one record per equation job, indexed by global index.
    pub fn extract(
        &self,
        document: &Document,
        equations: &[EquationRecord],
        meeting: &MeetingInfo,
        sections: &[LocatedSection],
    ) -> Vec<DecisionRecord> {
        self.scan(document, equations, meeting, sections)
    }

    /// Extract only decisions that start inside `range`.
    ///
    /// Ids are numbered over the whole document, so a decision keeps the id
    /// it has in a full extraction.
    pub fn extract_in(
        &self,
        document: &Document,
        equations: &[EquationRecord],
        meeting: &MeetingInfo,
        sections: &[LocatedSection],
        range: SectionRange,
    ) -> Vec<DecisionRecord> {
        self.scan(document, equations, meeting, sections)
            .into_iter()
            .filter(|decision| {
                let (start, end) = line_span(document, decision.document_offset);
                overlaps(&range, start, end)
            })
            .collect()
    }

    fn scan(
        &self,
        document: &Document,
        equations: &[EquationRecord],
        meeting: &MeetingInfo,
        sections: &[LocatedSection],
    ) -> Vec<DecisionRecord> {
        let mut counters: HashMap<usize, u32> = HashMap::new();
        let mut decisions = Vec::new();
        let mut state = ScanState::Scanning;

        for paragraph in &document.paragraphs {
            let (span_start, span_end) = line_span(document, paragraph.offset);

            if is_annex_heading(paragraph) {
                if let ScanState::InDecision(pending) =
                    std::mem::replace(&mut state, ScanState::InAnnex)
                {
                    self.emit(pending, meeting, sections, &mut counters, &mut decisions);
                }
                debug!(paragraph = paragraph.index, "annex reached, decision scan stopped");
                break;
            }

            if paragraph.is_toc() {
                continue;
            }

            let start = self.match_start(paragraph);
            if start.is_some() || paragraph.is_heading() {
                if let ScanState::InDecision(pending) =
                    std::mem::replace(&mut state, ScanState::Scanning)
                {
                    self.emit(pending, meeting, sections, &mut counters, &mut decisions);
                }
            }

            if let Some((matcher, rest)) = start {
                let mut pending = PendingDecision {
                    matcher,
                    document_offset: span_start,
                    span_end,
                    raw: Vec::new(),
                    marked: Vec::new(),
                    equations: Vec::new(),
                };
                pending.append(paragraph, rest, equations);
                state = ScanState::InDecision(pending);
            } else if let ScanState::InDecision(pending) = &mut state {
                if !paragraph.plain.trim().is_empty() || !paragraph.equations.is_empty() {
                    pending.append(paragraph, &paragraph.plain, equations);
                    pending.span_end = span_end;
                }
            }
        }

        if let ScanState::InDecision(pending) = state {
            self.emit(pending, meeting, sections, &mut counters, &mut decisions);
        }

        info!(
            decisions = decisions.len(),
            meeting = %meeting.id,
            "decisions extracted"
        );
        decisions
    }

    fn emit(
        &self,
        pending: PendingDecision,
        meeting: &MeetingInfo,
        sections: &[LocatedSection],
        counters: &mut HashMap<usize, u32>,
        decisions: &mut Vec<DecisionRecord>,
    ) {
        let matcher = &self.types[pending.matcher];
        let raw_content = pending
            .raw
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        if raw_content.trim().is_empty() {
            debug!(
                offset = pending.document_offset,
                decision_type = %matcher.name,
                "empty decision discarded"
            );
            return;
        }

        let sequence = counters.entry(pending.matcher).or_insert(0);
        *sequence += 1;
        let id = format!("{}-{}-{:03}", matcher.id_prefix, meeting.number, sequence);

        let marked_content = pending.marked.join("\n");
        let mut equations = pending.equations;
        remap_equations(&marked_content, &mut equations);
        let converted_content = render_converted(&marked_content, &equations);

        let mut external_reference_ids: Vec<String> = Vec::new();
        for found in self.references.find_iter(&raw_content) {
            if !external_reference_ids.iter().any(|id| id == found.as_str()) {
                external_reference_ids.push(found.as_str().to_string());
            }
        }

        let flags = DecisionFlags {
            ffs: FFS_MARKER.is_match(&raw_content),
            tbd: TBD_MARKER.is_match(&raw_content),
            has_equations: !equations.is_empty(),
            has_invalid_equation: equations.iter().any(|equation| !equation.is_valid),
        };

        decisions.push(DecisionRecord {
            id,
            decision_type: matcher.name.clone(),
            meeting_id: meeting.id.clone(),
            section_id: attribute_section(sections, pending.document_offset, pending.span_end),
            document_offset: pending.document_offset,
            raw_content,
            marked_content,
            converted_content,
            equations,
            external_reference_ids,
            flags,
        });
    }
}

/// Extract decisions with section attribution, optionally restricted to one section.
///
/// An unknown or unlocatable section yields no decisions.
pub fn extract_decisions(
    document: &Document,
    equations: &[EquationRecord],
    meeting: &MeetingInfo,
    config: &Config,
    section: Option<&str>,
) -> Result<Vec<DecisionRecord>, PatternError> {
    let extractor = DecisionExtractor::new(&config.decisions)?;
    let sections = locate_all(document, &config.locator);

    let Some(section) = section else {
        return Ok(extractor.extract(document, equations, meeting, &sections));
    };

    match locate_node(document, section, &config.locator) {
        Ok(range) => Ok(extractor.extract_in(document, equations, meeting, &sections, range)),
        Err(err) => {
            warn!(section, error = %err, "section boundary not found");
            Ok(Vec::new())
        }
    }
}

fn is_annex_heading(paragraph: &Paragraph) -> bool {
    let annex_styled = paragraph
        .style
        .as_ref()
        .is_some_and(|style| style.name().to_lowercase().starts_with("annex"));
    (paragraph.is_heading() || annex_styled) && ANNEX_HEADING.is_match(&paragraph.plain)
}
