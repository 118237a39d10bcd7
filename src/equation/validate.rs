//! Syntactic checks on converted markup

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::convert::{ERROR_MARKER, failure};
use crate::config::ValidationThresholds;
use crate::document::{ConversionResult, EquationJob, EquationRecord};
use crate::error::ConversionError;

// Sized delimiters pair up by construction, whatever character they carry
static DELIMITER_MACROS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:left|right|middle|[bB]igg?[lrm]?)\s*(?:\\[{}|]|\\[A-Za-z]+|[()\[\]|./<>])")
        .unwrap()
});

// A `\\` pair is a line break and is consumed first, so `\\{` keeps its brace
static ESCAPED_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:\\|[{}()\[\]])").unwrap());

/// Absolute open/close difference per bracket class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketImbalance {
    pub parens: usize,
    pub braces: usize,
    pub brackets: usize,
}

impl BracketImbalance {
    pub fn measure(latex: &str) -> Self {
        let neutral = DELIMITER_MACROS.replace_all(latex, "");
        let neutral = ESCAPED_BRACKETS.replace_all(&neutral, "");

        let (mut parens, mut braces, mut brackets) = (0i64, 0i64, 0i64);
        for ch in neutral.chars() {
            match ch {
                '(' => parens += 1,
                ')' => parens -= 1,
                '{' => braces += 1,
                '}' => braces -= 1,
                '[' => brackets += 1,
                ']' => brackets -= 1,
                _ => {}
            }
        }

        Self {
            parens: parens.unsigned_abs() as usize,
            braces: braces.unsigned_abs() as usize,
            brackets: brackets.unsigned_abs() as usize,
        }
    }

    pub fn is_balanced(&self) -> bool {
        *self == Self::default()
    }

    pub fn within(&self, thresholds: &ValidationThresholds) -> bool {
        self.parens <= thresholds.max_paren_imbalance
            && self.braces <= thresholds.max_brace_imbalance
            && self.brackets <= thresholds.max_bracket_imbalance
    }
}

impl fmt::Display for BracketImbalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parens {}, braces {}, brackets {}",
            self.parens, self.braces, self.brackets
        )
    }
}

/// Outcome of validating one conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    pub note: Option<String>,
}

pub fn validate(result: &ConversionResult, thresholds: &ValidationThresholds) -> Validation {
    if !result.success || result.latex.contains(ERROR_MARKER) {
        return Validation {
            is_valid: false,
            note: Some(
                result
                    .diagnostic
                    .clone()
                    .unwrap_or_else(|| "conversion error marker in output".to_string()),
            ),
        };
    }

    if result.latex.trim().is_empty() {
        return Validation {
            is_valid: false,
            note: Some("empty conversion output".to_string()),
        };
    }

    let imbalance = BracketImbalance::measure(&result.latex);
    if !imbalance.within(thresholds) {
        Validation {
            is_valid: false,
            note: Some(format!("bracket imbalance exceeds tolerance ({imbalance})")),
        }
    } else if !imbalance.is_balanced() {
        Validation {
            is_valid: true,
            note: Some(format!("bracket imbalance within tolerance ({imbalance})")),
        }
    } else {
        Validation {
            is_valid: true,
            note: None,
        }
    }
}

fn record(job: &EquationJob, converted_markup: String, validation: Validation) -> EquationRecord {
    EquationRecord {
        global_index: job.global_index,
        position: job.position_in_paragraph,
        plain_text: job.plain_text.clone(),
        converted_markup,
        paragraph_offset: job.paragraph_offset,
        offset: job.document_offset,
        length: job.plain_text.trim().len(),
        display: job.display,
        is_valid: validation.is_valid,
        note: validation.note,
        remapped: false,
    }
}

/// Validated records in job order; offsets are document offsets until remapped
pub fn build_records(
    jobs: &[EquationJob],
    results: &BTreeMap<usize, ConversionResult>,
    thresholds: &ValidationThresholds,
) -> Vec<EquationRecord> {
    jobs.iter()
        .map(|job| {
            let result = results.get(&job.global_index).cloned().unwrap_or_else(|| {
                failure(&ConversionError::Worker(
                    "no result recorded for this equation".to_string(),
                ))
            });
            let validation = validate(&result, thresholds);
            record(job, result.latex, validation)
        })
        .collect()
}

/// Records for a run without conversion: the plain text stands in as markup
pub fn unconverted_records(jobs: &[EquationJob]) -> Vec<EquationRecord> {
    jobs.iter()
        .map(|job| {
            record(
                job,
                job.plain_text.trim().to_string(),
                Validation {
                    is_valid: true,
                    note: Some("not converted".to_string()),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DisplayType;

    fn converted(latex: &str) -> ConversionResult {
        ConversionResult {
            latex: latex.to_string(),
            success: true,
            diagnostic: None,
        }
    }

    #[test]
    fn test_sized_delimiters_are_neutral() {
        let imbalance = BracketImbalance::measure(r"\left[ \frac{a}{b} \right) + \bigl\{ x \bigr.");
        assert!(imbalance.is_balanced());
        assert!(BracketImbalance::measure(r"\{ a \}").is_balanced());
    }

    #[test]
    fn test_line_break_before_brace_is_not_an_escape() {
        assert_eq!(BracketImbalance::measure(r"a \\{b").braces, 1);
        assert!(BracketImbalance::measure(r"a \\{b}").is_balanced());
        assert!(BracketImbalance::measure(r"a \\\{b").is_balanced());
        assert!(BracketImbalance::measure(r"\\ \{ x \}").is_balanced());
    }

    #[test]
    fn test_imbalance_counts() {
        assert_eq!(
            BracketImbalance::measure("((a) + {b + [c"),
            BracketImbalance {
                parens: 1,
                braces: 1,
                brackets: 1,
            }
        );
        assert_eq!(BracketImbalance::measure("a)").parens, 1);
    }

    #[test]
    fn test_tolerance_boundaries() {
        let thresholds = ValidationThresholds::default();

        let ok = validate(&converted("x^{2"), &thresholds);
        assert!(ok.is_valid);
        assert!(ok.note.unwrap().contains("within tolerance"));

        assert!(!validate(&converted("x^{{2"), &thresholds).is_valid);
        assert!(!validate(&converted("[[a"), &thresholds).is_valid);
        assert!(validate(&converted("(((((a"), &thresholds).is_valid);
        assert!(!validate(&converted("((((((a"), &thresholds).is_valid);

        let clean = validate(&converted(r"\frac{a}{b}"), &thresholds);
        assert_eq!(clean, Validation { is_valid: true, note: None });
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let strict = ValidationThresholds {
            max_paren_imbalance: 0,
            max_brace_imbalance: 0,
            max_bracket_imbalance: 0,
        };
        assert!(!validate(&converted("(a"), &strict).is_valid);
    }

    #[test]
    fn test_error_marker_forces_invalid() {
        let result = failure(&ConversionError::EmptyOutput);
        let validation = validate(&result, &ValidationThresholds::default());
        assert!(!validation.is_valid);
        assert_eq!(validation.note.as_deref(), Some("converter produced no output"));

        let marked = converted(&format!("x + \\text{{{ERROR_MARKER}}}"));
        assert!(!validate(&marked, &ValidationThresholds::default()).is_valid);
        assert!(!validate(&converted("  "), &ValidationThresholds::default()).is_valid);
    }

    #[test]
    fn test_build_records_fills_missing_results() {
        let job = EquationJob {
            global_index: 4,
            omml: String::new(),
            paragraph_index: 2,
            position_in_paragraph: 1,
            plain_text: " y+1 ".to_string(),
            display: DisplayType::Inline,
            paragraph_offset: 2,
            document_offset: 30,
        };

        let records = build_records(
            std::slice::from_ref(&job),
            &BTreeMap::new(),
            &ValidationThresholds::default(),
        );
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_valid);
        assert_eq!(records[0].offset, 30);
        assert_eq!(records[0].length, 3);
        assert!(!records[0].remapped);

        let mut results = BTreeMap::new();
        results.insert(4, converted("y+1"));
        let records = build_records(&[job], &results, &ValidationThresholds::default());
        assert!(records[0].is_valid);
        assert_eq!(records[0].converted_markup, "y+1");
    }
}
