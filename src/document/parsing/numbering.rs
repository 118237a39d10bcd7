//! Section number parsing
//!
//! Splits explicit section numbers off heading and TOC text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Type alias for a section number and the remaining title
pub(crate) type HeadingNumberInfo = (String, String);

// TOC lines are `number<TAB>title<TAB>page`; the first cell is a number when
// it looks like one, even a bare `8`
static TOC_NUMBER_CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)*|[A-Z](?:\.\d+)+|Annex\s+[A-Z](?:\.\d+)*|[A-Z])\.?$").unwrap()
});

static PAGE_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

// Focused on common patterns for manual numbering in text
static HEADING_NUMBER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Decimal numbering: "8", "8.1", "8.1.2", with an optional trailing period
        Regex::new(r"^(\d+(?:\.\d+)*\.?)\s+(.+)$").unwrap(),
        // Annex numbering: "A.1", "B.2.3", "Annex A"
        Regex::new(r"^([A-Z](?:\.\d+)+\.?)\s+(.+)$").unwrap(),
        Regex::new(r"^(Annex\s+[A-Z](?:\.\d+)*):?\s+(.+)$").unwrap(),
        // Section numbering: "Section 1.2", "Chapter 3"
        Regex::new(r"^((?:Section|Chapter|Part)\s+\d+(?:\.\d+)*\.?)\s+(.+)$").unwrap(),
        // Alternative numbering schemes
        Regex::new(r"^([A-Z]\.)\s+(.+)$").unwrap(), // "A. Introduction"
        Regex::new(r"^([IVX]+\.)\s+(.+)$").unwrap(), // "I. Overview"
    ]
});

pub(crate) fn extract_heading_number_from_text(text: &str) -> Option<HeadingNumberInfo> {
    let text = text.trim();

    if text.is_empty() {
        return None;
    }

    for pattern in HEADING_NUMBER_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let (Some(number_match), Some(text_match)) = (captures.get(1), captures.get(2)) {
                let number = number_match.as_str().trim_end_matches('.');
                let remaining_text = text_match.as_str().trim();

                if !number.is_empty() && !remaining_text.is_empty() {
                    return Some((number.to_string(), remaining_text.to_string()));
                }
            }
        }
    }

    None
}

/// Parsed TOC line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TocLine {
    pub(crate) number: Option<String>,
    pub(crate) title: String,
    pub(crate) page: Option<u32>,
}

/// Split a TOC line into number, title and page
pub(crate) fn parse_toc_line(text: &str) -> TocLine {
    let mut cells: Vec<&str> = text
        .split('\t')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect();

    let page = match cells.last() {
        Some(last) if cells.len() > 1 && PAGE_CELL.is_match(last) => {
            let page = last.parse::<u32>().ok();
            cells.pop();
            page
        }
        _ => None,
    };

    if cells.len() > 1 && TOC_NUMBER_CELL.is_match(cells[0]) {
        return TocLine {
            number: Some(cells[0].trim_end_matches('.').to_string()),
            title: cells[1..].join(" "),
            page,
        };
    }

    let joined = cells.join(" ");
    match extract_heading_number_from_text(&joined) {
        Some((number, title)) => TocLine {
            number: Some(number),
            title,
            page,
        },
        None => TocLine {
            number: None,
            title: joined,
            page,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_number_extraction() {
        assert_eq!(
            extract_heading_number_from_text("8 Maintenance"),
            Some(("8".to_string(), "Maintenance".to_string()))
        );
        assert_eq!(
            extract_heading_number_from_text("8.1. Maintenance on NR"),
            Some(("8.1".to_string(), "Maintenance on NR".to_string()))
        );
        assert_eq!(
            extract_heading_number_from_text("A.1 Tdoc list"),
            Some(("A.1".to_string(), "Tdoc list".to_string()))
        );
        assert_eq!(
            extract_heading_number_from_text("Annex B: List of participants"),
            Some(("Annex B".to_string(), "List of participants".to_string()))
        );
        assert_eq!(
            extract_heading_number_from_text("Section 1.2 Overview"),
            Some(("Section 1.2".to_string(), "Overview".to_string()))
        );

        assert_eq!(extract_heading_number_from_text("Opening of the meeting"), None);
        assert_eq!(extract_heading_number_from_text("Heading 1"), None);
        assert_eq!(extract_heading_number_from_text("8"), None);
    }

    #[test]
    fn test_toc_line_with_tabs() {
        assert_eq!(
            parse_toc_line("8.1\tMaintenance on NR\t12"),
            TocLine {
                number: Some("8.1".to_string()),
                title: "Maintenance on NR".to_string(),
                page: Some(12),
            }
        );
        assert_eq!(
            parse_toc_line("9\tRelease 19\t40"),
            TocLine {
                number: Some("9".to_string()),
                title: "Release 19".to_string(),
                page: Some(40),
            }
        );
    }

    #[test]
    fn test_toc_line_without_number() {
        assert_eq!(
            parse_toc_line("Opening of the meeting\t3"),
            TocLine {
                number: None,
                title: "Opening of the meeting".to_string(),
                page: Some(3),
            }
        );
        assert_eq!(
            parse_toc_line("List of agreements"),
            TocLine {
                number: None,
                title: "List of agreements".to_string(),
                page: None,
            }
        );
    }
}
