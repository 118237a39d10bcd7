//! Text extraction and formatting annotation
//!
//! Walks a `w:p` element's inline content in document order and renders each
//! run with lightweight formatting markers. Math elements are kept inline as
//! their plain text and reported with their offset in the annotated string.

use serde::{Deserialize, Serialize};

use super::super::models::DisplayType;
use super::equation::{math_plain_text, InlineMath};
use super::xml::XmlElement;

/// Elements whose children are inline content of the enclosing paragraph
const TRANSPARENT_WRAPPERS: &[&str] = &[
    "w:hyperlink",
    "w:ins",
    "w:smartTag",
    "w:fldSimple",
    "w:customXml",
    "w:sdt",
    "w:sdtContent",
    "w:dir",
    "w:bdo",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    Green,
    Yellow,
    Turquoise,
    Other,
}

impl Highlight {
    fn open(self) -> &'static str {
        match self {
            Highlight::Green => "<mark color=\"green\">",
            Highlight::Yellow => "<mark color=\"yellow\">",
            Highlight::Turquoise => "<mark color=\"turquoise\">",
            Highlight::Other => "<mark>",
        }
    }
}

const HIGHLIGHT_CLOSE: &str = "</mark>";

type HighlightRule = (fn(&str) -> bool, Highlight);

fn is_green(color: &str) -> bool {
    matches!(color, "green" | "brightgreen")
}

fn is_yellow(color: &str) -> bool {
    matches!(color, "yellow" | "darkyellow")
}

fn is_turquoise(color: &str) -> bool {
    matches!(color, "cyan" | "turquoise")
}

fn any_color(_: &str) -> bool {
    true
}

/// Colour mapping, first matching rule wins
const HIGHLIGHT_RULES: &[HighlightRule] = &[
    (is_green, Highlight::Green),
    (is_yellow, Highlight::Yellow),
    (is_turquoise, Highlight::Turquoise),
    (any_color, Highlight::Other),
];

pub(crate) fn classify_highlight(value: &str) -> Option<Highlight> {
    let color = value.trim().to_ascii_lowercase();
    if color.is_empty() || color == "none" {
        return None;
    }
    HIGHLIGHT_RULES
        .iter()
        .find(|(matches, _)| matches(&color))
        .map(|(_, highlight)| *highlight)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub highlight: Option<Highlight>,
}

impl TextFormatting {
    /// Wrap text in markers, innermost to outermost:
    /// strikethrough, underline, italic, bold, highlight
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        if self.strikethrough {
            out = format!("~~{out}~~");
        }
        if self.underline {
            out = format!("<u>{out}</u>");
        }
        if self.italic {
            out = format!("*{out}*");
        }
        if self.bold {
            out = format!("**{out}**");
        }
        if let Some(highlight) = self.highlight {
            out = format!("{}{out}{HIGHLIGHT_CLOSE}", highlight.open());
        }
        out
    }
}

/// Toggle properties are on unless `w:val` turns them off
fn toggle_on(element: &XmlElement) -> bool {
    !matches!(
        element.attr("w:val").map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("0" | "false" | "off")
    )
}

/// Extract formatting information from a run
pub(crate) fn extract_run_formatting(run: &XmlElement) -> TextFormatting {
    let mut formatting = TextFormatting::default();

    let Some(props) = run.child("w:rPr") else {
        return formatting;
    };

    formatting.bold = props.child("w:b").is_some_and(toggle_on);
    formatting.italic = props.child("w:i").is_some_and(toggle_on);
    formatting.underline = props
        .child("w:u")
        .is_some_and(|u| !matches!(u.attr("w:val"), Some("none")));
    formatting.strikethrough = props.child("w:strike").is_some_and(toggle_on)
        || props.child("w:dstrike").is_some_and(toggle_on);
    formatting.highlight = props
        .child("w:highlight")
        .and_then(|h| h.attr("w:val"))
        .and_then(classify_highlight);

    formatting
}

/// Extract text from a run
pub(crate) fn extract_run_text(run: &XmlElement) -> String {
    let mut text = String::new();

    for child in run.elements() {
        match child.name.as_str() {
            "w:t" => text.push_str(&child.inner_text()),
            "w:tab" | "w:ptab" => text.push('\t'),
            "w:br" | "w:cr" => text.push('\n'),
            "w:noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }

    text
}

/// Annotate one run; surrounding whitespace stays outside the markers
pub(crate) fn annotate_run(run: &XmlElement) -> String {
    let text = extract_run_text(run);
    let core = text.trim();
    if core.is_empty() {
        return text;
    }

    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];
    let formatting = extract_run_formatting(run);

    format!("{lead}{}{trail}", formatting.apply(core))
}

/// Annotated and plain renderings of one paragraph
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParagraphAnnotation {
    pub(crate) marked: String,
    pub(crate) plain: String,
    pub(crate) math: Vec<InlineMath>,
    pub(crate) bookmark: Option<String>,
    pub(crate) anchor: Option<String>,
}

impl ParagraphAnnotation {
    fn walk(&mut self, parent: &XmlElement, display: DisplayType) {
        for child in parent.elements() {
            match child.name.as_str() {
                "w:r" => {
                    self.marked.push_str(&annotate_run(child));
                    self.plain.push_str(&extract_run_text(child));
                }
                "m:oMathPara" => self.walk(child, DisplayType::Block),
                "m:oMath" => self.push_math(child, display),
                "w:bookmarkStart" => {
                    if self.bookmark.is_none() {
                        self.bookmark = child
                            .attr("w:name")
                            .filter(|name| *name != "_GoBack")
                            .map(str::to_string);
                    }
                }
                name if TRANSPARENT_WRAPPERS.contains(&name) => {
                    if name == "w:hyperlink" && self.anchor.is_none() {
                        self.anchor = child.attr("w:anchor").map(str::to_string);
                    }
                    self.walk(child, display);
                }
                _ => {}
            }
        }
    }

    fn push_math(&mut self, math: &XmlElement, display: DisplayType) {
        let plain_text = math_plain_text(math);
        self.math.push(InlineMath {
            offset: self.marked.len(),
            plain_offset: self.plain.len(),
            plain_text: plain_text.clone(),
            omml: math.to_xml(),
            display,
        });
        self.marked.push_str(&plain_text);
        self.plain.push_str(&plain_text);
    }
}

/// Walk a paragraph, producing annotated text and the math it contains
pub(crate) fn annotate_paragraph(paragraph: &XmlElement) -> ParagraphAnnotation {
    let mut annotation = ParagraphAnnotation::default();
    // `m:oMathPara` may sit directly in the paragraph or inside a run wrapper
    annotation.walk(paragraph, DisplayType::Inline);
    annotation
}

/// Formatting-annotated text of a paragraph
pub(crate) fn annotate(paragraph: &XmlElement) -> String {
    annotate_paragraph(paragraph).marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parsing::xml;

    fn para(body: &str) -> XmlElement {
        xml::parse(&format!("<w:p>{body}</w:p>")).unwrap()
    }

    #[test]
    fn test_highlight_wraps_bold() {
        let p = para(
            r#"<w:r><w:rPr><w:b/><w:highlight w:val="yellow"/></w:rPr><w:t>FFS</w:t></w:r>"#,
        );
        assert_eq!(annotate(&p), r#"<mark color="yellow">**FFS**</mark>"#);
    }

    #[test]
    fn test_full_nesting_order() {
        let p = para(
            r#"<w:r><w:rPr><w:b/><w:i/><w:u w:val="single"/><w:strike/><w:highlight w:val="green"/></w:rPr><w:t>x</w:t></w:r>"#,
        );
        assert_eq!(annotate(&p), r#"<mark color="green">***<u>~~x~~</u>***</mark>"#);
    }

    #[test]
    fn test_highlight_only_run_is_marked() {
        let p = para(r#"<w:r><w:rPr><w:highlight w:val="magenta"/></w:rPr><w:t>note</w:t></w:r>"#);
        assert_eq!(annotate(&p), "<mark>note</mark>");
    }

    #[test]
    fn test_highlight_colour_rules() {
        assert_eq!(classify_highlight("darkYellow"), Some(Highlight::Yellow));
        assert_eq!(classify_highlight("cyan"), Some(Highlight::Turquoise));
        assert_eq!(classify_highlight("green"), Some(Highlight::Green));
        assert_eq!(classify_highlight("red"), Some(Highlight::Other));
        assert_eq!(classify_highlight("none"), None);
    }

    #[test]
    fn test_disabled_toggles_are_ignored() {
        let p = para(
            r#"<w:r><w:rPr><w:b w:val="0"/><w:u w:val="none"/><w:i w:val="false"/></w:rPr><w:t>plain</w:t></w:r>"#,
        );
        assert_eq!(annotate(&p), "plain");
    }

    #[test]
    fn test_hyperlink_runs_are_unwrapped_in_order() {
        let p = para(
            r#"<w:r><w:t xml:space="preserve">see </w:t></w:r><w:hyperlink w:anchor="_Toc1"><w:r><w:rPr><w:i/></w:rPr><w:t>R1-2400001</w:t></w:r></w:hyperlink><w:r><w:t xml:space="preserve"> now</w:t></w:r>"#,
        );
        let annotation = annotate_paragraph(&p);
        assert_eq!(annotation.marked, "see *R1-2400001* now");
        assert_eq!(annotation.plain, "see R1-2400001 now");
        assert_eq!(annotation.anchor.as_deref(), Some("_Toc1"));
    }

    #[test]
    fn test_whitespace_stays_outside_markers() {
        let p = para(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve"> bold </w:t></w:r>"#);
        assert_eq!(annotate(&p), " **bold** ");
    }

    #[test]
    fn test_non_run_children_are_skipped() {
        let p = para(
            r#"<w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:proofErr/><w:r><w:t>a</w:t></w:r><w:del><w:r><w:delText>b</w:delText></w:r></w:del>"#,
        );
        assert_eq!(annotate(&p), "a");
    }

    #[test]
    fn test_inline_math_offset() {
        let p = para(
            r#"<w:r><w:t>x=</w:t></w:r><m:oMath><m:r><m:t>y+1</m:t></m:r></m:oMath>"#,
        );
        let annotation = annotate_paragraph(&p);
        assert_eq!(annotation.marked, "x=y+1");
        assert_eq!(annotation.math.len(), 1);
        assert_eq!(annotation.math[0].offset, 2);
        assert_eq!(annotation.math[0].plain_text, "y+1");
        assert_eq!(annotation.math[0].display, DisplayType::Inline);
    }

    #[test]
    fn test_math_paragraph_is_block() {
        let p = para(
            r#"<m:oMathPara><m:oMath><m:r><m:t>E=mc</m:t></m:r></m:oMath></m:oMathPara>"#,
        );
        let annotation = annotate_paragraph(&p);
        assert_eq!(annotation.math[0].display, DisplayType::Block);
        assert!(annotation.math[0].omml.starts_with("<m:oMath>"));
    }
}
