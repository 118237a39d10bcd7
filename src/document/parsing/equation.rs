//! Equation collection
//!
//! Math elements are found while paragraphs are annotated. This module turns
//! them into numbered conversion jobs; collection is single-threaded and the
//! resulting job list is never modified afterwards.

use super::super::models::{DisplayType, EquationJob};
use super::xml::XmlElement;

/// A math element as seen inside one paragraph
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InlineMath {
    /// Byte offset within the paragraph's annotated text
    pub(crate) offset: usize,
    /// Byte offset within the paragraph's plain text
    pub(crate) plain_offset: usize,
    pub(crate) plain_text: String,
    pub(crate) omml: String,
    pub(crate) display: DisplayType,
}

/// Plain text of an `m:oMath` element
pub(crate) fn math_plain_text(math: &XmlElement) -> String {
    math.text_of("m:t")
}

/// Accumulates conversion jobs in document order
#[derive(Debug, Default)]
pub(crate) struct EquationCollector {
    jobs: Vec<EquationJob>,
}

impl EquationCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the math of one paragraph, returning the assigned global indices.
    /// `content_offset` is where the paragraph's text starts in the document text;
    /// `escapes` are the sorted paragraph positions where the document text
    /// carries an extra escape character.
    pub(crate) fn collect(
        &mut self,
        paragraph_index: usize,
        content_offset: usize,
        escapes: &[usize],
        math: Vec<InlineMath>,
    ) -> Vec<usize> {
        let mut indices = Vec::with_capacity(math.len());

        for (position, item) in math.into_iter().enumerate() {
            let global_index = self.jobs.len();
            self.jobs.push(EquationJob {
                global_index,
                omml: item.omml,
                paragraph_index,
                position_in_paragraph: position,
                plain_text: item.plain_text,
                display: item.display,
                paragraph_offset: item.offset,
                document_offset: content_offset
                    + item.offset
                    + escapes.partition_point(|&escape| escape <= item.offset),
            });
            indices.push(global_index);
        }

        indices
    }

    pub(crate) fn finish(self) -> Vec<EquationJob> {
        self.jobs
    }
}
