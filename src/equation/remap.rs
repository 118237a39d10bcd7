//! Decision-level equation remapping
//!
//! Once paragraphs are merged into one decision, paragraph-relative offsets
//! no longer address anything. Each equation is searched for in the merged
//! content with a forward-only cursor, so repeated plain texts resolve to
//! successive occurrences in order.

use tracing::debug;

use crate::document::{DisplayType, EquationRecord};

/// Rewrite positions and offsets relative to `content`
pub fn remap_equations(content: &str, equations: &mut [EquationRecord]) {
    let mut cursor = 0;

    for (position, equation) in equations.iter_mut().enumerate() {
        equation.position = position;
        let needle = equation.plain_text.trim();
        equation.length = needle.len();

        let found = if needle.is_empty() {
            None
        } else {
            content
                .get(cursor..)
                .and_then(|rest| rest.find(needle))
                .map(|relative| cursor + relative)
        };

        match found {
            Some(offset) => {
                equation.offset = offset;
                equation.remapped = true;
                cursor = offset + needle.len();
            }
            None => {
                debug!(
                    equation = equation.global_index,
                    "equation text not found in merged content, keeping paragraph offset"
                );
                equation.offset = equation.paragraph_offset;
                equation.remapped = false;
            }
        }
    }
}

/// Content with each remapped, valid equation replaced by its markup
pub fn render_converted(content: &str, equations: &[EquationRecord]) -> String {
    let mut converted = content.to_string();

    // Back to front, so earlier offsets stay put
    for equation in equations
        .iter()
        .rev()
        .filter(|equation| equation.remapped && equation.is_valid)
    {
        let range = equation.offset..equation.offset + equation.length;
        if converted.get(range.clone()).is_none() {
            continue;
        }
        let markup = match equation.display {
            DisplayType::Inline => format!("${}$", equation.converted_markup),
            DisplayType::Block => format!("$${}$$", equation.converted_markup),
        };
        converted.replace_range(range, &markup);
    }

    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(plain_text: &str, paragraph_offset: usize) -> EquationRecord {
        EquationRecord {
            global_index: 0,
            position: 7,
            plain_text: plain_text.to_string(),
            converted_markup: format!("{plain_text}!"),
            paragraph_offset,
            offset: 1000,
            length: 0,
            display: DisplayType::Inline,
            is_valid: true,
            note: None,
            remapped: false,
        }
    }

    #[test]
    fn test_two_paragraph_decision() {
        let content = "We agree x=y+1 holds.\nAlso z=2 when idle.";
        let mut equations = vec![record("y+1", 11), record("z=2", 5)];

        remap_equations(content, &mut equations);

        let (first, second) = (&equations[0], &equations[1]);
        assert!(first.offset < second.offset);
        assert_eq!(&content[first.offset..first.offset + first.length], "y+1");
        assert_eq!(&content[second.offset..second.offset + second.length], "z=2");
        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
    }

    #[test]
    fn test_repeated_text_resolves_in_order() {
        let content = "x then x again";
        let mut equations = vec![record("x", 0), record("x", 0)];

        remap_equations(content, &mut equations);

        assert_eq!(equations[0].offset, 0);
        assert_eq!(equations[1].offset, 7);
    }

    #[test]
    fn test_missing_text_keeps_paragraph_offset() {
        let content = "a=b and c";
        let mut equations = vec![record("q", 4), record(" c ", 0)];

        remap_equations(content, &mut equations);

        assert_eq!(equations[0].offset, 4);
        assert!(!equations[0].remapped);
        // The cursor did not move on a miss
        assert_eq!(equations[1].offset, 8);
        assert_eq!(equations[1].length, 1);
        assert!(equations[1].remapped);
    }

    #[test]
    fn test_render_converted() {
        let content = "x=y+1 and z";
        let mut equations = vec![record("y+1", 2), record("z", 10)];
        equations[1].display = DisplayType::Block;
        remap_equations(content, &mut equations);

        assert_eq!(render_converted(content, &equations), "x=$y+1!$ and $$z!$$");

        equations[0].is_valid = false;
        assert_eq!(render_converted(content, &equations), "x=y+1 and $$z!$$");
    }
}
