//! Table of contents reconstruction
//!
//! Raw entries come from TOC-styled paragraphs (or, when the document has no
//! generated TOC, from its headings). Reconstruction walks them once with a
//! depth-ordered stack of open ancestors, so the parent chain can never loop.

use std::collections::HashMap;

use super::super::models::{Paragraph, ParagraphKind, RawTocEntry, TocNode};
use super::numbering::{extract_heading_number_from_text, parse_toc_line};

/// Raw entries in document order
pub(crate) fn collect_toc_entries(paragraphs: &[Paragraph]) -> Vec<RawTocEntry> {
    let generated: Vec<RawTocEntry> = paragraphs
        .iter()
        .filter_map(|paragraph| match paragraph.kind {
            ParagraphKind::TocEntry { depth } => toc_entry(paragraph, depth),
            _ => None,
        })
        .collect();

    if !generated.is_empty() {
        return generated;
    }

    paragraphs
        .iter()
        .filter_map(|paragraph| match paragraph.kind {
            ParagraphKind::Heading { level } => heading_entry(paragraph, level),
            _ => None,
        })
        .collect()
}

fn style_name(paragraph: &Paragraph) -> String {
    paragraph
        .style
        .as_ref()
        .map(|style| style.name().to_string())
        .unwrap_or_default()
}

fn toc_entry(paragraph: &Paragraph, depth: u8) -> Option<RawTocEntry> {
    if paragraph.plain.trim().is_empty() {
        return None;
    }
    let line = parse_toc_line(&paragraph.plain);
    Some(RawTocEntry {
        text: paragraph.plain.trim().to_string(),
        style_name: style_name(paragraph),
        depth,
        page: line.page,
        anchor: paragraph.anchor.clone(),
        unnumbered: line.number.is_none(),
    })
}

fn heading_entry(paragraph: &Paragraph, level: u8) -> Option<RawTocEntry> {
    let text = paragraph.plain.trim();
    if text.is_empty() {
        return None;
    }
    Some(RawTocEntry {
        text: text.to_string(),
        style_name: style_name(paragraph),
        depth: level,
        page: None,
        anchor: paragraph.bookmark.clone(),
        unnumbered: extract_heading_number_from_text(text).is_none(),
    })
}

/// Number and title of a raw entry; `None` number when unnumbered
fn split_entry(entry: &RawTocEntry) -> (Option<String>, String) {
    let line = parse_toc_line(&entry.text);
    if entry.unnumbered {
        // An unnumbered entry keeps its whole text as the title
        let title = match line.number {
            Some(number) => format!("{number} {}", line.title),
            None => line.title,
        };
        return (None, title);
    }
    (line.number, line.title)
}

/// Build the TOC tree; counters live only for the duration of this call
pub fn reconstruct(entries: &[RawTocEntry]) -> Vec<TocNode> {
    let mut stack: Vec<(String, u8)> = Vec::new();
    let mut virtual_counters: HashMap<Option<String>, u32> = HashMap::new();
    let mut nodes: Vec<TocNode> = Vec::with_capacity(entries.len());

    for entry in entries {
        let depth = entry.depth.max(1);

        while stack.last().is_some_and(|(_, open_depth)| *open_depth >= depth) {
            stack.pop();
        }
        let parent = stack.last().map(|(id, _)| id.clone());

        let (number, title) = split_entry(entry);
        let (id, is_virtual) = match number {
            Some(number) => {
                virtual_counters.insert(Some(number.clone()), 0);
                (number, false)
            }
            None => {
                let counter = virtual_counters.entry(parent.clone()).or_insert(0);
                *counter += 1;
                let prefix = parent.as_deref().unwrap_or("");
                (format!("{prefix}v{counter}"), true)
            }
        };

        stack.push((id.clone(), depth));
        nodes.push(TocNode {
            id,
            title,
            depth,
            parent,
            children: Vec::new(),
            is_virtual,
        });
    }

    // Second pass: children in document order. Lookups go through the most
    // recent node with the parent id, which is the one that was on the stack.
    let mut latest_by_id: HashMap<String, usize> = HashMap::new();
    for index in 0..nodes.len() {
        if let Some(parent) = nodes[index].parent.clone() {
            if let Some(&parent_index) = latest_by_id.get(&parent) {
                let child_id = nodes[index].id.clone();
                if !nodes[parent_index].children.contains(&child_id) {
                    nodes[parent_index].children.push(child_id);
                }
            }
        }
        latest_by_id.insert(nodes[index].id.clone(), index);
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, depth: u8) -> RawTocEntry {
        RawTocEntry {
            text: text.to_string(),
            style_name: format!("toc {depth}"),
            depth,
            page: None,
            anchor: None,
            unnumbered: parse_toc_line(text).number.is_none(),
        }
    }

    fn ids(nodes: &[TocNode]) -> Vec<&str> {
        nodes.iter().map(|node| node.id.as_str()).collect()
    }

    #[test]
    fn test_numbered_tree() {
        let nodes = reconstruct(&[
            entry("8\tMaintenance\t5", 1),
            entry("8.1\tNR\t6", 2),
            entry("8.2\tLTE\t9", 2),
            entry("9\tRelease 19\t12", 1),
        ]);

        assert_eq!(ids(&nodes), vec!["8", "8.1", "8.2", "9"]);
        assert_eq!(nodes[0].children, vec!["8.1", "8.2"]);
        assert_eq!(nodes[1].parent.as_deref(), Some("8"));
        assert_eq!(nodes[3].parent, None);
        assert_eq!(nodes[0].title, "Maintenance");
        assert!(nodes.iter().all(|node| !node.is_virtual));
    }

    #[test]
    fn test_unnumbered_siblings_get_sequential_ids() {
        let nodes = reconstruct(&[
            entry("8\tMaintenance", 1),
            entry("Session notes", 2),
            entry("Email discussion", 2),
            entry("Opening", 1),
            entry("Closing", 1),
        ]);

        assert_eq!(ids(&nodes), vec!["8", "8v1", "8v2", "v1", "v2"]);
        assert!(nodes[1].is_virtual);
        assert_eq!(nodes[0].children, vec!["8v1", "8v2"]);
        assert_eq!(nodes[4].title, "Closing");
    }

    #[test]
    fn test_unnumbered_child_of_annex_is_flagged_virtual() {
        let nodes = reconstruct(&[entry("Annex A: Agreements", 1), entry("Session notes", 2)]);

        assert_eq!(ids(&nodes), vec!["Annex A", "Annex Av1"]);
        assert!(!nodes[0].is_virtual);
        assert!(nodes[1].is_virtual);
    }

    #[test]
    fn test_numbered_sibling_does_not_reset_other_counters() {
        let nodes = reconstruct(&[
            entry("8\tMaintenance", 1),
            entry("Notes", 2),
            entry("9\tRelease 19", 1),
            entry("Notes", 2),
            entry("8\tMaintenance (cont.)", 1),
            entry("More notes", 2),
        ]);

        // `9` starts its own counter; re-seeing `8` resets only `8`'s counter
        assert_eq!(ids(&nodes), vec!["8", "8v1", "9", "9v1", "8", "8v1"]);
    }

    #[test]
    fn test_virtual_parent_prefixes_children() {
        let nodes = reconstruct(&[entry("Annexes", 1), entry("Tdoc list", 2), entry("A.1\tX", 2)]);

        assert_eq!(ids(&nodes), vec!["v1", "v1v1", "A.1"]);
        assert_eq!(nodes[0].children, vec!["v1v1", "A.1"]);
    }

    #[test]
    fn test_malformed_depth_sequence_is_accepted() {
        let nodes = reconstruct(&[entry("3.1.1\tDeep", 3), entry("4\tTop", 1), entry("4.1.1\tSkip", 3)]);

        assert_eq!(nodes[0].parent, None);
        assert_eq!(nodes[2].parent.as_deref(), Some("4"));
        assert_eq!(nodes[1].children, vec!["4.1.1"]);
    }

    #[test]
    fn test_children_are_ordered_and_unique() {
        let nodes = reconstruct(&[
            entry("1\tA", 1),
            entry("x", 2),
            entry("1.1\tB", 2),
            entry("y", 3),
            entry("z", 2),
        ]);

        for node in &nodes {
            let mut seen = std::collections::HashSet::new();
            assert!(node.children.iter().all(|child| seen.insert(child)));
            for child in &node.children {
                let child_node = nodes.iter().find(|n| &n.id == child).unwrap();
                assert!(child_node.depth > node.depth);
            }
        }
        assert_eq!(nodes[0].children, vec!["1v1", "1.1", "1v2"]);
        assert_eq!(nodes[2].children, vec!["1.1v1"]);
    }
}
