//! Minimal owned XML tree
//!
//! WordprocessingML parts are small enough to hold in memory, and the
//! annotator needs to revisit subtrees (hyperlinks, math containers), so the
//! quick-xml event stream is folded into a tree once per part.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct XmlElement {
    /// Qualified name as written in the part, e.g. `w:p`
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<XmlNode>,
}

impl XmlElement {
    pub(crate) fn new(name: &str) -> Self {
        XmlElement {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    pub(crate) fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.is(name))
    }

    /// Depth-first search for the first descendant with the given name
    pub(crate) fn descendant(&self, name: &str) -> Option<&XmlElement> {
        for element in self.elements() {
            if element.is(name) {
                return Some(element);
            }
            if let Some(found) = element.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text of every descendant element with the given name
    pub(crate) fn text_of(&self, name: &str) -> String {
        let mut text = String::new();
        self.collect_text_of(name, &mut text);
        text
    }

    fn collect_text_of(&self, name: &str, out: &mut String) {
        for element in self.elements() {
            if element.is(name) {
                out.push_str(&element.inner_text());
            } else {
                element.collect_text_of(name, out);
            }
        }
    }

    /// All character data below this element
    pub(crate) fn inner_text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(value) => text.push_str(value),
                XmlNode::Element(element) => text.push_str(&element.inner_text()),
            }
        }
        text
    }

    /// Serialize this subtree back to markup
    pub(crate) fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                XmlNode::Text(value) => out.push_str(&escape(value.as_str())),
                XmlNode::Element(element) => element.write_xml(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn start_element(start: &BytesStart) -> Result<XmlElement, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

/// Parse a whole XML part into its root element
pub(crate) fn parse(xml: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(xml);
    // Keep whitespace: `<w:t xml:space="preserve"> </w:t>` carries content
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = vec![XmlElement::new("#document")];

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(start_element(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = start_element(e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Element(element));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err("unbalanced closing tag".to_string());
                }
                if let Some(element) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Element(element));
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "error at position {}: {e}",
                    reader.buffer_position()
                ));
            }
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err("unexpected end of document".to_string());
    }

    let document = stack.pop().unwrap_or_default();
    document
        .children
        .into_iter()
        .find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
        .ok_or_else(|| "document has no root element".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_attributes_and_whitespace() {
        let root = parse(
            r#"<?xml version="1.0"?><w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p>"#,
        )
        .unwrap();

        assert!(root.is("w:p"));
        let text = root.descendant("w:t").unwrap();
        assert_eq!(text.attr("xml:space"), Some("preserve"));
        assert_eq!(text.inner_text(), " a & b ");
    }

    #[test]
    fn test_to_xml_round_trips_escaping() {
        let root = parse(r#"<m:oMath><m:r><m:t>a&lt;b</m:t></m:r><m:sep m:val="|"/></m:oMath>"#)
            .unwrap();
        assert_eq!(
            root.to_xml(),
            r#"<m:oMath><m:r><m:t>a&lt;b</m:t></m:r><m:sep m:val="|"/></m:oMath>"#
        );
    }

    #[test]
    fn test_text_of_collects_in_order() {
        let root =
            parse("<m:oMath><m:r><m:t>y</m:t></m:r><m:r><m:t>+1</m:t></m:r></m:oMath>").unwrap();
        assert_eq!(root.text_of("m:t"), "y+1");
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        assert!(parse("<w:document><w:body>").is_err());
    }
}
