//! Minimal element tree over quick-xml.
//!
//! The upstream matching service answers with a loosely structured XML
//! document. We only need two queries on it: "every element with this tag, in
//! document order" and "text of the first element with this tag", so the tree
//! keeps element names, text and children and drops attributes.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("document is empty")]
    Empty,

    #[error("document has no root element")]
    NoRoot,

    #[error("unexpected content after the root element at byte {0}")]
    TrailingContent(u64),

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },
}

/// A single element of the parsed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    /// Direct text content (text and CDATA nodes), in order.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// All descendant elements named `tag`, in document (pre-order) order.
    /// The element itself is not included.
    pub fn descendants<'a>(&'a self, tag: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        for child in &self.children {
            child.collect_named(tag, &mut found);
        }
        found
    }

    fn collect_named<'a>(&'a self, tag: &str, found: &mut Vec<&'a XmlElement>) {
        if self.name == tag {
            found.push(self);
        }
        for child in &self.children {
            child.collect_named(tag, found);
        }
    }

    /// First descendant named `tag`, if any.
    pub fn first_descendant(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|child| {
            if child.name == tag {
                Some(child)
            } else {
                child.first_descendant(tag)
            }
        })
    }

    /// Full text content of the first descendant named `tag`.
    pub fn first_descendant_text(&self, tag: &str) -> Option<String> {
        self.first_descendant(tag).map(XmlElement::text_content)
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    // Text that sits between child elements is stored flattened in `text`, so
    // interleaving order is approximated as own text first, then children.
    fn push_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.push_text(out);
        }
    }
}

/// Parses `input` into its root element.
pub fn parse_document(input: &str) -> Result<XmlElement, XmlError> {
    if input.trim().is_empty() {
        return Err(XmlError::Empty);
    }

    let mut reader = Reader::from_str(input);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent(position as u64));
                }
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(XmlElement::new(name));
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent(position as u64));
                }
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                attach(&mut stack, &mut root, XmlElement::new(name));
            }
            Event::End(_) => {
                // check_end_names guarantees the end tag matches the top of the stack
                let Some(element) = stack.pop() else {
                    return Err(XmlError::Syntax {
                        position: position as u64,
                        message: "closing tag without matching opening tag".to_string(),
                    });
                };
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|e| XmlError::Syntax {
                    position: position as u64,
                    message: e.to_string(),
                })?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&value),
                    None if value.trim().is_empty() => {}
                    None => {
                        let offset = position as u64;
                        return Err(if root.is_some() {
                            XmlError::TrailingContent(offset)
                        } else {
                            XmlError::Syntax {
                                position: offset,
                                message: "text outside of the root element".to_string(),
                            }
                        });
                    }
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
  <child>
    <nomebando>Bando Digitale &amp; Innovazione</nomebando>
    <schedasintetica>https://example.org/a.pdf</schedasintetica>
  </child>
  <!-- second entry -->
  <child>
    <nomebando><![CDATA[Voucher <Export>]]></nomebando>
  </child>
</root>"#;

    #[test]
    fn test_descendants_in_document_order() {
        let root = parse_document(RESPONSE).unwrap();
        let children = root.descendants("child");
        assert_eq!(children.len(), 2);
        assert_eq!(
            children[0].first_descendant_text("nomebando").as_deref(),
            Some("Bando Digitale & Innovazione")
        );
        assert_eq!(
            children[1].first_descendant_text("nomebando").as_deref(),
            Some("Voucher <Export>")
        );
    }

    #[test]
    fn test_nested_matches_are_included() {
        let root = parse_document("<a><child><child/></child><b><child/></b></a>").unwrap();
        assert_eq!(root.descendants("child").len(), 3);
    }

    #[test]
    fn test_first_descendant_text_missing_tag() {
        let root = parse_document(RESPONSE).unwrap();
        let second = root.descendants("child")[1];
        assert!(second.first_descendant_text("schedasintetica").is_none());
    }

    #[test]
    fn test_text_content_includes_nested_text() {
        let root = parse_document("<a><n>Bando <b>Uno</b></n></a>").unwrap();
        assert_eq!(root.first_descendant_text("n").as_deref(), Some("Bando Uno"));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(parse_document("   \n"), Err(XmlError::Empty)));
    }

    #[test]
    fn test_mismatched_end_tag_is_error() {
        assert!(parse_document("<root><child></root>").is_err());
    }

    #[test]
    fn test_unclosed_root_is_error() {
        assert!(parse_document("<root><child></child>").is_err());
    }

    #[test]
    fn test_plain_text_is_error() {
        assert!(parse_document("Service Unavailable").is_err());
    }

    #[test]
    fn test_html_error_page_with_two_roots_is_error() {
        assert!(matches!(
            parse_document("<p>one</p><p>two</p>"),
            Err(XmlError::TrailingContent(_))
        ));
    }

    #[test]
    fn test_declaration_only_has_no_root() {
        assert!(matches!(
            parse_document(r#"<?xml version="1.0"?>"#),
            Err(XmlError::NoRoot)
        ));
    }
}
