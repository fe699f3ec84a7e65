//! A small owned element tree over `quick-xml` events.
//!
//! Both the template compiler and the RDF adapter need random access to
//! children and attributes, so documents are read once into [`Element`]s.
//! Whitespace-only text is dropped; comments, processing instructions and
//! the XML declaration are skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::CoreError;

/// An element with its attributes and children in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written (`rdf:Description`, `component`).
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Byte offset of the start tag in the source.
    pub position: u64,
}

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

impl Element {
    /// Reads `src` and returns its single root element.
    pub fn parse(src: &str) -> Result<Element, CoreError> {
        let mut reader = Reader::from_str(src);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let position = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(Element::open(&start, position)?),
                Ok(Event::Empty(start)) => {
                    let element = Element::open(&start, position)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| CoreError::Xml {
                        position,
                        message: "unexpected closing tag".into(),
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(text)) => {
                    let value = text.unescape().map_err(|err| CoreError::Xml {
                        position,
                        message: err.to_string(),
                    })?;
                    push_text(&mut stack, value.as_ref(), position)?;
                }
                Ok(Event::CData(data)) => {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    push_text(&mut stack, &value, position)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    return Err(CoreError::Xml {
                        position: reader.error_position(),
                        message: err.to_string(),
                    })
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(CoreError::Xml {
                position: open.position,
                message: format!("unclosed element <{}>", open.name),
            });
        }
        root.ok_or(CoreError::Xml {
            position: 0,
            message: "document has no root element".into(),
        })
    }

    fn open(start: &BytesStart<'_>, position: u64) -> Result<Element, CoreError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| CoreError::Xml {
                position,
                message: err.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| CoreError::Xml {
                position,
                message: err.to_string(),
            })?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Element {
            name,
            attributes,
            children: Vec::new(),
            position,
        })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenated direct text content, trimmed.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            if let XmlNode::Text(part) = child {
                text.push_str(part);
            }
        }
        text.trim().to_string()
    }

    pub fn has_text(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, XmlNode::Text(t) if !t.trim().is_empty()))
    }

    /// All descendants (not including `self`) named `name`, in document order.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), CoreError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(CoreError::Xml {
            position: element.position,
            message: format!("second root element <{}>", element.name),
        });
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str, position: u64) -> Result<(), CoreError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Text(text.to_string()));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(CoreError::Xml {
            position,
            message: "text outside of the root element".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let root = Element::parse(
            r#"<?xml version="1.0"?>
            <commands>
              <!-- a comment -->
              <command name="GO">
                <component type="MOVE" word="go, walk"/>
              </command>
            </commands>"#,
        )
        .unwrap();

        assert_eq!(root.name, "commands");
        let command = root.elements().next().unwrap();
        assert_eq!(command.attr("name"), Some("GO"));
        let component = command.elements().next().unwrap();
        assert_eq!(component.attr("word"), Some("go, walk"));
        assert_eq!(component.attr("missing"), None);
    }

    #[test]
    fn keeps_trimmed_text() {
        let root = Element::parse("<role name=\"TENSE\">\n  PRES\n</role>").unwrap();
        assert_eq!(root.text(), "PRES");
        assert!(root.has_text());
    }

    #[test]
    fn unescapes_entities() {
        let root = Element::parse(r#"<w v="a &amp; b">x &lt; y</w>"#).unwrap();
        assert_eq!(root.attr("v"), Some("a & b"));
        assert_eq!(root.text(), "x < y");
    }

    #[test]
    fn splits_prefixed_names() {
        let root = Element::parse(r##"<rdf:RDF><role:AGENT rdf:resource="#V2"/></rdf:RDF>"##).unwrap();
        assert_eq!(root.prefix(), Some("rdf"));
        assert_eq!(root.local_name(), "RDF");
        let role = root.elements().next().unwrap();
        assert_eq!(role.prefix(), Some("role"));
        assert_eq!(role.local_name(), "AGENT");
        assert_eq!(role.attr("rdf:resource"), Some("#V2"));
    }

    #[test]
    fn finds_descendants_in_document_order() {
        let root = Element::parse("<a><b id=\"1\"><b id=\"2\"/></b><c><b id=\"3\"/></c></a>").unwrap();
        let ids: Vec<_> = root
            .descendants("b")
            .into_iter()
            .filter_map(|b| b.attr("id"))
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(matches!(
            Element::parse("<a><b></a>"),
            Err(CoreError::Xml { .. })
        ));
    }

    #[test]
    fn rejects_unclosed_document() {
        assert!(matches!(
            Element::parse("<a><b/>"),
            Err(CoreError::Xml { .. })
        ));
    }

    #[test]
    fn rejects_empty_document() {
        assert!(matches!(Element::parse("   "), Err(CoreError::Xml { .. })));
    }

    #[test]
    fn rejects_two_roots() {
        assert!(matches!(
            Element::parse("<a/><b/>"),
            Err(CoreError::Xml { .. })
        ));
    }
}
