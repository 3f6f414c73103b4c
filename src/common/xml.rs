//! Minimal owned XML tree.
//!
//! The style resolver and content translator are recursive tree walks, so
//! parts are parsed into a small owned DOM instead of being streamed. The
//! parser is built on `quick-xml` events; qualified names and attribute
//! values are kept verbatim (entities unescaped).

use crate::common::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A node of the parsed tree: an element or a text run.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An XML element with its qualified name, attributes, and children.
///
/// Attributes keep document order; lookups are linear, which is fine for the
/// handful of attributes office elements carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of the attribute with the given qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child element with the given qualified name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of this element's direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }
}

/// Parse an XML document and return its root element.
pub fn parse_document(bytes: &[u8]) -> Result<XmlElement> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    // The element currently being filled is the top of the stack.
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::Xml(format!("XML parsing error: {e}")))?
        {
            Event::Start(ref e) => {
                stack.push(element_from_start(e)?);
            }
            Event::Empty(ref e) => {
                let elem = element_from_start(e)?;
                attach(&mut stack, &mut root, elem)?;
            }
            Event::End(_) => {
                let elem = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, elem)?;
            }
            Event::Text(ref t) => {
                if let Some(parent) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Xml(format!("invalid text node: {e}")))?;
                    push_text(parent, &text);
                }
            }
            Event::CData(ref c) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(c).into_owned();
                    push_text(parent, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
}

fn element_from_start(e: &quick_xml::events::BytesStart) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut elem = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("invalid attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("invalid attribute value: {e}")))?
            .into_owned();
        elem.attributes.push((key, value));
    }
    Ok(elem)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, elem: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(elem));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(elem);
            Ok(())
        }
        None => Err(Error::Xml("multiple root elements".to_string())),
    }
}

fn push_text(parent: &mut XmlElement, text: &str) {
    // Merge adjacent text runs so the translator sees one node per run.
    if let Some(XmlNode::Text(prev)) = parent.children.last_mut() {
        prev.push_str(text);
    } else {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
}
