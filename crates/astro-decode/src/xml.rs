//! Minimal XML element tree with namespace-oblivious lookups.
//!
//! The header of an XISF file may or may not bind a default namespace or
//! prefix its elements (`<xisf:Image>`). Every name stored here is the local
//! (unprefixed) part, so lookups match regardless of how the writer chose
//! to qualify names.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// One element of a parsed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    /// Local element name.
    pub name: String,
    /// Attributes by local name, in document order. Namespace declarations
    /// are dropped.
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data directly inside this element, whitespace
    /// included.
    pub text: String,
    pub children: Vec<Node>,
}

impl Node {
    /// Attribute value by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Pre-order traversal starting at (and including) this node.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First node named `local_name` in document order.
    pub fn find_first(&self, local_name: &str) -> Option<&Node> {
        self.descendants().find(|n| n.name == local_name)
    }

    /// Every node named `local_name`, in document order.
    pub fn find_all<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.descendants().filter(move |n| n.name == local_name)
    }
}

/// Iterator returned by [`Node::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

fn local_part(qualified: &[u8]) -> String {
    let local = match qualified.iter().rposition(|&b| b == b':') {
        Some(i) => &qualified[i + 1..],
        None => qualified,
    };
    String::from_utf8_lossy(local).into_owned()
}

fn is_namespace_declaration(key: &[u8]) -> bool {
    key == b"xmlns" || key.starts_with(b"xmlns:")
}

fn element_from(start: &BytesStart<'_>) -> Result<Node> {
    let mut node = Node {
        name: local_part(start.name().as_ref()),
        ..Node::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::structural(format!("malformed XML attribute: {e}")))?;
        let key = attr.key.as_ref();
        if is_namespace_declaration(key) {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| Error::structural(format!("malformed XML attribute value: {e}")))?;
        node.attributes.push((local_part(key), value.into_owned()));
    }
    Ok(node)
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(Error::structural("XML header has more than one root element")),
    }
    Ok(())
}

/// Parse `text` into its root element.
pub fn parse_document(text: &str) -> Result<Node> {
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::structural(format!(
                "malformed XML header at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(ref e) => stack.push(element_from(e)?),
            Event::Empty(ref e) => {
                let node = element_from(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| Error::structural("unbalanced XML end tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(ref e) => {
                let content = e
                    .unescape()
                    .map_err(|err| Error::structural(format!("malformed XML text: {err}")))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&content);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::structural("XML header ends inside an element"));
    }
    root.ok_or_else(|| Error::structural("XML header has no root element"))
}
