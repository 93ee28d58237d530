//! XML tree utilities.
//!
//! Parses a whole document into an owned tree of [`XMLNode`] values so
//! the rest of the crate can traverse it read-only, with no further
//! access to the parser.

use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;
use xml::reader::Error as ReaderError;
use xml::reader::ParserConfig;
use xml::reader::XmlEvent;

#[derive(Debug, thiserror::Error)]
pub enum XMLError {
    #[error("Malformed XML: {0}")]
    Read(#[from] ReaderError),
    #[error("No root element in the document")]
    Empty,
}

/// A node in the parsed document tree.
///
/// Whitespace-only text and comments are dropped during parsing, so
/// `Text` always carries some non-whitespace content.
#[derive(Debug, Clone, PartialEq)]
pub enum XMLNode {
    Element(XMLElement),
    Text(String),
}

/// An element with its attributes and child nodes in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XMLElement {
    pub name: OwnedName,
    pub attrs: Vec<OwnedAttribute>,
    pub children: Vec<XMLNode>,
}

impl XMLElement {
    /// Returns the value of the first attribute with this local name.
    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|attr| attr.name.local_name == name)
            .map(|attr| attr.value.clone())
    }

    /// Iterates the direct child elements, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &XMLElement> {
        self.children.iter().filter_map(|node| match node {
            XMLNode::Element(element) => Some(element),
            XMLNode::Text(_) => None,
        })
    }

    /// Returns the first descendant element with this local name, in
    /// document order. The element itself is not a candidate.
    pub fn find(&self, tag: &str) -> Option<&XMLElement> {
        for child in self.child_elements() {
            if child.name.local_name == tag {
                return Some(child);
            }
            if let Some(found) = child.find(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Like [`Self::find`], but the element must also be in the given
    /// namespace.
    pub fn find_ns(&self, namespace: &str, tag: &str) -> Option<&XMLElement> {
        for child in self.child_elements() {
            if child.name.local_name == tag && child.name.namespace.as_deref() == Some(namespace) {
                return Some(child);
            }
            if let Some(found) = child.find_ns(namespace, tag) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenates the content of the direct text children only.
    /// Text inside nested elements is not included.
    pub fn text_children_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XMLNode::Text(text) => Some(text.as_str()),
                XMLNode::Element(_) => None,
            })
            .collect()
    }

    /// Concatenates every descendant text node, in document order.
    pub fn deep_text_content(&self) -> String {
        let mut content = String::new();
        self.collect_text(&mut content);
        content
    }

    fn collect_text(&self, content: &mut String) {
        for node in &self.children {
            match node {
                XMLNode::Text(text) => content.push_str(text),
                XMLNode::Element(element) => element.collect_text(content),
            }
        }
    }
}

pub struct XMLReader;

impl XMLReader {
    /// Parses `content` and returns the root element of the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the content isn't well-formed XML or has no
    /// root element.
    pub fn parse(content: &[u8]) -> Result<XMLElement, XMLError> {
        let reader = ParserConfig::new()
            .add_entity("nbsp", ' ')
            .add_entity("copy", '©')
            .add_entity("reg", '®')
            .create_reader(content);

        let mut stack: Vec<XMLElement> = vec![];
        let mut root: Option<XMLElement> = None;

        for event in reader {
            match event? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    stack.push(XMLElement {
                        name,
                        attrs: attributes,
                        children: vec![],
                    });
                }
                XmlEvent::EndElement { .. } => {
                    if let Some(element) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(XMLNode::Element(element)),
                            // A well-formed document closes the root
                            // element exactly once.
                            None => root = Some(element),
                        }
                    }
                }
                XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.children.push(XMLNode::Text(text));
                    }
                }
                _ => {}
            }
        }

        root.ok_or(XMLError::Empty)
    }
}
