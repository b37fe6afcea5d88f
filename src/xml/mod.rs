//! Minimal owned XML tree used as the wire format for manifests.
//!
//! The typed manifest model in [`crate::manifest`] converts to and from this
//! tree. Elements keep their qualified names and attribute order exactly as
//! read, so content copied verbatim (injection sidecars) survives untouched.
//!
//! Both the reader and the writer are iterative: document depth mirrors the
//! depth of the packaged directory tree and must not be bounded by the call
//! stack.

mod reader;
mod writer;

pub use reader::parse_document;
pub use writer::{write_document, write_fragment};

/// A node inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Nested element
    Element(XmlElement),
    /// Unescaped, trimmed character data
    Text(String),
    /// Raw comment text (between `<!--` and `-->`)
    Comment(String),
    /// Processing instruction body (target and content, e.g. `include a.wxi`)
    ProcessingInstruction(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Qualified name, including any namespace prefix
    pub name: String,
    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute append.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder-style text child.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Builder-style element child.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Value of the first attribute called `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text, comments and instructions.
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Child elements whose local name is `local`.
    pub fn elements_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.elements().filter(move |e| e.local_name() == local)
    }

    /// First child element whose local name is `local`.
    #[must_use]
    pub fn first_named(&self, local: &str) -> Option<&Self> {
        self.elements().find(|e| e.local_name() == local)
    }

    /// Concatenated direct text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every descendant element (excluding `self`) in document order.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Self> {
        let mut found = Vec::new();
        let mut stack: Vec<&Self> = self.elements().collect();
        stack.reverse();
        while let Some(element) = stack.pop() {
            found.push(element);
            let mark = stack.len();
            stack.extend(element.elements());
            stack[mark..].reverse();
        }
        found
    }
}

/// A parsed document: the root element plus anything before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// The single root element
    pub root: XmlElement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_strips_prefix() {
        assert_eq!(XmlElement::new("wix:Component").local_name(), "Component");
        assert_eq!(XmlElement::new("File").local_name(), "File");
    }

    #[test]
    fn test_descendants_document_order() {
        let tree = XmlElement::new("a")
            .with_child(XmlElement::new("b").with_child(XmlElement::new("c")))
            .with_child(XmlElement::new("d"));
        let names: Vec<&str> = tree.descendants().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_text_and_attribute_lookup() {
        let element = XmlElement::new("Condition")
            .with_attribute("Id", "x")
            .with_text("1 = 0");
        assert_eq!(element.attribute("Id"), Some("x"));
        assert_eq!(element.attribute("Missing"), None);
        assert_eq!(element.text(), "1 = 0");
    }
}
