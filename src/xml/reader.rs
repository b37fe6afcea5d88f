use super::{XmlDocument, XmlElement, XmlNode};
use crate::error::{ManifestError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::trace;

/// Parse `text` into an owned element tree.
///
/// Whitespace-only text is dropped and remaining text is trimmed, so a
/// document written by [`super::write_document`] reads back to the same tree.
///
/// # Errors
///
/// Returns an error for malformed XML, non UTF-8 names, or a document
/// without a root element.
pub fn parse_document(text: &str) -> Result<XmlDocument> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    // Open elements, innermost last.
    let mut open: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => open.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut open, &mut root, XmlNode::Element(element))?;
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| ManifestError::structure("unbalanced end tag"))?;
                attach(&mut open, &mut root, XmlNode::Element(element))?;
            }
            Event::Text(text) => {
                let value = text.unescape()?;
                if !value.trim().is_empty()
                    && let Some(parent) = open.last_mut()
                {
                    parent.children.push(XmlNode::Text(value.trim().to_string()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = open.last_mut() {
                    let value = std::str::from_utf8(&data)?.to_string();
                    parent.children.push(XmlNode::Text(value));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = open.last_mut() {
                    let value = std::str::from_utf8(&comment)?.to_string();
                    parent.children.push(XmlNode::Comment(value));
                }
            }
            Event::PI(instruction) => {
                if let Some(parent) = open.last_mut() {
                    let value = std::str::from_utf8(&instruction)?.trim().to_string();
                    parent
                        .children
                        .push(XmlNode::ProcessingInstruction(value));
                }
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !open.is_empty() {
        return Err(ManifestError::structure("document ended inside an element"));
    }

    let root = root.ok_or_else(|| ManifestError::structure("document has no root element"))?;
    trace!(root = %root.name, "Parsed XML document");
    Ok(XmlDocument { root })
}

/// Append a finished node to its parent, or make it the root.
fn attach(
    open: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    node: XmlNode,
) -> Result<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(element) if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        _ => Err(ManifestError::structure("multiple root elements")),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}
