use super::{XmlDocument, XmlElement, XmlNode};
use crate::error::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

/// Indentation used for every document this crate writes.
const INDENT: usize = 2;

/// Pending work for the iterative writer.
enum Step<'a> {
    Element(&'a XmlElement),
    Node(&'a XmlNode),
    Close(&'a str),
}

/// Serialize a full document: XML declaration, indented tree, trailing newline.
///
/// Output is fully determined by the tree, which is what makes
/// "unchanged input produces byte-identical output" possible.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn write_document(document: &XmlDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    write_tree(&mut writer, &document.root)?;

    let mut text = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    text.push('\n');
    Ok(text)
}

/// Serialize a single element without a declaration.
///
/// Used for the options header, which lives inside a comment.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn write_fragment(element: &XmlElement) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
    write_tree(&mut writer, element)?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn write_tree(writer: &mut Writer<Vec<u8>>, root: &XmlElement) -> Result<()> {
    let mut stack = vec![Step::Element(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Close(name) => {
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            Step::Node(XmlNode::Element(element)) => stack.push(Step::Element(element)),
            Step::Element(element) => {
                let mut start = BytesStart::new(element.name.as_str());
                for (key, value) in &element.attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if element.children.is_empty() {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    stack.push(Step::Close(element.name.as_str()));
                    stack.extend(element.children.iter().rev().map(Step::Node));
                }
            }
            Step::Node(XmlNode::Text(text)) => {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            Step::Node(XmlNode::Comment(comment)) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
            }
            Step::Node(XmlNode::ProcessingInstruction(body)) => {
                writer.write_event(Event::PI(BytesPI::new(body.as_str())))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_document_layout() -> anyhow::Result<()> {
        let root = XmlElement::new("Wix")
            .with_attribute("xmlns", "urn:test")
            .with_child(
                XmlElement::new("Component")
                    .with_attribute("Id", "c")
                    .with_child(XmlElement::new("Condition").with_text("1 = 0"))
                    .with_child(XmlElement::new("File").with_attribute("Source", "a & b")),
            );
        let text = write_document(&XmlDocument { root })?;

        let expected = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<Wix xmlns=\"urn:test\">\n\
  <Component Id=\"c\">\n\
    <Condition>1 = 0</Condition>\n\
    <File Source=\"a &amp; b\"/>\n\
  </Component>\n\
</Wix>\n";
        assert_eq!(text, expected);
        Ok(())
    }

    #[test]
    fn test_write_then_parse_is_stable() -> anyhow::Result<()> {
        let mut root = XmlElement::new("Wix");
        root.children.push(XmlNode::Comment("<Opts>\n  <A>1</A>\n</Opts>".to_string()));
        root.children
            .push(XmlNode::ProcessingInstruction("include a.wxi".to_string()));
        root.children.push(XmlNode::Element(XmlElement::new("Fragment")));
        let document = XmlDocument { root };

        let first = write_document(&document)?;
        let reparsed = parse_document(&first)?;
        assert_eq!(reparsed, document);
        assert_eq!(write_document(&reparsed)?, first);
        Ok(())
    }

    #[test]
    fn test_fragment_has_no_declaration() -> anyhow::Result<()> {
        let text = write_fragment(&XmlElement::new("Options").with_child(
            XmlElement::new("GroupName").with_text("G"),
        ))?;
        assert_eq!(text, "<Options>\n  <GroupName>G</GroupName>\n</Options>");
        Ok(())
    }
}
