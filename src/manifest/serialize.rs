use super::{Component, DirectoryChild, FileEntry, Manifest, Numbering, RegistryValue};
use crate::error::Result;
use crate::utils::{ids::sanitize_id, natural_cmp};
use crate::xml::{self, XmlDocument, XmlElement, XmlNode};

/// Render a manifest to its final text.
///
/// # Errors
///
/// Returns an error if XML serialization fails.
pub fn render_manifest(manifest: &Manifest) -> Result<String> {
    xml::write_document(&to_document(manifest)?)
}

/// Build the full XML tree: header comment, include directives, fragment.
///
/// # Errors
///
/// Returns an error if the options header cannot be serialized.
pub fn to_document(manifest: &Manifest) -> Result<XmlDocument> {
    let mut root = XmlElement::new("Wix").with_attribute("xmlns", manifest.namespace());
    root.attributes.extend(manifest.namespaces.iter().cloned());

    root.children
        .push(XmlNode::Comment(manifest.options.to_header_text()?));
    // Include directives appear in reverse of their configured order.
    for include in manifest.options.include_files.iter().rev() {
        root.children
            .push(XmlNode::ProcessingInstruction(format!("include {include}")));
    }

    let mut fragment = XmlElement::new("Fragment");
    if let Some(group) = component_group(manifest) {
        fragment.children.push(XmlNode::Element(group));
    }
    let mut directory_ref =
        XmlElement::new("DirectoryRef").with_attribute("Id", manifest.directory_ref.id.as_str());
    directory_ref.children = children_to_xml(&manifest.directory_ref.children);
    fragment.children.push(XmlNode::Element(directory_ref));

    root.children.push(XmlNode::Element(fragment));
    Ok(XmlDocument { root })
}

/// The `ComponentGroup` listing every component in the manifest.
///
/// Injected components are included. Legacy manifests sort the references
/// naturally by id; current ones keep document order. `None` when the
/// manifest has no components at all.
#[must_use]
pub fn component_group(manifest: &Manifest) -> Option<XmlElement> {
    let mut ids = component_ids(&manifest.directory_ref.children);
    if ids.is_empty() {
        return None;
    }

    let group_id = match manifest.options.numbering {
        Numbering::Sequential(_) => {
            ids.sort_by(|a, b| natural_cmp(a, b));
            sanitize_id(&format!("group_{}", manifest.options.group_name))
        }
        Numbering::Random => sanitize_id(&manifest.options.group_name),
    };

    Some(ids.into_iter().fold(
        XmlElement::new("ComponentGroup").with_attribute("Id", group_id),
        |group, id| group.with_child(XmlElement::new("ComponentRef").with_attribute("Id", id)),
    ))
}

fn component_ids(children: &[DirectoryChild]) -> Vec<String> {
    let mut ids = Vec::new();
    let mut stack: Vec<&DirectoryChild> = children.iter().rev().collect();
    while let Some(child) = stack.pop() {
        match child {
            DirectoryChild::Component(component) => ids.push(component.id.clone()),
            DirectoryChild::Directory(directory) => stack.extend(directory.children.iter().rev()),
            DirectoryChild::Injected(element) => {
                let nested = element.descendants();
                ids.extend(
                    std::iter::once(element)
                        .chain(nested)
                        .filter(|e| e.local_name() == "Component")
                        .filter_map(|e| e.attribute("Id"))
                        .map(str::to_string),
                );
            }
        }
    }
    ids
}

/// Convert typed children to XML without recursing on directory depth.
fn children_to_xml(children: &[DirectoryChild]) -> Vec<XmlNode> {
    struct Frame<'a> {
        element: Option<XmlElement>,
        pending: std::slice::Iter<'a, DirectoryChild>,
        built: Vec<XmlNode>,
    }

    let mut stack = vec![Frame {
        element: None,
        pending: children.iter(),
        built: Vec::new(),
    }];

    while let Some(frame) = stack.last_mut() {
        match frame.pending.next() {
            Some(DirectoryChild::Directory(directory)) => {
                let mut element = XmlElement::new("Directory")
                    .with_attribute("Id", directory.id.as_str())
                    .with_attribute("Name", directory.name.as_str());
                element.attributes.extend(directory.attributes.iter().cloned());
                stack.push(Frame {
                    element: Some(element),
                    pending: directory.children.iter(),
                    built: Vec::new(),
                });
            }
            Some(DirectoryChild::Component(component)) => {
                frame.built.push(XmlNode::Element(component_to_xml(component)));
            }
            Some(DirectoryChild::Injected(element)) => {
                frame.built.push(XmlNode::Element(element.clone()));
            }
            None => {
                let Some(done) = stack.pop() else { break };
                match (done.element, stack.last_mut()) {
                    (Some(mut element), Some(parent)) => {
                        element.children = done.built;
                        parent.built.push(XmlNode::Element(element));
                    }
                    _ => return done.built,
                }
            }
        }
    }
    Vec::new()
}

fn component_to_xml(component: &Component) -> XmlElement {
    let mut element = XmlElement::new("Component")
        .with_attribute("Id", component.id.as_str())
        .with_attribute("Guid", component.guid.as_str());
    if let Some(disk_id) = &component.disk_id {
        element = element.with_attribute("DiskId", disk_id.as_str());
    }
    if let Some(permanent) = &component.permanent {
        element = element.with_attribute("Permanent", permanent.as_str());
    }
    if let Some(win64) = &component.win64 {
        element = element.with_attribute("Win64", win64.as_str());
    }
    if let Some(key_path) = &component.key_path {
        element = element.with_attribute("KeyPath", key_path.as_str());
    }
    if let Some(transitive) = &component.transitive {
        element = element.with_attribute("Transitive", transitive.as_str());
    }
    element.attributes.extend(component.attributes.iter().cloned());

    element = element.with_child(file_to_xml(&component.file));
    if let Some(value) = &component.registry_value {
        element = element.with_child(registry_value_to_xml(value));
    }
    if let Some(condition) = &component.condition {
        element = element.with_child(XmlElement::new("Condition").with_text(condition.as_str()));
    }
    for extra in &component.extra_children {
        element = element.with_child(extra.clone());
    }
    element
}

fn file_to_xml(file: &FileEntry) -> XmlElement {
    let mut element = XmlElement::new("File").with_attribute("Id", file.id.as_str());
    if let Some(checksum) = &file.checksum {
        element = element.with_attribute("Checksum", checksum.as_str());
    }
    if let Some(key_path) = &file.key_path {
        element = element.with_attribute("KeyPath", key_path.as_str());
    }
    element = element.with_attribute("Source", file.source.as_str());
    element.attributes.extend(file.attributes.iter().cloned());
    element
        .children
        .extend(file.children.iter().cloned().map(XmlNode::Element));
    element
}

fn registry_value_to_xml(value: &RegistryValue) -> XmlElement {
    let mut element = XmlElement::new("RegistryValue")
        .with_attribute("Root", value.root.as_str())
        .with_attribute("Key", value.key.as_str())
        .with_attribute("Name", value.name.as_str())
        .with_attribute("Value", value.value.as_str())
        .with_attribute("Type", value.kind.as_str());
    if let Some(key_path) = &value.key_path {
        element = element.with_attribute("KeyPath", key_path.as_str());
    }
    element.attributes.extend(value.attributes.iter().cloned());
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Directory, DirectoryRef, ManifestOptions, parse_manifest};
    use crate::utils::SequenceCounters;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn component(id: &str, source: &str) -> Component {
        Component {
            id: id.to_string(),
            guid: format!("GUID-{id}"),
            file: FileEntry {
                id: format!("f{id}"),
                source: source.to_string(),
                key_path: Some("yes".to_string()),
                ..FileEntry::default()
            },
            ..Component::default()
        }
    }

    fn manifest(numbering: Numbering) -> Manifest {
        Manifest {
            options: ManifestOptions {
                numbering,
                group_name: "My-Group".to_string(),
                directory: "/src".to_string(),
                include_files: vec!["a.wxi".to_string(), "b.wxi".to_string()],
                ..ManifestOptions::default()
            },
            namespaces: vec![("xmlns:util".to_string(), "urn:util".to_string())],
            directory_ref: DirectoryRef {
                id: "INSTALLDIR".to_string(),
                children: vec![DirectoryChild::Directory(Directory {
                    id: "dir_1".to_string(),
                    name: "src".to_string(),
                    attributes: Vec::new(),
                    children: vec![
                        DirectoryChild::Component(component("comp_10", "/src/x.txt")),
                        DirectoryChild::Component(component("comp_9", "/src/y.txt")),
                        DirectoryChild::Injected(
                            XmlElement::new("Component")
                                .with_attribute("Id", "injected")
                                .with_attribute("Guid", "*"),
                        ),
                    ],
                })],
            },
        }
    }

    fn group_refs(group: &XmlElement) -> Vec<&str> {
        group
            .elements()
            .filter_map(|e| e.attribute("Id"))
            .collect()
    }

    #[test]
    fn test_modern_group_keeps_document_order() {
        let group = component_group(&manifest(Numbering::Random)).expect("group");
        assert_eq!(group.attribute("Id"), Some("My_Group"));
        assert_eq!(group_refs(&group), vec!["comp_10", "comp_9", "injected"]);
    }

    #[test]
    fn test_legacy_group_sorted_naturally() {
        let group = component_group(&manifest(Numbering::Sequential(
            SequenceCounters::default(),
        )))
        .expect("group");
        assert_eq!(group.attribute("Id"), Some("group_My_Group"));
        assert_eq!(group_refs(&group), vec!["comp_9", "comp_10", "injected"]);
    }

    #[test]
    fn test_no_group_without_components() {
        let mut empty = manifest(Numbering::Random);
        empty.directory_ref.children.clear();
        assert!(component_group(&empty).is_none());
    }

    #[test]
    fn test_document_layout() -> anyhow::Result<()> {
        let document = to_document(&manifest(Numbering::Random))?;
        let root = &document.root;
        assert_eq!(root.attribute("xmlns"), Some(crate::manifest::WIX3_NAMESPACE));
        assert_eq!(root.attribute("xmlns:util"), Some("urn:util"));
        assert!(matches!(root.children[0], XmlNode::Comment(_)));
        assert_eq!(
            root.children[1],
            XmlNode::ProcessingInstruction("include b.wxi".to_string())
        );
        assert_eq!(
            root.children[2],
            XmlNode::ProcessingInstruction("include a.wxi".to_string())
        );

        let fragment = root.first_named("Fragment").expect("fragment");
        let names: Vec<&str> = fragment.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ComponentGroup", "DirectoryRef"]);
        Ok(())
    }

    #[test]
    fn test_render_then_parse_then_render_is_identical() -> anyhow::Result<()> {
        let original = manifest(Numbering::Random);
        let first = render_manifest(&original)?;
        let parsed = parse_manifest(&first, Path::new("m.wxs"))?;
        assert_eq!(parsed.options, original.options);
        assert_eq!(render_manifest(&parsed)?, first);
        Ok(())
    }

    #[test]
    fn test_component_attribute_order() {
        let mut comp = component("c", r"$(var.S)\a.dll");
        comp.disk_id = Some("2".to_string());
        comp.win64 = Some("yes".to_string());
        comp.file.checksum = Some("yes".to_string());
        comp.mark_removed();
        let element = component_to_xml(&comp);

        let keys: Vec<&str> = element.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Id", "Guid", "DiskId", "Win64", "Transitive"]);
        let file = element.first_named("File").expect("file");
        let file_keys: Vec<&str> = file.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(file_keys, vec!["Id", "Checksum", "KeyPath", "Source"]);
        assert_eq!(element.first_named("Condition").expect("condition").text(), "1 = 0");
    }
}
