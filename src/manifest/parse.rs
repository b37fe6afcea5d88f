use super::{
    Component, Directory, DirectoryChild, DirectoryRef, FileEntry, Manifest, ManifestOptions,
    RegistryValue,
};
use crate::error::{ManifestError, Result};
use crate::xml::{self, XmlElement, XmlNode};
use std::path::Path;
use tracing::debug;

/// Parse a previously generated manifest.
///
/// The root's first child must be the options header comment. Settings are
/// rebuilt from it, and the `DirectoryRef` id is taken from the document.
///
/// # Errors
///
/// Returns [`ManifestError::MissingOptionsHeader`] if the document does not
/// start with the header, the header's own errors, or
/// [`ManifestError::InvalidStructure`] / [`ManifestError::MultipleFilesPerComponent`]
/// for a body this crate cannot have written.
pub fn parse_manifest(text: &str, path: &Path) -> Result<Manifest> {
    let document = xml::parse_document(text)?;
    let root = document.root;

    let Some(XmlNode::Comment(header)) = root.children.first() else {
        return Err(ManifestError::MissingOptionsHeader {
            path: path.to_path_buf(),
        });
    };
    let mut options = ManifestOptions::from_header_text(header)?;

    let namespaces = root
        .attributes
        .iter()
        .filter(|(key, _)| key.starts_with("xmlns:"))
        .cloned()
        .collect();

    let directory_ref = root
        .descendants()
        .into_iter()
        .find(|e| e.local_name() == "DirectoryRef")
        .ok_or_else(|| ManifestError::structure("no DirectoryRef element"))?;

    let id = directory_ref
        .attribute("Id")
        .ok_or_else(|| ManifestError::structure("DirectoryRef has no Id"))?
        .to_string();
    options.directory_ref.clone_from(&id);

    let children = parse_children(directory_ref)?;
    debug!(
        path = %path.display(),
        format = options.format_version(),
        "Parsed manifest"
    );

    Ok(Manifest {
        options,
        namespaces,
        directory_ref: DirectoryRef { id, children },
    })
}

/// Convert the children of a directory-like element into typed nodes.
///
/// Nesting depth follows the packaged directory tree, so the conversion
/// keeps its own stack of partially built directories instead of recursing.
fn parse_children(element: &XmlElement) -> Result<Vec<DirectoryChild>> {
    // Each frame: the directory being built and the XML children still to visit.
    struct Frame<'a> {
        directory: Option<Directory>,
        pending: std::slice::Iter<'a, XmlNode>,
        children: Vec<DirectoryChild>,
    }

    let mut stack = vec![Frame {
        directory: None,
        pending: element.children.iter(),
        children: Vec::new(),
    }];

    loop {
        let Some(frame) = stack.last_mut() else {
            return Err(ManifestError::structure("empty parse stack"));
        };

        let Some(node) = frame.pending.next() else {
            let finished = stack.pop().map(|f| (f.directory, f.children));
            match (finished, stack.last_mut()) {
                (Some((Some(mut directory), children)), Some(parent)) => {
                    directory.children = children;
                    parent.children.push(DirectoryChild::Directory(directory));
                    continue;
                }
                (Some((None, children)), None) => return Ok(children),
                _ => return Err(ManifestError::structure("unbalanced directory nesting")),
            }
        };

        let XmlNode::Element(child) = node else {
            continue;
        };

        match child.local_name() {
            "Directory" => stack.push(Frame {
                directory: Some(parse_directory_header(child)?),
                pending: child.children.iter(),
                children: Vec::new(),
            }),
            "Component" => {
                let parsed = parse_component(child)?;
                frame.children.push(parsed);
            }
            _ => frame.children.push(DirectoryChild::Injected(child.clone())),
        }
    }
}

fn parse_directory_header(element: &XmlElement) -> Result<Directory> {
    let mut directory = Directory::default();
    for (key, value) in &element.attributes {
        match key.as_str() {
            "Id" => directory.id.clone_from(value),
            "Name" => directory.name.clone_from(value),
            _ => directory.attributes.push((key.clone(), value.clone())),
        }
    }
    if directory.name.is_empty() {
        return Err(ManifestError::structure(format!(
            "Directory '{}' has no Name",
            directory.id
        )));
    }
    Ok(directory)
}

/// A component with exactly one File becomes typed; one without any File is
/// hand-written or injected content and stays verbatim.
fn parse_component(element: &XmlElement) -> Result<DirectoryChild> {
    let id = element.attribute("Id").map(str::to_string);
    let file_count = element.elements_named("File").count();
    if file_count == 0 {
        return Ok(DirectoryChild::Injected(element.clone()));
    }
    if file_count > 1 {
        return Err(ManifestError::MultipleFilesPerComponent { component: id });
    }

    let mut component = Component::default();
    for (key, value) in &element.attributes {
        match key.as_str() {
            "Id" => component.id.clone_from(value),
            "Guid" => component.guid.clone_from(value),
            "DiskId" => component.disk_id = Some(value.clone()),
            "Permanent" => component.permanent = Some(value.clone()),
            "Win64" => component.win64 = Some(value.clone()),
            "KeyPath" => component.key_path = Some(value.clone()),
            "Transitive" => component.transitive = Some(value.clone()),
            _ => component.attributes.push((key.clone(), value.clone())),
        }
    }

    for child in element.elements() {
        match child.local_name() {
            "File" => component.file = parse_file(child)?,
            "RegistryValue" if component.registry_value.is_none() => {
                component.registry_value = Some(parse_registry_value(child));
            }
            "Condition" if component.condition.is_none() => {
                component.condition = Some(child.text());
            }
            _ => component.extra_children.push(child.clone()),
        }
    }

    Ok(DirectoryChild::Component(component))
}

fn parse_file(element: &XmlElement) -> Result<FileEntry> {
    let mut file = FileEntry::default();
    for (key, value) in &element.attributes {
        match key.as_str() {
            "Id" => file.id.clone_from(value),
            "Source" => file.source.clone_from(value),
            "Checksum" => file.checksum = Some(value.clone()),
            "KeyPath" => file.key_path = Some(value.clone()),
            _ => file.attributes.push((key.clone(), value.clone())),
        }
    }
    if file.source.is_empty() {
        return Err(ManifestError::structure(format!(
            "File '{}' has no Source",
            file.id
        )));
    }
    file.children = element.elements().cloned().collect();
    Ok(file)
}

fn parse_registry_value(element: &XmlElement) -> RegistryValue {
    let mut value = RegistryValue::default();
    for (key, text) in &element.attributes {
        match key.as_str() {
            "Root" => value.root.clone_from(text),
            "Key" => value.key.clone_from(text),
            "Name" => value.name.clone_from(text),
            "Value" => value.value.clone_from(text),
            "Type" => value.kind.clone_from(text),
            "KeyPath" => value.key_path = Some(text.clone()),
            _ => value.attributes.push((key.clone(), text.clone())),
        }
    }
    value
}
