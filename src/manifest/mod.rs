//! Typed model of a generated WiX fragment.
//!
//! A manifest is always shaped the same way:
//!
//! ```text
//! Wix
//! ├── <!-- options header -->
//! ├── <?include ...?>            (zero or more)
//! └── Fragment
//!     ├── ComponentGroup         (rebuilt on every run, omitted when empty)
//!     └── DirectoryRef
//!         └── Directory / Component / injected content ...
//! ```
//!
//! Directories and components are closed, typed variants. Content spliced in
//! from injection sidecars is the only thing kept as a generic XML element.

pub mod options;
mod parse;
mod serialize;

pub use options::{ManifestOptions, Numbering, OptionExtras};
pub use parse::parse_manifest;
pub use serialize::{component_group, render_manifest, to_document};

use crate::xml::XmlElement;

/// WiX 3 default namespace.
pub const WIX3_NAMESPACE: &str = "http://schemas.microsoft.com/wix/2006/wi";

/// WiX 4 default namespace.
pub const WIX4_NAMESPACE: &str = "http://wixtoolset.org/schemas/v4/wxs";

/// Directory reference id used when none is given.
pub const DEFAULT_DIRECTORY_REF: &str = "INSTALLDIR";

/// Condition text that keeps a removed-file component from ever installing.
pub const NEVER_INSTALL_CONDITION: &str = "1 = 0";

/// Extensions that get `Checksum="yes"` on their File entry.
pub const CHECKSUM_EXTENSIONS: [&str; 3] = ["DLL", "EXE", "OCX"];

/// A complete manifest document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Settings persisted in the options header
    pub options: ManifestOptions,
    /// Extra `xmlns:*` declarations carried over from the input root
    pub namespaces: Vec<(String, String)>,
    /// The single directory reference and everything under it
    pub directory_ref: DirectoryRef,
}

impl Manifest {
    /// Default namespace for this manifest's WiX generation.
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        if self.options.wix4 {
            WIX4_NAMESPACE
        } else {
            WIX3_NAMESPACE
        }
    }

    /// Every typed component in document order.
    #[must_use]
    pub fn components(&self) -> Vec<&Component> {
        let mut found = Vec::new();
        let mut stack: Vec<&DirectoryChild> = self.directory_ref.children.iter().rev().collect();
        while let Some(child) = stack.pop() {
            match child {
                DirectoryChild::Component(component) => found.push(component),
                DirectoryChild::Directory(directory) => {
                    stack.extend(directory.children.iter().rev());
                }
                DirectoryChild::Injected(_) => {}
            }
        }
        found
    }
}

/// The `DirectoryRef` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryRef {
    /// Referenced directory id, `INSTALLDIR` by default
    pub id: String,
    /// Directory contents
    pub children: Vec<DirectoryChild>,
}

/// Anything that can sit under a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryChild {
    /// Nested directory
    Directory(Directory),
    /// One file and its component
    Component(Component),
    /// Verbatim content, e.g. from an injection sidecar
    Injected(XmlElement),
}

/// A `Directory` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directory {
    /// `Id` attribute
    pub id: String,
    /// `Name` attribute, the on-disk directory name
    pub name: String,
    /// Other attributes, kept in document order
    pub attributes: Vec<(String, String)>,
    /// Directory contents
    pub children: Vec<DirectoryChild>,
}

impl Directory {
    /// Typed components directly under this directory.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        components_of(&self.children)
    }
}

/// Typed components directly within `children`.
pub fn components_of(children: &[DirectoryChild]) -> impl Iterator<Item = &Component> {
    children.iter().filter_map(|child| match child {
        DirectoryChild::Component(component) => Some(component),
        _ => None,
    })
}

/// Typed subdirectories directly within `children`.
pub fn directories_of(children: &[DirectoryChild]) -> impl Iterator<Item = &Directory> {
    children.iter().filter_map(|child| match child {
        DirectoryChild::Directory(directory) => Some(directory),
        _ => None,
    })
}

/// A `Component` holding exactly one file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Component {
    /// `Id` attribute
    pub id: String,
    /// `Guid` attribute, copied verbatim once created
    pub guid: String,
    /// `DiskId` attribute; only written for disks above 1
    pub disk_id: Option<String>,
    /// `Permanent` attribute value
    pub permanent: Option<String>,
    /// `Win64` attribute value
    pub win64: Option<String>,
    /// Legacy `KeyPath` on the component itself, migrated to the file on update
    pub key_path: Option<String>,
    /// `Transitive` attribute value; present once the file was removed from disk
    pub transitive: Option<String>,
    /// Other attributes, kept in document order
    pub attributes: Vec<(String, String)>,
    /// The component's single file
    pub file: FileEntry,
    /// Per-user key path holder
    pub registry_value: Option<RegistryValue>,
    /// Text of the `Condition` child
    pub condition: Option<String>,
    /// Other child elements, kept verbatim
    pub extra_children: Vec<XmlElement>,
}

impl Component {
    /// Whether the component carries a `Transitive` attribute, whatever its value.
    #[must_use]
    pub const fn is_transitive(&self) -> bool {
        self.transitive.is_some()
    }

    /// Turn this component into a removed-file record.
    ///
    /// Already-marked components are left untouched.
    pub fn mark_removed(&mut self) {
        if self.transitive.is_none() {
            self.transitive = yes(true);
            self.condition = Some(NEVER_INSTALL_CONDITION.to_string());
        }
    }
}

/// A `File` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileEntry {
    /// `Id` attribute
    pub id: String,
    /// `Source` attribute: the aliased path of the file
    pub source: String,
    /// `Checksum` attribute value
    pub checksum: Option<String>,
    /// `KeyPath` attribute value
    pub key_path: Option<String>,
    /// Other attributes, kept in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements, kept verbatim
    pub children: Vec<XmlElement>,
}

/// A per-user `RegistryValue` acting as the component's key path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryValue {
    /// `Root` attribute, `HKCU` for generated values
    pub root: String,
    /// `Key` attribute
    pub key: String,
    /// `Name` attribute, a file-style id
    pub name: String,
    /// `Value` attribute
    pub value: String,
    /// `Type` attribute
    pub kind: String,
    /// `KeyPath` attribute value
    pub key_path: Option<String>,
    /// Other attributes, kept in document order
    pub attributes: Vec<(String, String)>,
}

/// Registry key under which per-user components record their key path.
pub const PER_USER_REGISTRY_KEY: &str = r"Software\[Manufacturer]\[ProductName]\InstalledFiles";

impl RegistryValue {
    /// Key path value for a per-user component.
    #[must_use]
    pub fn per_user(name: String) -> Self {
        Self {
            root: "HKCU".to_string(),
            key: PER_USER_REGISTRY_KEY.to_string(),
            name,
            value: String::new(),
            kind: "string".to_string(),
            key_path: yes(true),
            attributes: Vec::new(),
        }
    }
}

/// `Some("yes")` when `set`, the value generated flag attributes carry.
#[must_use]
pub fn yes(set: bool) -> Option<String> {
    set.then(|| "yes".to_string())
}

/// Whether `source` names a file that gets `Checksum="yes"`.
#[must_use]
pub fn needs_checksum(source: &str) -> bool {
    std::path::Path::new(source)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CHECKSUM_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(id: &str, source: &str) -> Component {
        Component {
            id: id.to_string(),
            file: FileEntry {
                source: source.to_string(),
                ..FileEntry::default()
            },
            ..Component::default()
        }
    }

    #[test]
    fn test_mark_removed_is_idempotent() {
        let mut comp = component("c1", "a.txt");
        comp.mark_removed();
        comp.mark_removed();
        assert_eq!(comp.transitive.as_deref(), Some("yes"));
        assert_eq!(comp.condition.as_deref(), Some(NEVER_INSTALL_CONDITION));
    }

    #[test]
    fn test_mark_removed_keeps_existing_transitive_value() {
        let mut comp = component("c1", "a.txt");
        comp.transitive = Some("no".to_string());
        comp.mark_removed();
        assert!(comp.is_transitive());
        assert_eq!(comp.transitive.as_deref(), Some("no"));
        assert!(comp.condition.is_none());
    }

    #[test]
    fn test_components_in_document_order() {
        let manifest = Manifest {
            options: ManifestOptions::default(),
            namespaces: Vec::new(),
            directory_ref: DirectoryRef {
                id: DEFAULT_DIRECTORY_REF.to_string(),
                children: vec![DirectoryChild::Directory(Directory {
                    id: "d1".to_string(),
                    name: "root".to_string(),
                    attributes: Vec::new(),
                    children: vec![
                        DirectoryChild::Component(component("c1", "a")),
                        DirectoryChild::Directory(Directory {
                            id: "d2".to_string(),
                            name: "sub".to_string(),
                            attributes: Vec::new(),
                            children: vec![DirectoryChild::Component(component("c2", "b"))],
                        }),
                        DirectoryChild::Component(component("c3", "c")),
                    ],
                })],
            },
        };
        let ids: Vec<&str> = manifest.components().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_needs_checksum() {
        assert!(needs_checksum(r"$(var.Src)\bin\App.EXE"));
        assert!(needs_checksum("lib/native.dll"));
        assert!(needs_checksum("ctl.Ocx"));
        assert!(!needs_checksum("readme.txt"));
        assert!(!needs_checksum("noext"));
    }
}
