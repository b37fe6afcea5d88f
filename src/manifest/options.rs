//! The options header: every setting needed to regenerate a manifest.
//!
//! The header is stored as an XML comment, the first child of the root, whose
//! text is a nested `CommandLineOptions` element. Element names are shared
//! with manifests produced by earlier generators of this format, so those
//! files keep updating cleanly.

use super::DEFAULT_DIRECTORY_REF;
use crate::error::{ManifestError, Result};
use crate::scanner::normalize_extension;
use crate::utils::SequenceCounters;
use crate::xml::{self, XmlElement};

/// Newest manifest format this crate reads and writes.
pub const CURRENT_FORMAT_VERSION: u32 = 2;

/// Group names must be shorter than this many characters.
pub const MAX_GROUP_NAME_LEN: usize = 65;

const OPTIONS: &str = "CommandLineOptions";
const PRODUCER: &str = "Producer";
const WARNING: &str = "WARNING";
const VERSION: &str = "ParaffinFileVersion";
const GROUP_NAME: &str = "GroupName";
const CUSTOM: &str = "Custom";
const INCREMENT: &str = "Increment";
const NEXT_DIRECTORY: &str = "NextDirectoryNumber";
const NEXT_COMPONENT: &str = "NextComponentNumber";
const DIRECTORY: &str = "Directory";
const ALIAS: &str = "DirAlias";
const WIN64: &str = "Win64";
const NO_RECURSE: &str = "Norecurse";
const NO_ROOT_DIRECTORY: &str = "NoRootDirectory";
const DISK_ID: &str = "DiskId";
const PERMANENT: &str = "Permanent";
const WIX4: &str = "WiX4";
const PER_USER: &str = "PerUser";
const MULTIPLE: &str = "Multiple";
const EXTENSION_EXCLUDES: (&str, &str) = ("ExtensionExcludes", "Ext");
const DIRECTORY_EXCLUDES: (&str, &str) = ("DirExcludes", "Dir");
const INCLUDE_FILES: (&str, &str) = ("IncludeFiles", "File");
const REGEX_EXCLUDES: (&str, &str) = ("RegExExcludes", "RegEx");

const PRODUCER_TEXT: &str = "Autogenerated by wixsync";
const WARNING_TEXT: &str =
    "Manual changes to this file may cause incorrect behavior and will be lost on update.";

/// How new identifiers are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Numbering {
    /// Format version 2: random tokens
    #[default]
    Random,
    /// Format version 1: readable sequential ids
    Sequential(SequenceCounters),
}

impl Numbering {
    /// Format version this numbering belongs to.
    #[must_use]
    pub const fn format_version(&self) -> u32 {
        match self {
            Self::Random => CURRENT_FORMAT_VERSION,
            Self::Sequential(_) => 1,
        }
    }
}

/// Settings used to produce a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Identifier scheme and, for legacy files, the counters
    pub numbering: Numbering,
    /// Component group name
    pub group_name: String,
    /// Starting directory, as given on creation
    pub directory: String,
    /// Replacement for the starting directory in `Source` paths
    pub alias: Option<String>,
    /// `Win64` attribute value for new components
    pub win64: Option<String>,
    /// Only package the starting directory itself
    pub no_recurse: bool,
    /// Put the starting directory's files directly under the `DirectoryRef`
    pub no_root_directory: bool,
    /// Disk id for new components
    pub disk_id: u32,
    /// Mark new components permanent
    pub permanent: bool,
    /// Emit the WiX 4 namespace
    pub wix4: bool,
    /// Per-user install: registry values hold the key paths
    pub per_user: bool,
    /// Excluded extensions, normalized (`.PDB`)
    pub extension_excludes: Vec<String>,
    /// Excluded directory substrings
    pub directory_excludes: Vec<String>,
    /// Files referenced through `<?include?>`
    pub include_files: Vec<String>,
    /// Case-insensitive exclusion patterns
    pub regex_excludes: Vec<String>,
    /// `DirectoryRef` id. Not part of the header; read back from the document.
    pub directory_ref: String,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            numbering: Numbering::Random,
            group_name: String::new(),
            directory: String::new(),
            alias: None,
            win64: None,
            no_recurse: false,
            no_root_directory: false,
            disk_id: 1,
            permanent: false,
            wix4: false,
            per_user: false,
            extension_excludes: Vec::new(),
            directory_excludes: Vec::new(),
            include_files: Vec::new(),
            regex_excludes: Vec::new(),
            directory_ref: DEFAULT_DIRECTORY_REF.to_string(),
        }
    }
}

/// List options supplied on top of a stored header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionExtras {
    /// Additional excluded extensions
    pub extension_excludes: Vec<String>,
    /// Additional excluded directory substrings
    pub directory_excludes: Vec<String>,
    /// Additional exclusion patterns
    pub regex_excludes: Vec<String>,
    /// Additional include directives
    pub include_files: Vec<String>,
}

impl OptionExtras {
    /// Append another set of extras (duplicates are removed on merge).
    pub fn extend(&mut self, other: &Self) {
        self.extension_excludes.extend_from_slice(&other.extension_excludes);
        self.directory_excludes.extend_from_slice(&other.directory_excludes);
        self.regex_excludes.extend_from_slice(&other.regex_excludes);
        self.include_files.extend_from_slice(&other.include_files);
    }
}

impl ManifestOptions {
    /// Format version written to the header.
    #[must_use]
    pub const fn format_version(&self) -> u32 {
        self.numbering.format_version()
    }

    /// Union extra list options into these settings, keeping order and
    /// dropping duplicates.
    pub fn merge_extras(&mut self, extras: &OptionExtras) {
        let extensions: Vec<String> = extras
            .extension_excludes
            .iter()
            .map(|e| normalize_extension(e))
            .collect();
        union_into(&mut self.extension_excludes, &extensions);
        union_into(&mut self.directory_excludes, &extras.directory_excludes);
        union_into(&mut self.regex_excludes, &extras.regex_excludes);
        union_into(&mut self.include_files, &extras.include_files);
    }

    /// Normalize the extension list in place.
    pub fn normalize(&mut self) {
        let extensions = std::mem::take(&mut self.extension_excludes);
        let normalized: Vec<String> = extensions.iter().map(|e| normalize_extension(e)).collect();
        union_into(&mut self.extension_excludes, &normalized);
    }

    /// Build the `CommandLineOptions` element.
    #[must_use]
    pub fn to_header(&self) -> XmlElement {
        let mut header = XmlElement::new(OPTIONS)
            .with_child(text_element(PRODUCER, PRODUCER_TEXT))
            .with_child(text_element(WARNING, WARNING_TEXT));

        header = match self.numbering {
            Numbering::Random => header
                .with_child(text_element(VERSION, &CURRENT_FORMAT_VERSION.to_string()))
                .with_child(text_element(GROUP_NAME, &self.group_name)),
            Numbering::Sequential(counters) => header
                .with_child(text_element(CUSTOM, &self.group_name))
                .with_child(text_element(INCREMENT, &counters.increment.to_string()))
                .with_child(text_element(NEXT_DIRECTORY, &counters.next_directory.to_string()))
                .with_child(text_element(NEXT_COMPONENT, &counters.next_component.to_string())),
        };

        header
            .with_child(text_element(DIRECTORY, &self.directory))
            .with_child(text_element(ALIAS, self.alias.as_deref().unwrap_or_default()))
            .with_child(text_element(WIN64, self.win64.as_deref().unwrap_or_default()))
            .with_child(text_element(NO_RECURSE, bool_text(self.no_recurse)))
            .with_child(text_element(NO_ROOT_DIRECTORY, bool_text(self.no_root_directory)))
            .with_child(text_element(DISK_ID, &self.disk_id.to_string()))
            .with_child(text_element(PERMANENT, bool_text(self.permanent)))
            .with_child(text_element(WIX4, bool_text(self.wix4)))
            .with_child(text_element(PER_USER, bool_text(self.per_user)))
            .with_child(list_element(EXTENSION_EXCLUDES, &self.extension_excludes))
            .with_child(list_element(DIRECTORY_EXCLUDES, &self.directory_excludes))
            .with_child(list_element(INCLUDE_FILES, &self.include_files))
            .with_child(list_element(REGEX_EXCLUDES, &self.regex_excludes))
    }

    /// Text stored inside the header comment.
    ///
    /// # Errors
    ///
    /// Returns an error if the element cannot be serialized.
    pub fn to_header_text(&self) -> Result<String> {
        xml::write_fragment(&self.to_header())
    }

    /// Read settings back from header comment text.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidOptionsHeader`] for missing or
    /// malformed fields, [`ManifestError::UnsupportedVersion`] for headers from
    /// a newer format, and [`ManifestError::MultipleFilesPerComponent`] for
    /// the retired multi-file layout.
    pub fn from_header_text(text: &str) -> Result<Self> {
        let document = xml::parse_document(text)
            .map_err(|e| ManifestError::header(format!("header is not valid XML: {e}")))?;
        Self::from_header(&document.root)
    }

    /// Read settings from a `CommandLineOptions` element.
    ///
    /// # Errors
    ///
    /// See [`Self::from_header_text`].
    pub fn from_header(header: &XmlElement) -> Result<Self> {
        if header.local_name() != OPTIONS {
            return Err(ManifestError::header(format!(
                "expected <{OPTIONS}>, found <{}>",
                header.name
            )));
        }

        let field = |name: &str| header.first_named(name).map(XmlElement::text);
        let required = |name: &str| {
            field(name).ok_or_else(|| ManifestError::header(format!("missing <{name}>")))
        };

        if let Some(multiple) = field(MULTIPLE)
            && parse_bool(MULTIPLE, &multiple)?
        {
            return Err(ManifestError::MultipleFilesPerComponent { component: None });
        }

        let (numbering, group_name) = match field(VERSION) {
            Some(version) => {
                let found: u32 = parse_number(VERSION, &version)?;
                if found > CURRENT_FORMAT_VERSION {
                    return Err(ManifestError::UnsupportedVersion {
                        found,
                        supported: CURRENT_FORMAT_VERSION,
                    });
                }
                (Numbering::Random, required(GROUP_NAME)?)
            }
            None => {
                let counters = SequenceCounters {
                    next_directory: parse_number(NEXT_DIRECTORY, &required(NEXT_DIRECTORY)?)?,
                    next_component: parse_number(NEXT_COMPONENT, &required(NEXT_COMPONENT)?)?,
                    increment: parse_number(INCREMENT, &required(INCREMENT)?)?,
                };
                (Numbering::Sequential(counters), required(CUSTOM)?)
            }
        };

        let win64 = field(WIN64)
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("false"));

        let optional_bool = |name: &str| -> Result<bool> {
            field(name).map_or(Ok(false), |value| parse_bool(name, &value))
        };

        let mut options = Self {
            numbering,
            group_name,
            directory: required(DIRECTORY)?,
            alias: field(ALIAS).filter(|alias| !alias.is_empty()),
            win64,
            no_recurse: parse_bool(NO_RECURSE, &required(NO_RECURSE)?)?,
            no_root_directory: optional_bool(NO_ROOT_DIRECTORY)?,
            disk_id: field(DISK_ID).map_or(Ok(1), |value| parse_number(DISK_ID, &value))?,
            permanent: optional_bool(PERMANENT)?,
            wix4: optional_bool(WIX4)?,
            per_user: optional_bool(PER_USER)?,
            extension_excludes: list_items(header, EXTENSION_EXCLUDES),
            directory_excludes: list_items(header, DIRECTORY_EXCLUDES),
            include_files: list_items(header, INCLUDE_FILES),
            regex_excludes: list_items(header, REGEX_EXCLUDES),
            directory_ref: DEFAULT_DIRECTORY_REF.to_string(),
        };
        options.normalize();
        Ok(options)
    }
}

fn union_into(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !item.is_empty() && !target.contains(item) {
            target.push(item.clone());
        }
    }
}

fn text_element(name: &str, value: &str) -> XmlElement {
    let element = XmlElement::new(name);
    if value.is_empty() {
        element
    } else {
        element.with_text(value)
    }
}

fn list_element((list, item): (&str, &str), values: &[String]) -> XmlElement {
    values
        .iter()
        .fold(XmlElement::new(list), |element, value| {
            element.with_child(text_element(item, value))
        })
}

fn list_items(header: &XmlElement, (list, item): (&str, &str)) -> Vec<String> {
    header
        .elements_named(list)
        .flat_map(|element| element.elements_named(item))
        .map(XmlElement::text)
        .filter(|value| !value.is_empty())
        .collect()
}

const fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ManifestError::header(format!(
            "<{name}> must be true or false, found '{value}'"
        )))
    }
}

fn parse_number(name: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| {
        ManifestError::header(format!("<{name}> must be a whole number, found '{value}'"))
    })
}
