//! Reconciliation of a manifest against the current state of disk.
//!
//! The walk visits directories in depth-first pre-order using an explicit
//! worklist. Output directories are allocated in an arena as they are
//! visited; a directory's slot in its parent is reserved at visit time so
//! sibling order matches what a recursive walk would produce. Because a
//! child is always allocated after its parent, the tree is assembled by
//! draining the arena from the highest index down.

mod files;
mod inject;
mod patch;

pub use inject::{injected_content, load_injection_file};
pub use patch::{create_placeholders, removed_file_paths};

use crate::error::{ManifestError, Result};
use crate::manifest::{
    Directory, DirectoryChild, DirectoryRef, Manifest, ManifestOptions, Numbering, OptionExtras,
    directories_of,
};
use crate::scanner::{ExclusionFilter, list_directory};
use crate::utils::paths::{absolute_directory, file_name_str};
use crate::utils::{IdGenerator, PathAlias, TokenSource};
use std::path::PathBuf;
use tracing::{Level, debug, info, span};

/// Options that apply to a single update run and are never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Keep removed files as transitive records instead of dropping them
    pub patch_update: bool,
    /// Create zero-byte placeholders for removed files
    pub create_placeholders: bool,
}

/// Result of a create or update run.
#[derive(Debug)]
pub struct Reconciled {
    /// The new manifest
    pub manifest: Manifest,
    /// Non-fatal notices, e.g. implicit `KeyPath` migrations
    pub warnings: Vec<String>,
    /// Placeholder files created on disk
    pub placeholders: Vec<PathBuf>,
}

/// Generate a brand-new manifest for `options.directory`.
///
/// # Errors
///
/// Returns an error if the directory cannot be walked, a pattern is
/// invalid, or an injection file is malformed.
pub fn create(options: ManifestOptions, tokens: Box<dyn TokenSource>) -> Result<Reconciled> {
    let span = span!(Level::DEBUG, "create", directory = %options.directory);
    let _guard = span.enter();

    let mut session = Session::new(options, Vec::new(), UpdateOptions::default(), tokens)?;
    let directory_ref = session.walk(None)?;
    session.finish(directory_ref)
}

/// Reconcile `prior` against disk, producing the next manifest.
///
/// `extras` are unioned into the stored list options first.
///
/// # Errors
///
/// Returns an error for structural conflicts in the prior manifest, a
/// removed file that came back with content, malformed injection files, or
/// filesystem failures. Nothing is written to disk unless the walk succeeds.
pub fn update(
    prior: &Manifest,
    extras: &OptionExtras,
    run: UpdateOptions,
    tokens: Box<dyn TokenSource>,
) -> Result<Reconciled> {
    let span = span!(Level::DEBUG, "update", directory = %prior.options.directory);
    let _guard = span.enter();

    let mut options = prior.options.clone();
    options.merge_extras(extras);

    let mut session = Session::new(options, prior.namespaces.clone(), run, tokens)?;
    let directory_ref = session.walk(Some(&prior.directory_ref))?;

    let placeholders = create_placeholders(&session.pending_placeholders)?;
    let mut reconciled = session.finish(directory_ref)?;
    reconciled.placeholders = placeholders;
    Ok(reconciled)
}

/// State shared by every step of one run.
struct Session {
    options: ManifestOptions,
    namespaces: Vec<(String, String)>,
    start: PathBuf,
    base_name: String,
    filter: ExclusionFilter,
    alias: PathAlias,
    ids: IdGenerator,
    run: UpdateOptions,
    warnings: Vec<String>,
    pending_placeholders: Vec<PathBuf>,
}

/// Output directory under construction.
struct Node {
    /// `None` for the `DirectoryRef` pseudo-node at index 0
    header: Option<Directory>,
    slots: Vec<Slot>,
}

enum Slot {
    Ready(DirectoryChild),
    Nested(usize),
}

/// One pending directory visit.
struct Visit<'p> {
    /// Children of the matched prior parent; `None` while creating a new subtree
    prior_siblings: Option<&'p [DirectoryChild]>,
    path: PathBuf,
    parent: usize,
    dotted: String,
    is_root: bool,
}

impl Session {
    fn new(
        options: ManifestOptions,
        namespaces: Vec<(String, String)>,
        run: UpdateOptions,
        tokens: Box<dyn TokenSource>,
    ) -> Result<Self> {
        let start = absolute_directory(&options.directory)?;
        let base_name = file_name_str(&start)?.to_string();
        let filter = ExclusionFilter::new(
            &options.extension_excludes,
            &options.directory_excludes,
            &options.regex_excludes,
        )?;
        let alias = PathAlias::new(&start, options.alias.as_deref())?;
        let ids = match options.numbering {
            Numbering::Random => IdGenerator::modern(options.group_name.as_str(), tokens),
            Numbering::Sequential(counters) => {
                IdGenerator::legacy(options.group_name.as_str(), counters, tokens)
            }
        };

        Ok(Self {
            options,
            namespaces,
            start,
            base_name,
            filter,
            alias,
            ids,
            run,
            warnings: Vec::new(),
            pending_placeholders: Vec::new(),
        })
    }

    /// Walk disk from the starting directory, optionally against a prior tree.
    fn walk(&mut self, prior: Option<&DirectoryRef>) -> Result<DirectoryRef> {
        let mut arena = vec![Node {
            header: None,
            slots: Vec::new(),
        }];
        let mut worklist = vec![Visit {
            prior_siblings: prior.map(|p| p.children.as_slice()),
            path: self.start.clone(),
            parent: 0,
            dotted: self.base_name.clone(),
            is_root: true,
        }];

        while let Some(visit) = worklist.pop() {
            let span = span!(Level::DEBUG, "visit", path = %visit.path.display());
            let _guard = span.enter();

            let (target, prior_children) = self.open_directory(&visit, &mut arena)?;
            let listing = list_directory(&visit.path, &self.filter, !self.options.no_recurse)?;

            let entries = match prior_children {
                Some(prior_children) => self.reconcile_files(prior_children, &listing.files)?,
                None => self.create_files(&listing.files)?,
            };
            let injected = injected_content(&visit.path)?;

            let node = arena
                .get_mut(target)
                .ok_or_else(|| ManifestError::structure("directory slot out of range"))?;
            node.slots.extend(entries.into_iter().map(Slot::Ready));
            node.slots.extend(
                injected
                    .into_iter()
                    .map(|element| Slot::Ready(DirectoryChild::Injected(element))),
            );

            for subdirectory in listing.subdirectories.into_iter().rev() {
                let name = file_name_str(&subdirectory)?;
                worklist.push(Visit {
                    prior_siblings: prior_children,
                    dotted: format!("{}.{name}", visit.dotted),
                    path: subdirectory,
                    parent: target,
                    is_root: false,
                });
            }
        }

        let id = prior.map_or_else(|| self.options.directory_ref.clone(), |p| p.id.clone());
        assemble(arena, id)
    }

    /// Find or create the output node for a visit.
    ///
    /// Returns the arena index to append into and the prior children to
    /// reconcile against (`None` means the directory is new).
    fn open_directory<'p>(
        &mut self,
        visit: &Visit<'p>,
        arena: &mut Vec<Node>,
    ) -> Result<(usize, Option<&'p [DirectoryChild]>)> {
        if visit.is_root && self.options.no_root_directory {
            // The DirectoryRef doubles as the starting directory.
            return Ok((0, visit.prior_siblings));
        }

        let name = file_name_str(&visit.path)?;
        let matched = match visit.prior_siblings {
            Some(siblings) => find_directory(siblings, name)?,
            None => None,
        };

        let header = match matched {
            Some(prior) => {
                debug!(id = %prior.id, "Matched existing directory");
                Directory {
                    id: prior.id.clone(),
                    name: prior.name.clone(),
                    attributes: prior.attributes.clone(),
                    children: Vec::new(),
                }
            }
            None => {
                info!(path = %visit.path.display(), "Adding new directory");
                Directory {
                    id: self.ids.directory_id(&visit.dotted),
                    name: name.to_string(),
                    attributes: Vec::new(),
                    children: Vec::new(),
                }
            }
        };

        let index = arena.len();
        arena.push(Node {
            header: Some(header),
            slots: Vec::new(),
        });
        arena
            .get_mut(visit.parent)
            .ok_or_else(|| ManifestError::structure("parent slot out of range"))?
            .slots
            .push(Slot::Nested(index));

        Ok((index, matched.map(|d| d.children.as_slice())))
    }

    fn finish(self, directory_ref: DirectoryRef) -> Result<Reconciled> {
        let mut options = self.options;
        if let Some(counters) = self.ids.counters() {
            options.numbering = Numbering::Sequential(counters);
        }

        Ok(Reconciled {
            manifest: Manifest {
                options,
                namespaces: self.namespaces,
                directory_ref,
            },
            warnings: self.warnings,
            placeholders: Vec::new(),
        })
    }
}

/// The prior directory whose name equals `name`, ignoring case.
fn find_directory<'p>(siblings: &'p [DirectoryChild], name: &str) -> Result<Option<&'p Directory>> {
    let wanted = name.to_lowercase();
    let mut matches = directories_of(siblings).filter(|d| d.name.to_lowercase() == wanted);
    let first = matches.next();
    if matches.next().is_some() {
        return Err(ManifestError::DuplicateEntry {
            name: name.to_string(),
        });
    }
    Ok(first)
}

/// Build the final tree, children before parents.
fn assemble(arena: Vec<Node>, id: String) -> Result<DirectoryRef> {
    let mut built: Vec<Option<Directory>> = Vec::new();
    built.resize_with(arena.len(), || None);

    for (index, node) in arena.into_iter().enumerate().rev() {
        let children = node
            .slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Ready(child) => Ok(child),
                Slot::Nested(nested) => built
                    .get_mut(nested)
                    .and_then(Option::take)
                    .map(DirectoryChild::Directory)
                    .ok_or_else(|| ManifestError::structure("directory assembled out of order")),
            })
            .collect::<Result<Vec<_>>>()?;

        match node.header {
            Some(mut directory) => {
                directory.children = children;
                if let Some(slot) = built.get_mut(index) {
                    *slot = Some(directory);
                }
            }
            None => return Ok(DirectoryRef { id, children }),
        }
    }

    Err(ManifestError::structure("missing DirectoryRef node"))
}
