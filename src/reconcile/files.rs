use super::Session;
use super::patch::is_pending_removal;
use crate::error::{ManifestError, Result};
use crate::manifest::{
    Component, DirectoryChild, FileEntry, RegistryValue, components_of, needs_checksum, yes,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

impl Session {
    /// Components for every file of a directory that has no prior counterpart.
    pub(super) fn create_files(&mut self, files: &[PathBuf]) -> Result<Vec<DirectoryChild>> {
        let components = files
            .iter()
            .map(|file| self.new_component(file).map(DirectoryChild::Component))
            .collect::<Result<Vec<_>>>()?;

        if !components.is_empty() {
            self.ids.finish_new_directory();
        }
        Ok(components)
    }

    /// Match the files on disk against the components of a prior directory.
    ///
    /// Preserved components keep their prior position relative to new ones
    /// as dictated by disk order. Removed-file records are appended last.
    pub(super) fn reconcile_files(
        &mut self,
        prior: &[DirectoryChild],
        files: &[PathBuf],
    ) -> Result<Vec<DirectoryChild>> {
        let prior_components: Vec<&Component> = components_of(prior).collect();
        let mut matched = vec![false; prior_components.len()];
        let mut output = Vec::with_capacity(files.len());

        for file in files {
            let source = self.alias.to_source(file)?;
            let wanted = source.to_lowercase();
            let hits: Vec<usize> = prior_components
                .iter()
                .enumerate()
                .filter(|(_, c)| c.file.source.to_lowercase() == wanted)
                .map(|(index, _)| index)
                .collect();

            let index = match hits.as_slice() {
                [] => {
                    info!(source = %source, "Adding new file");
                    output.push(DirectoryChild::Component(self.new_component(file)?));
                    continue;
                }
                [index] => *index,
                _ => return Err(ManifestError::DuplicateEntry { name: source }),
            };

            let prior = prior_components[index];
            if is_pending_removal(self.run, prior, file)? {
                debug!(source = %source, "Removed file still a placeholder");
                continue;
            }

            matched[index] = true;
            let mut component = prior.clone();
            self.migrate_key_path(&mut component, file);
            output.push(DirectoryChild::Component(component));
        }

        if self.run.patch_update {
            let removed = prior_components
                .iter()
                .zip(&matched)
                .filter(|(_, was_matched)| !**was_matched)
                .map(|(component, _)| *component);
            self.track_removed(removed, &mut output);
        }
        Ok(output)
    }

    /// Allocate a fresh component for `file`.
    fn new_component(&mut self, file: &Path) -> Result<Component> {
        let source = self.alias.to_source(file)?;
        let id = self.ids.component_id();
        let guid = self.ids.guid();
        let file_id = self.ids.file_id();
        let registry_value = if self.options.per_user {
            Some(RegistryValue::per_user(self.ids.file_id()))
        } else {
            None
        };

        Ok(Component {
            id,
            guid,
            disk_id: (self.options.disk_id > 1).then(|| self.options.disk_id.to_string()),
            permanent: yes(self.options.permanent),
            win64: self.options.win64.clone(),
            registry_value,
            file: FileEntry {
                id: file_id,
                checksum: yes(needs_checksum(&source)),
                key_path: yes(!self.options.per_user),
                source,
                ..FileEntry::default()
            },
            ..Component::default()
        })
    }

    /// Move a legacy component-level `KeyPath` onto the file.
    ///
    /// A File that already has a `KeyPath` attribute keeps its value.
    fn migrate_key_path(&mut self, component: &mut Component, file: &Path) {
        if !self.options.per_user && component.file.key_path.is_none() {
            component.file.key_path = yes(true);
            self.warnings.push(format!(
                "Adding KeyPath to File element for {}",
                file.display()
            ));
        }
        if component.key_path.take().is_some() {
            self.warnings.push(format!(
                "Removed KeyPath from Component {}",
                component.id
            ));
        }
    }
}
