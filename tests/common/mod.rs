#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wixsync::manifest::{Manifest, ManifestOptions, OptionExtras, parse_manifest, render_manifest};
use wixsync::reconcile::{self, Reconciled, UpdateOptions};
use wixsync::utils::SequentialTokens;

/// A scratch directory tree to build manifests from
pub struct TestTree {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestTree {
    /// Create an empty tree rooted at `<temp>/Product`
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("Product");
        fs::create_dir_all(&root)?;
        Ok(Self { temp_dir, root })
    }

    /// Write a file relative to the root, creating directories as needed
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Delete a file relative to the root
    pub fn remove(&self, relative: &str) -> Result<()> {
        fs::remove_file(self.root.join(relative))?;
        Ok(())
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Options for a manifest of this tree with group `G`
    pub fn options(&self) -> ManifestOptions {
        ManifestOptions {
            group_name: "G".to_string(),
            directory: self.root.display().to_string(),
            ..ManifestOptions::default()
        }
    }

    /// Create a manifest with deterministic ids
    pub fn create(&self, options: ManifestOptions) -> Result<Manifest> {
        Ok(reconcile::create(options, Box::new(SequentialTokens::default()))?.manifest)
    }

    /// Update `prior` with tokens that cannot collide with the ones used by `create`
    pub fn update(&self, prior: &Manifest, run: UpdateOptions) -> Result<Reconciled> {
        Ok(reconcile::update(
            prior,
            &OptionExtras::default(),
            run,
            Box::new(SequentialTokens::new(1 << 64)),
        )?)
    }

    /// Write a manifest to `<temp>/name` and return the path
    pub fn save(&self, name: &str, manifest: &Manifest) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, render_manifest(manifest)?)?;
        Ok(path)
    }
}

/// Render then parse, as a later run would see the manifest
pub fn reload(manifest: &Manifest) -> Result<Manifest> {
    let text = render_manifest(manifest)?;
    Ok(parse_manifest(&text, Path::new("reload.wxs"))?)
}

/// File names of every component source, in document order
pub fn source_names(manifest: &Manifest) -> Vec<String> {
    manifest
        .components()
        .iter()
        .filter_map(|c| c.file.source.rsplit(['/', '\\']).next().map(str::to_string))
        .collect()
}
