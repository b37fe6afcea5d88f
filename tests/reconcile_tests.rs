mod common;

use anyhow::Result;
use common::{TestTree, reload, source_names};
use pretty_assertions::assert_eq;
use std::fs;
use wixsync::ManifestError;
use wixsync::manifest::{
    Component, Directory, DirectoryChild, Manifest, Numbering, OptionExtras,
    NEVER_INSTALL_CONDITION, PER_USER_REGISTRY_KEY, component_group, directories_of,
    render_manifest,
};
use wixsync::reconcile::{self, UpdateOptions};
use wixsync::utils::{SequenceCounters, SequentialTokens};

const PATCH: UpdateOptions = UpdateOptions {
    patch_update: true,
    create_placeholders: false,
};

const PATCH_WITH_PLACEHOLDERS: UpdateOptions = UpdateOptions {
    patch_update: true,
    create_placeholders: true,
};

fn root_directory(manifest: &Manifest) -> &Directory {
    directories_of(&manifest.directory_ref.children)
        .next()
        .expect("manifest has a root directory")
}

fn component_named<'a>(manifest: &'a Manifest, name: &str) -> &'a Component {
    manifest
        .components()
        .into_iter()
        .find(|c| c.file.source.ends_with(name))
        .unwrap_or_else(|| panic!("no component for {name}"))
}

mod identity {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unchanged_tree_is_byte_identical_modern() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("bin/app.exe", "exe")?;
        tree.write("bin/lib/core.dll", "dll")?;

        let created = tree.create(tree.options())?;
        let first = render_manifest(&created)?;

        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?;
        assert_eq!(render_manifest(&updated.manifest)?, first);
        assert!(updated.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn test_unchanged_tree_is_byte_identical_legacy() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("one.txt", "1")?;
        tree.write("sub/two.txt", "2")?;
        tree.write("sub/deeper/three.txt", "3")?;

        let mut options = tree.options();
        options.numbering = Numbering::Sequential(SequenceCounters {
            next_directory: 0,
            next_component: 0,
            increment: 100,
        });
        let created = tree.create(options)?;
        let first = render_manifest(&created)?;
        assert!(first.contains("<NextComponentNumber>"));

        let updated = tree.update(&reload(&created)?, PATCH)?;
        assert_eq!(render_manifest(&updated.manifest)?, first);
        Ok(())
    }

    #[test]
    fn test_new_file_adds_exactly_one_component() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("sub/b.txt", "b")?;
        let created = tree.create(tree.options())?;

        tree.write("sub/c.txt", "c")?;
        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?.manifest;

        let before = created.components();
        let after = updated.components();
        assert_eq!(after.len(), before.len() + 1);
        for component in &before {
            let kept = after
                .iter()
                .find(|c| c.id == component.id)
                .expect("existing component kept");
            assert_eq!(kept.guid, component.guid);
            assert_eq!(kept.file.id, component.file.id);
        }
        assert_eq!(source_names(&updated), vec!["a.txt", "b.txt", "c.txt"]);
        Ok(())
    }

    #[test]
    fn test_new_directory_on_update() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        let created = tree.create(tree.options())?;

        tree.write("plugins/p.dll", "p")?;
        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?.manifest;

        let root = root_directory(&updated);
        assert_eq!(root.id, root_directory(&created).id);
        let plugins = directories_of(&root.children).next().expect("plugins");
        assert_eq!(plugins.name, "plugins");
        assert_eq!(component_named(&updated, "p.dll").file.checksum.as_deref(), Some("yes"));
        Ok(())
    }

    #[test]
    fn test_deleted_directory_disappears() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("old/x.txt", "x")?;
        let created = tree.create(tree.options())?;

        fs::remove_dir_all(tree.path("old"))?;
        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?.manifest;
        assert_eq!(directories_of(&root_directory(&updated).children).count(), 0);
        assert_eq!(source_names(&updated), vec!["a.txt"]);
        Ok(())
    }

    #[test]
    fn test_directory_attributes_carried_forward() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        let mut prior = reload(&tree.create(tree.options())?)?;
        let Some(DirectoryChild::Directory(root)) = prior.directory_ref.children.first_mut() else {
            panic!("expected root directory");
        };
        root.attributes.push(("FileSource".to_string(), "custom".to_string()));

        let updated = tree.update(&prior, UpdateOptions::default())?.manifest;
        assert_eq!(
            root_directory(&updated).attributes,
            vec![("FileSource".to_string(), "custom".to_string())]
        );
        Ok(())
    }
}

mod removal {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_removal_without_patch_tracking_drops_entry() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("b.txt", "b")?;
        let created = tree.create(tree.options())?;

        tree.remove("a.txt")?;
        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?.manifest;
        assert_eq!(source_names(&updated), vec!["b.txt"]);
        Ok(())
    }

    #[test]
    fn test_removed_entry_moves_to_end_of_directory() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("b.txt", "b")?;
        tree.write("c.txt", "c")?;
        tree.write("sub/d.txt", "d")?;
        let created = tree.create(tree.options())?;

        tree.remove("a.txt")?;
        let updated = tree.update(&reload(&created)?, PATCH)?;
        let manifest = updated.manifest;

        let root = root_directory(&manifest);
        let names: Vec<&str> = root
            .components()
            .map(|c| c.file.source.rsplit('/').next().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["b.txt", "c.txt", "a.txt"]);

        let removed = component_named(&manifest, "a.txt");
        assert!(removed.is_transitive());
        assert_eq!(removed.condition.as_deref(), Some(NEVER_INSTALL_CONDITION));
        assert_eq!(removed.id, component_named(&created, "a.txt").id);
        assert!(updated.placeholders.is_empty());
        assert!(!tree.path("a.txt").exists());
        Ok(())
    }

    #[test]
    fn test_scenario_delete_and_recreate_placeholder() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("b.txt", "b")?;
        let created = tree.create(tree.options())?;

        tree.remove("b.txt")?;
        let updated = tree.update(&reload(&created)?, PATCH_WITH_PLACEHOLDERS)?;

        assert_eq!(source_names(&updated.manifest), vec!["a.txt", "b.txt"]);
        let b = component_named(&updated.manifest, "b.txt");
        assert!(b.is_transitive());
        assert_eq!(b.condition.as_deref(), Some(NEVER_INSTALL_CONDITION));
        assert!(!component_named(&updated.manifest, "a.txt").is_transitive());

        assert_eq!(updated.placeholders, vec![tree.path("b.txt")]);
        assert_eq!(fs::metadata(tree.path("b.txt"))?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_repeated_patch_updates_keep_a_single_record() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("b.txt", "b")?;
        let created = tree.create(tree.options())?;

        tree.remove("b.txt")?;
        let first = tree.update(&reload(&created)?, PATCH_WITH_PLACEHOLDERS)?;
        let first_text = render_manifest(&first.manifest)?;

        // b.txt is now a zero-byte placeholder on disk.
        let second = tree.update(&reload(&first.manifest)?, PATCH_WITH_PLACEHOLDERS)?;
        assert!(second.placeholders.is_empty());
        assert_eq!(render_manifest(&second.manifest)?, first_text);
        assert_eq!(second.manifest.components().len(), 2);
        Ok(())
    }

    #[test]
    fn test_placeholder_never_overwrites_existing_file() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        let mut prior = reload(&tree.create(tree.options())?)?;

        // A record whose source lies outside the walked tree but exists on disk.
        let outside = tree.temp_dir.path().join("outside.txt");
        fs::write(&outside, "precious")?;
        let Some(DirectoryChild::Directory(root)) = prior.directory_ref.children.first_mut() else {
            panic!("expected root directory");
        };
        let mut stray = root.components().next().cloned().expect("component");
        stray.id = "comp_stray".to_string();
        stray.file.source = outside.display().to_string();
        root.children.push(DirectoryChild::Component(stray));

        let updated = tree.update(&prior, PATCH_WITH_PLACEHOLDERS)?;
        assert!(updated.placeholders.is_empty());
        assert_eq!(fs::read_to_string(&outside)?, "precious");
        assert!(component_named(&updated.manifest, "outside.txt").is_transitive());
        Ok(())
    }

    #[test]
    fn test_restored_file_with_content_is_a_conflict() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("b.txt", "b")?;
        let created = tree.create(tree.options())?;

        tree.remove("b.txt")?;
        let removed = tree.update(&reload(&created)?, PATCH_WITH_PLACEHOLDERS)?.manifest;
        tree.write("b.txt", "real content again")?;

        let err = reconcile::update(
            &reload(&removed)?,
            &OptionExtras::default(),
            PATCH,
            Box::new(SequentialTokens::default()),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::RestoredRemovedFile { .. }));
        Ok(())
    }

    #[test]
    fn test_directory_with_all_files_removed_keeps_records() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("sub/x.txt", "x")?;
        let created = tree.create(tree.options())?;

        tree.remove("sub/x.txt")?;
        let updated = tree.update(&reload(&created)?, PATCH)?.manifest;
        let sub = directories_of(&root_directory(&updated).children)
            .next()
            .expect("sub kept");
        let records: Vec<&Component> = sub.components().collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_transitive());
        Ok(())
    }

    #[test]
    fn test_purging_history_drops_records() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write("b.txt", "b")?;
        let created = tree.create(tree.options())?;

        tree.remove("b.txt")?;
        let tracked = tree.update(&reload(&created)?, PATCH_WITH_PLACEHOLDERS)?.manifest;
        tree.remove("b.txt")?;

        let purged = tree.update(&reload(&tracked)?, UpdateOptions::default())?.manifest;
        assert_eq!(source_names(&purged), vec!["a.txt"]);
        Ok(())
    }
}

mod options {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_excluded_extensions_in_create_and_update() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("app.exe", "x")?;
        tree.write("app.pdb", "symbols")?;
        tree.write("notes.TMP", "scratch")?;

        let mut options = tree.options();
        options.extension_excludes = vec![".PDB".to_string()];
        let created = tree.create(options)?;
        assert_eq!(source_names(&created), vec!["app.exe", "notes.TMP"]);

        tree.write("more.pdb", "symbols")?;
        let extras = OptionExtras {
            extension_excludes: vec!["tmp".to_string()],
            ..OptionExtras::default()
        };
        let updated = reconcile::update(
            &reload(&created)?,
            &extras,
            UpdateOptions::default(),
            Box::new(SequentialTokens::new(1000)),
        )?
        .manifest;

        assert_eq!(source_names(&updated), vec!["app.exe"]);
        assert_eq!(updated.options.extension_excludes, vec![".PDB", ".TMP"]);
        Ok(())
    }

    #[test]
    fn test_alias_and_component_attributes() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("bin/tool.exe", "x")?;

        let mut options = tree.options();
        options.alias = Some("$(var.Src)".to_string());
        options.win64 = Some("$(var.Win64)".to_string());
        options.disk_id = 2;
        options.permanent = true;
        let created = tree.create(options)?;

        let tool = component_named(&created, "tool.exe");
        assert_eq!(tool.file.source, "$(var.Src)/bin/tool.exe");
        assert_eq!(tool.disk_id.as_deref(), Some("2"));
        assert_eq!(tool.win64.as_deref(), Some("$(var.Win64)"));
        assert_eq!(tool.permanent.as_deref(), Some("yes"));
        assert_eq!(tool.file.key_path.as_deref(), Some("yes"));
        assert_eq!(tool.file.checksum.as_deref(), Some("yes"));
        Ok(())
    }

    #[test]
    fn test_per_user_components_use_registry_key_path() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;

        let mut options = tree.options();
        options.per_user = true;
        let created = tree.create(options)?;

        let component = component_named(&created, "a.txt");
        assert!(component.file.key_path.is_none());
        let value = component.registry_value.as_ref().expect("registry value");
        assert_eq!(value.root, "HKCU");
        assert_eq!(value.key, PER_USER_REGISTRY_KEY);
        assert_eq!(value.key_path.as_deref(), Some("yes"));

        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?;
        assert!(updated.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn test_component_key_path_migrates_to_file() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        let mut prior = reload(&tree.create(tree.options())?)?;

        let Some(DirectoryChild::Directory(root)) = prior.directory_ref.children.first_mut() else {
            panic!("expected root directory");
        };
        let Some(DirectoryChild::Component(component)) = root.children.first_mut() else {
            panic!("expected component");
        };
        component.key_path = Some("yes".to_string());
        component.file.key_path = None;

        let updated = tree.update(&prior, UpdateOptions::default())?;
        assert_eq!(updated.warnings.len(), 2);
        assert!(updated.warnings[0].contains("Adding KeyPath"));
        let migrated = component_named(&updated.manifest, "a.txt");
        assert_eq!(migrated.file.key_path.as_deref(), Some("yes"));
        assert!(migrated.key_path.is_none());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_packaged() -> Result<()> {
        let tree = TestTree::new()?;
        let target = tree.write("real/a.txt", "a")?;
        std::os::unix::fs::symlink(&target, tree.path("link.txt"))?;

        let created = tree.create(tree.options())?;
        assert_eq!(source_names(&created), vec!["link.txt", "a.txt"]);

        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?.manifest;
        assert_eq!(render_manifest(&updated)?, render_manifest(&created)?);
        Ok(())
    }

    #[test]
    fn test_reused_component_keeps_attribute_values() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        let mut prior = tree.create(tree.options())?;

        let Some(DirectoryChild::Directory(root)) = prior.directory_ref.children.first_mut() else {
            panic!("expected root directory");
        };
        let Some(DirectoryChild::Component(component)) = root.children.first_mut() else {
            panic!("expected component");
        };
        component.transitive = Some("no".to_string());
        component.permanent = Some("no".to_string());
        component.file.key_path = Some("no".to_string());
        let prior = reload(&prior)?;

        let updated = tree.update(&prior, UpdateOptions::default())?;
        assert!(updated.warnings.is_empty());
        let text = render_manifest(&updated.manifest)?;
        assert!(text.contains("Transitive=\"no\""));
        assert!(text.contains("Permanent=\"no\""));
        assert!(text.contains("KeyPath=\"no\""));
        assert_eq!(text, render_manifest(&prior)?);
        Ok(())
    }

    #[test]
    fn test_injection_file_content_is_spliced() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("a.txt", "a")?;
        tree.write(
            "service.ParaffinMold",
            r#"<Wix><Fragment><DirectoryRef Id="INSTALLDIR">
                 <Component Id="svc_config" Guid="*"><RegistryKey Root="HKLM" Key="Software\Svc"/></Component>
               </DirectoryRef></Fragment></Wix>"#,
        )?;

        let created = tree.create(tree.options())?;
        let root = root_directory(&created);
        assert!(matches!(
            root.children.last(),
            Some(DirectoryChild::Injected(element)) if element.attribute("Id") == Some("svc_config")
        ));
        assert_eq!(source_names(&created), vec!["a.txt"]);

        let group = component_group(&created).expect("group");
        assert!(group.elements().any(|r| r.attribute("Id") == Some("svc_config")));

        let updated = tree.update(&reload(&created)?, UpdateOptions::default())?.manifest;
        assert_eq!(render_manifest(&updated)?, render_manifest(&created)?);
        Ok(())
    }

    #[test]
    fn test_invalid_injection_file_fails() -> Result<()> {
        let tree = TestTree::new()?;
        tree.write("broken.ParaffinMold", "<Wix><Fragment/></Wix>")?;
        let err = reconcile::create(tree.options(), Box::new(SequentialTokens::default()))
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidInjectionFile { .. }));
        Ok(())
    }
}
