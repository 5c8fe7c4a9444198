//! Instrumentation settings.
//!
//! A TOML file declares the base resource directory plus project-specific
//! operations that are registered ahead of version-wide discovery.
//!
//! ```toml
//! patch_dir = "/opt/cakeinstr/resources"
//!
//! [[overrides]]
//! target = "config/bootstrap.php"
//! content_file = "/opt/cakeinstr/overrides/bootstrap.php"
//!
//! [[copies]]
//! src = "/opt/cakeinstr/stubs/fuzz_entry.php"
//! dst = "webroot/fuzz_entry.php"
//!
//! [[annotation_removals]]
//! target = "src/Model/Table/PostsTable.php"
//! pattern = '#\[Immutable\]\n'
//! ```

use crate::error::ConfigurationError;
use crate::ops::{AnnotationRemoval, CopyFile, FileOverride, Operation, PatchFile};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Declared file override: inline content or a file to read it from.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OverrideSpec {
    pub target: PathBuf,
    pub content: Option<String>,
    pub content_file: Option<PathBuf>,
}

/// Declared patch.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PatchSpec {
    pub patch: PathBuf,
    pub original: PathBuf,
}

/// Declared copy.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CopySpec {
    pub src: PathBuf,
    pub dst: PathBuf,
}

/// Declared annotation removal.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AnnotationSpec {
    pub target: PathBuf,
    pub pattern: String,
}

/// Typed settings consumed by the orchestrator.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct InstrumentationSettings {
    /// Base directory for version-scoped patch/copy discovery.
    #[serde(default)]
    pub patch_dir: PathBuf,

    #[serde(default)]
    pub overrides: Vec<OverrideSpec>,

    #[serde(default)]
    pub patches: Vec<PatchSpec>,

    #[serde(default)]
    pub copies: Vec<CopySpec>,

    #[serde(default)]
    pub annotation_removals: Vec<AnnotationSpec>,
}

impl InstrumentationSettings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigurationError::SettingsUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigurationError::SettingsInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Declared override operations. Relative targets resolve against
    /// `app_dir`; `content_file` sources are read at build time.
    pub fn declared_overrides(&self, app_dir: &Path) -> Result<Vec<Operation>, ConfigurationError> {
        self.overrides
            .iter()
            .map(|spec| {
                let content = match (&spec.content, &spec.content_file) {
                    (Some(inline), None) => inline.clone(),
                    (None, Some(file)) => fs::read_to_string(file).map_err(|e| {
                        ConfigurationError::SettingsUnreadable {
                            path: file.clone(),
                            reason: e.to_string(),
                        }
                    })?,
                    _ => {
                        return Err(ConfigurationError::AmbiguousOverrideContent {
                            target: spec.target.clone(),
                        })
                    }
                };
                Ok(Operation::Override(FileOverride {
                    target: resolve_against(app_dir, &spec.target),
                    content,
                }))
            })
            .collect()
    }

    /// Declared patch operations.
    pub fn declared_patches(&self, app_dir: &Path) -> Vec<Operation> {
        self.patches
            .iter()
            .map(|spec| {
                Operation::Patch(PatchFile {
                    patch: spec.patch.clone(),
                    original: resolve_against(app_dir, &spec.original),
                })
            })
            .collect()
    }

    /// Declared copy operations.
    pub fn declared_copies(&self, app_dir: &Path) -> Vec<Operation> {
        self.copies
            .iter()
            .map(|spec| {
                Operation::Copy(CopyFile {
                    src: spec.src.clone(),
                    dst: resolve_against(app_dir, &spec.dst),
                })
            })
            .collect()
    }

    /// Declared annotation removal operations.
    pub fn declared_annotation_removals(&self, app_dir: &Path) -> Vec<Operation> {
        self.annotation_removals
            .iter()
            .map(|spec| {
                Operation::AnnotationRemoval(AnnotationRemoval {
                    target: resolve_against(app_dir, &spec.target),
                    pattern: spec.pattern.clone(),
                })
            })
            .collect()
    }
}

/// Relative declared paths address the application tree; absolute paths are
/// taken as-is.
fn resolve_against(app_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        app_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_full_settings() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("instrumentation.toml");
        fs::write(
            &file,
            r#"
patch_dir = "/res"

[[overrides]]
target = "config/bootstrap.php"
content = "<?php // instrumented"

[[patches]]
patch = "/res/app.php.patch"
original = "config/app.php"

[[copies]]
src = "/res/stub.php"
dst = "webroot/stub.php"

[[annotation_removals]]
target = "src/Model/Post.php"
pattern = '@immutable'
"#,
        )
        .unwrap();

        let settings = InstrumentationSettings::load(&file).unwrap();
        assert_eq!(settings.patch_dir, PathBuf::from("/res"));
        assert_eq!(settings.overrides.len(), 1);
        assert_eq!(settings.patches.len(), 1);
        assert_eq!(settings.copies.len(), 1);
        assert_eq!(settings.annotation_removals.len(), 1);

        let app_dir = Path::new("/live/app");
        let overrides = settings.declared_overrides(app_dir).unwrap();
        assert_eq!(
            overrides[0].target_path(),
            Path::new("/live/app/config/bootstrap.php")
        );
        let copies = settings.declared_copies(app_dir);
        assert_eq!(copies[0].target_path(), Path::new("/live/app/webroot/stub.php"));
    }

    #[test]
    fn test_empty_settings_default_to_no_operations() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("instrumentation.toml");
        fs::write(&file, "patch_dir = \"/res\"\n").unwrap();

        let settings = InstrumentationSettings::load(&file).unwrap();
        assert!(settings.overrides.is_empty());
        assert!(settings.patches.is_empty());
        assert!(settings.copies.is_empty());
        assert!(settings.annotation_removals.is_empty());
    }

    #[test]
    fn test_override_content_file_is_read() {
        let temp = TempDir::new().unwrap();
        let content_file = temp.path().join("bootstrap.php");
        fs::write(&content_file, "<?php // from file").unwrap();

        let settings = InstrumentationSettings {
            overrides: vec![OverrideSpec {
                target: PathBuf::from("config/bootstrap.php"),
                content: None,
                content_file: Some(content_file),
            }],
            ..Default::default()
        };

        let ops = settings.declared_overrides(Path::new("/app")).unwrap();
        match &ops[0] {
            Operation::Override(o) => assert_eq!(o.content, "<?php // from file"),
            other => panic!("expected override, got {other:?}"),
        }
    }

    #[test]
    fn test_override_requires_exactly_one_content_source() {
        let settings = InstrumentationSettings {
            overrides: vec![OverrideSpec {
                target: PathBuf::from("x.php"),
                content: None,
                content_file: None,
            }],
            ..Default::default()
        };
        assert!(matches!(
            settings.declared_overrides(Path::new("/app")),
            Err(ConfigurationError::AmbiguousOverrideContent { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("broken.toml");
        fs::write(&file, "patch_dir = [not toml").unwrap();

        assert!(matches!(
            InstrumentationSettings::load(&file),
            Err(ConfigurationError::SettingsInvalid { .. })
        ));
    }
}
