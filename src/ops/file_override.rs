//! Full-content file override.

use super::backup;
use super::{CheckState, Instrumentation};
use crate::error::MutationError;
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

/// Replaces a file's full contents. The previous content is stashed in a
/// sidecar so revert restores it byte-identically; if the target did not
/// pre-exist, revert removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOverride {
    pub target: PathBuf,
    pub content: String,
}

#[async_trait]
impl Instrumentation for FileOverride {
    fn describe(&self) -> String {
        format!("override {}", self.target.display())
    }

    async fn check(&self) -> Result<CheckState, MutationError> {
        if !self.target.exists() {
            return Ok(CheckState::NotApplied);
        }
        let current =
            fs::read_to_string(&self.target).map_err(|e| MutationError::io(&self.target, e))?;
        if current == self.content {
            Ok(CheckState::Applied)
        } else {
            Ok(CheckState::NotApplied)
        }
    }

    async fn apply(&self) -> Result<(), MutationError> {
        if self.target.exists() {
            backup::stash(&self.target)?;
        } else if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).map_err(|e| MutationError::io(parent, e))?;
        }
        fs::write(&self.target, &self.content).map_err(|e| MutationError::io(&self.target, e))
    }

    async fn revert(&self) -> Result<(), MutationError> {
        backup::restore_or_remove(&self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn op(target: PathBuf) -> FileOverride {
        FileOverride {
            target,
            content: "<?php // instrumented bootstrap\n".to_string(),
        }
    }

    #[tokio::test]
    async fn test_override_existing_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("bootstrap.php");
        fs::write(&target, "<?php // original\n").unwrap();

        let op = op(target.clone());
        assert_eq!(op.check().await.unwrap(), CheckState::NotApplied);

        op.apply().await.unwrap();
        assert_eq!(op.check().await.unwrap(), CheckState::Applied);
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "<?php // instrumented bootstrap\n"
        );

        op.revert().await.unwrap();
        assert_eq!(op.check().await.unwrap(), CheckState::NotApplied);
        assert_eq!(fs::read_to_string(&target).unwrap(), "<?php // original\n");
    }

    #[tokio::test]
    async fn test_override_creates_missing_file_and_revert_removes_it() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("conf").join("bootstrap.php");

        let op = op(target.clone());
        op.apply().await.unwrap();
        assert!(target.exists());

        op.revert().await.unwrap();
        assert!(!target.exists());
    }
}
