//! File materialization from a resource into the live tree.

use super::backup;
use super::{CheckState, Instrumentation};
use crate::error::MutationError;
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

/// Materializes `dst` from `src`. A pre-existing destination is stashed in a
/// sidecar before being shadowed; revert removes the destination and
/// restores the sidecar if one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFile {
    pub src: PathBuf,
    pub dst: PathBuf,
}

#[async_trait]
impl Instrumentation for CopyFile {
    fn describe(&self) -> String {
        format!("copy {} -> {}", self.src.display(), self.dst.display())
    }

    async fn check(&self) -> Result<CheckState, MutationError> {
        if !self.src.exists() {
            return Err(MutationError::CopySourceMissing(self.src.clone()));
        }
        if !self.dst.exists() {
            return Ok(CheckState::NotApplied);
        }
        let src = fs::read(&self.src).map_err(|e| MutationError::io(&self.src, e))?;
        let dst = fs::read(&self.dst).map_err(|e| MutationError::io(&self.dst, e))?;
        if src == dst {
            Ok(CheckState::Applied)
        } else {
            Ok(CheckState::NotApplied)
        }
    }

    async fn apply(&self) -> Result<(), MutationError> {
        if !self.src.exists() {
            return Err(MutationError::CopySourceMissing(self.src.clone()));
        }
        if self.dst.exists() {
            backup::stash(&self.dst)?;
        } else if let Some(parent) = self.dst.parent() {
            fs::create_dir_all(parent).map_err(|e| MutationError::io(parent, e))?;
        }
        fs::copy(&self.src, &self.dst).map_err(|e| MutationError::io(&self.dst, e))?;
        Ok(())
    }

    async fn revert(&self) -> Result<(), MutationError> {
        backup::restore_or_remove(&self.dst)
    }
}
