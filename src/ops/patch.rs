//! Unified-diff patch operation over a live file.

use super::diff::{DiffError, Patch};
use super::{CheckState, Instrumentation};
use crate::error::MutationError;
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

/// Applies the unified diff in `patch` to `original`.
///
/// `check` decides Applied iff the reverse patch applies cleanly in memory
/// and NotApplied iff the forward patch does; a file matching neither
/// pre-image is reported NotApplied so the context mismatch surfaces as a
/// `MutationError` on the next apply attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub patch: PathBuf,
    pub original: PathBuf,
}

impl PatchFile {
    fn load_patch(&self) -> Result<Patch, MutationError> {
        let text = fs::read_to_string(&self.patch).map_err(|e| MutationError::io(&self.patch, e))?;
        Patch::parse(&text).map_err(|e| MutationError::MalformedPatch {
            file: self.patch.clone(),
            reason: e.to_string(),
        })
    }

    fn read_original(&self) -> Result<String, MutationError> {
        if !self.original.exists() {
            return Err(MutationError::TargetMissing(self.original.clone()));
        }
        fs::read_to_string(&self.original).map_err(|e| MutationError::io(&self.original, e))
    }

    fn mismatch(&self, err: DiffError) -> MutationError {
        match err {
            DiffError::ContextMismatch { hunk } => MutationError::PatchContextMismatch {
                file: self.original.clone(),
                hunk,
            },
            other => MutationError::MalformedPatch {
                file: self.patch.clone(),
                reason: other.to_string(),
            },
        }
    }
}

#[async_trait]
impl Instrumentation for PatchFile {
    fn describe(&self) -> String {
        format!(
            "patch {} with {}",
            self.original.display(),
            self.patch.display()
        )
    }

    async fn check(&self) -> Result<CheckState, MutationError> {
        let patch = self.load_patch()?;
        if !self.original.exists() {
            return Ok(CheckState::NotApplied);
        }
        let content =
            fs::read_to_string(&self.original).map_err(|e| MutationError::io(&self.original, e))?;

        // Reverse-applies cleanly: the patched state is present.
        if patch.invert().apply(&content).is_ok() {
            return Ok(CheckState::Applied);
        }
        Ok(CheckState::NotApplied)
    }

    async fn apply(&self) -> Result<(), MutationError> {
        let patch = self.load_patch()?;
        let content = self.read_original()?;
        let patched = patch.apply(&content).map_err(|e| self.mismatch(e))?;
        fs::write(&self.original, patched).map_err(|e| MutationError::io(&self.original, e))
    }

    async fn revert(&self) -> Result<(), MutationError> {
        let patch = self.load_patch()?;
        let content = self.read_original()?;
        let restored = patch
            .invert()
            .apply(&content)
            .map_err(|e| self.mismatch(e))?;
        fs::write(&self.original, restored).map_err(|e| MutationError::io(&self.original, e))
    }
}
