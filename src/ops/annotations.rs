//! Annotation-marker removal from a live file.

use super::backup;
use super::{CheckState, Instrumentation};
use crate::error::MutationError;
use async_trait::async_trait;
use regex::Regex;
use std::fs;
use std::path::PathBuf;

/// Strips every occurrence of an annotation pattern from a file.
///
/// The pre-rewrite content is stashed in a sidecar so revert can restore it.
/// A file that never contained the pattern checks as Applied without a
/// sidecar; revert is then a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRemoval {
    pub target: PathBuf,
    /// Regex matching the annotation markers to strip.
    pub pattern: String,
}

impl AnnotationRemoval {
    fn regex(&self) -> Result<Regex, MutationError> {
        Regex::new(&self.pattern).map_err(|e| MutationError::InvalidPattern {
            pattern: self.pattern.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Instrumentation for AnnotationRemoval {
    fn describe(&self) -> String {
        format!(
            "strip annotations {:?} from {}",
            self.pattern,
            self.target.display()
        )
    }

    async fn check(&self) -> Result<CheckState, MutationError> {
        let regex = self.regex()?;
        if !self.target.exists() {
            // The target may be materialized by an earlier copy group.
            return Ok(CheckState::NotApplied);
        }
        let content =
            fs::read_to_string(&self.target).map_err(|e| MutationError::io(&self.target, e))?;
        if regex.is_match(&content) {
            Ok(CheckState::NotApplied)
        } else {
            Ok(CheckState::Applied)
        }
    }

    async fn apply(&self) -> Result<(), MutationError> {
        let regex = self.regex()?;
        if !self.target.exists() {
            return Err(MutationError::TargetMissing(self.target.clone()));
        }
        let content =
            fs::read_to_string(&self.target).map_err(|e| MutationError::io(&self.target, e))?;

        backup::stash(&self.target)?;
        let stripped = regex.replace_all(&content, "");
        fs::write(&self.target, stripped.as_bytes())
            .map_err(|e| MutationError::io(&self.target, e))
    }

    async fn revert(&self) -> Result<(), MutationError> {
        backup::restore_if_stashed(&self.target)?;
        Ok(())
    }
}
