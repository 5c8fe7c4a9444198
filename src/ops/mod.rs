//! Instrumentation operations and their capability contract.
//!
//! Every operation is a value-equality data holder implementing
//! `check`/`apply`/`revert` over one reversible filesystem mutation.
//! `check` is a pure read of current tree state; `apply` must only run on
//! operations that checked `NotApplied`, `revert` only on `Applied`.

mod annotations;
mod backup;
mod copy;
mod diff;
mod file_override;
mod patch;

pub use annotations::AnnotationRemoval;
pub use copy::CopyFile;
pub use diff::{DiffError, Hunk, Patch, PatchLine};
pub use file_override::FileOverride;
pub use patch::PatchFile;

use crate::error::MutationError;
use async_trait::async_trait;
use futures::future::join_all;
use std::path::Path;

/// Result of an operation's `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// The mutation is currently present in the target tree.
    Applied,
    /// The mutation is absent.
    NotApplied,
}

/// Capability contract shared by all operation variants.
#[async_trait]
pub trait Instrumentation: Send + Sync {
    /// Human-readable one-line description for reports and logs.
    fn describe(&self) -> String;

    /// Pure read of current filesystem state. Never mutates.
    async fn check(&self) -> Result<CheckState, MutationError>;

    /// Perform the mutation. Only valid when `check` reported `NotApplied`.
    async fn apply(&self) -> Result<(), MutationError>;

    /// Undo the mutation. Only valid when `check` reported `Applied`.
    async fn revert(&self) -> Result<(), MutationError>;
}

/// Tagged variant over the four operation kinds, enabling exhaustive
/// handling in the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Override(FileOverride),
    Patch(PatchFile),
    Copy(CopyFile),
    AnnotationRemoval(AnnotationRemoval),
}

impl Operation {
    /// The live file this operation mutates. Used for intra-group
    /// disjointness validation.
    pub fn target_path(&self) -> &Path {
        match self {
            Operation::Override(op) => &op.target,
            Operation::Patch(op) => &op.original,
            Operation::Copy(op) => &op.dst,
            Operation::AnnotationRemoval(op) => &op.target,
        }
    }
}

#[async_trait]
impl Instrumentation for Operation {
    fn describe(&self) -> String {
        match self {
            Operation::Override(op) => op.describe(),
            Operation::Patch(op) => op.describe(),
            Operation::Copy(op) => op.describe(),
            Operation::AnnotationRemoval(op) => op.describe(),
        }
    }

    async fn check(&self) -> Result<CheckState, MutationError> {
        match self {
            Operation::Override(op) => op.check().await,
            Operation::Patch(op) => op.check().await,
            Operation::Copy(op) => op.check().await,
            Operation::AnnotationRemoval(op) => op.check().await,
        }
    }

    async fn apply(&self) -> Result<(), MutationError> {
        match self {
            Operation::Override(op) => op.apply().await,
            Operation::Patch(op) => op.apply().await,
            Operation::Copy(op) => op.apply().await,
            Operation::AnnotationRemoval(op) => op.apply().await,
        }
    }

    async fn revert(&self) -> Result<(), MutationError> {
        match self {
            Operation::Override(op) => op.revert().await,
            Operation::Patch(op) => op.revert().await,
            Operation::Copy(op) => op.revert().await,
            Operation::AnnotationRemoval(op) => op.revert().await,
        }
    }
}

/// A single operation failure recorded during a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// The failing operation's description.
    pub operation: String,
    pub error: MutationError,
}

/// Partition produced by [`check_all`].
#[derive(Debug, Default)]
pub struct CheckPartition<'a> {
    pub applied: Vec<&'a Operation>,
    pub not_applied: Vec<&'a Operation>,
    /// Operations whose `check` itself failed. They are excluded from both
    /// partitions and retried on the next run.
    pub failures: Vec<BatchFailure>,
}

/// Subset of a batch that succeeded, plus the collected failures.
#[derive(Debug, Default)]
pub struct BatchOutcome<'a> {
    pub succeeded: Vec<&'a Operation>,
    pub failures: Vec<BatchFailure>,
}

/// Check a batch of operations concurrently and partition the results.
///
/// Operations within one group target disjoint files, so the checks are
/// dispatched fan-out and joined before returning.
pub async fn check_all<'a, I>(ops: I) -> CheckPartition<'a>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let checks = join_all(
        ops.into_iter()
            .map(|op| async move { (op, op.check().await) }),
    )
    .await;

    let mut partition = CheckPartition::default();
    for (op, result) in checks {
        match result {
            Ok(CheckState::Applied) => partition.applied.push(op),
            Ok(CheckState::NotApplied) => partition.not_applied.push(op),
            Err(error) => partition.failures.push(BatchFailure {
                operation: op.describe(),
                error,
            }),
        }
    }
    partition
}

/// Apply a batch concurrently. Individual failures are collected and do not
/// abort the rest of the batch.
pub async fn apply_all<'a, I>(ops: I) -> BatchOutcome<'a>
where
    I: IntoIterator<Item = &'a Operation>,
{
    run_batch(ops, false).await
}

/// Revert a batch concurrently, with the same failure policy as [`apply_all`].
pub async fn revert_all<'a, I>(ops: I) -> BatchOutcome<'a>
where
    I: IntoIterator<Item = &'a Operation>,
{
    run_batch(ops, true).await
}

async fn run_batch<'a, I>(ops: I, reverting: bool) -> BatchOutcome<'a>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let runs = join_all(ops.into_iter().map(|op| async move {
        let result = if reverting {
            op.revert().await
        } else {
            op.apply().await
        };
        (op, result)
    }))
    .await;

    let mut outcome = BatchOutcome::default();
    for (op, result) in runs {
        match result {
            Ok(()) => outcome.succeeded.push(op),
            Err(error) => outcome.failures.push(BatchFailure {
                operation: op.describe(),
                error,
            }),
        }
    }
    outcome
}
