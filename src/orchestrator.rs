//! Instrumentation orchestration.
//!
//! Drives check/apply/revert over the four operation groups. Cross-group
//! order is load-bearing: copies may materialize files that the annotation
//! group targets, and declared overrides establish a baseline before
//! structural patches run. Revert walks the exact mirror of the apply
//! sequence. Within one group, operations target disjoint files and are
//! dispatched concurrently, with a hard barrier before the next group.

use crate::error::InstrumentError;
use crate::ops::{apply_all, check_all, revert_all, BatchFailure};
use crate::resolver;
use crate::set::{GroupKind, InstrumentationSet};
use crate::settings::InstrumentationSettings;
use crate::target::TargetContext;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Group sequence for `apply`.
pub const APPLY_ORDER: [GroupKind; 4] = [
    GroupKind::Overrides,
    GroupKind::Patches,
    GroupKind::Copies,
    GroupKind::AnnotationRemovals,
];

/// Group sequence for `revert`: the exact mirror of [`APPLY_ORDER`].
pub const REVERT_ORDER: [GroupKind; 4] = [
    GroupKind::AnnotationRemovals,
    GroupKind::Overrides,
    GroupKind::Patches,
    GroupKind::Copies,
];

/// Newly-changed count for one group in an apply/revert run.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub group: GroupKind,
    /// Operations newly applied (or reverted) by this run.
    pub changed: usize,
}

/// One collected per-operation failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub group: GroupKind,
    pub operation: String,
    pub error: String,
}

/// Summary of one apply or revert invocation.
///
/// Counts are reported for all four groups even on partial failure, so a
/// caller can distinguish fully applied, partially applied, and unapplied.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentationReport {
    pub groups: Vec<GroupReport>,
    pub failures: Vec<FailureRecord>,
    /// Discovered resources rejected during resolution (path traversal).
    pub rejected_resources: Vec<String>,
}

impl InstrumentationReport {
    /// Newly-changed count for one group.
    pub fn changed(&self, kind: GroupKind) -> usize {
        self.groups
            .iter()
            .find(|g| g.group == kind)
            .map(|g| g.changed)
            .unwrap_or(0)
    }

    /// Total newly-changed operations across all groups.
    pub fn total_changed(&self) -> usize {
        self.groups.iter().map(|g| g.changed).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rejected_resources.is_empty()
    }
}

/// Applied/unapplied counts for one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStatus {
    pub group: GroupKind,
    pub applied: usize,
    pub unapplied: usize,
}

/// Read-only status summary across all groups.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub groups: Vec<GroupStatus>,
    pub failures: Vec<FailureRecord>,
}

impl StatusReport {
    pub fn status(&self, kind: GroupKind) -> (usize, usize) {
        self.groups
            .iter()
            .find(|g| g.group == kind)
            .map(|g| (g.applied, g.unapplied))
            .unwrap_or((0, 0))
    }
}

/// Orchestrates instrumentation over one resolved target tree.
pub struct Instrumentator {
    context: TargetContext,
    settings: InstrumentationSettings,
}

impl Instrumentator {
    /// Build from an already-resolved context and loaded settings.
    pub fn new(context: TargetContext, settings: InstrumentationSettings) -> Self {
        Instrumentator { context, settings }
    }

    /// Detect the target layout from a webroot and load settings from disk.
    pub fn from_webroot(webroot: &Path, settings_path: &Path) -> Result<Self, InstrumentError> {
        let context = TargetContext::detect(webroot)?;
        let settings = InstrumentationSettings::load(settings_path)?;
        Ok(Instrumentator::new(context, settings))
    }

    pub fn context(&self) -> &TargetContext {
        &self.context
    }

    /// Assemble the four groups from declared settings plus version-scoped
    /// discovery. Rejected resources are carried into the run report.
    fn build_set(&self) -> Result<(InstrumentationSet, Vec<String>), InstrumentError> {
        let app_dir = &self.context.app_dir;

        let (discovered_patches, rejected_patches) =
            resolver::discovered_patches(&self.settings.patch_dir, &self.context);
        let (discovered_copies, rejected_copies) =
            resolver::discovered_copies(&self.settings.patch_dir, &self.context);

        let rejected: Vec<String> = rejected_patches
            .iter()
            .chain(rejected_copies.iter())
            .map(|e| e.to_string())
            .collect();
        for rejection in &rejected {
            warn!(%rejection, "rejected discovered resource");
        }

        let set = InstrumentationSet::build(
            self.settings.declared_overrides(app_dir)?,
            self.settings.declared_patches(app_dir),
            discovered_patches,
            self.settings.declared_copies(app_dir),
            discovered_copies,
            self.settings.declared_annotation_removals(app_dir),
        )
        .map_err(InstrumentError::from)?;

        Ok((set, rejected))
    }

    /// Apply all missing instrumentations, group by group in
    /// [`APPLY_ORDER`]. Safe to call repeatedly: a second call reports zero
    /// newly-applied operations.
    pub async fn apply(&self) -> Result<InstrumentationReport, InstrumentError> {
        let (set, rejected_resources) = self.build_set()?;
        let mut report = InstrumentationReport {
            groups: Vec::new(),
            failures: Vec::new(),
            rejected_resources,
        };

        for kind in APPLY_ORDER {
            let partition = check_all(set.group(kind)).await;
            record_failures(&mut report.failures, kind, partition.failures);

            let outcome = apply_all(partition.not_applied).await;
            info!(
                group = %kind,
                newly_applied = outcome.succeeded.len(),
                already_applied = partition.applied.len(),
                "apply pass"
            );
            record_failures(&mut report.failures, kind, outcome.failures);
            report.groups.push(GroupReport {
                group: kind,
                changed: outcome.succeeded.len(),
            });
        }

        Ok(report)
    }

    /// Revert all applied instrumentations, group by group in
    /// [`REVERT_ORDER`]. Safe to call after a prior revert (reports zero).
    pub async fn revert(&self) -> Result<InstrumentationReport, InstrumentError> {
        let (set, rejected_resources) = self.build_set()?;
        let mut report = InstrumentationReport {
            groups: Vec::new(),
            failures: Vec::new(),
            rejected_resources,
        };

        for kind in REVERT_ORDER {
            let partition = check_all(set.group(kind)).await;
            record_failures(&mut report.failures, kind, partition.failures);

            let outcome = revert_all(partition.applied).await;
            info!(
                group = %kind,
                newly_reverted = outcome.succeeded.len(),
                "revert pass"
            );
            record_failures(&mut report.failures, kind, outcome.failures);
            report.groups.push(GroupReport {
                group: kind,
                changed: outcome.succeeded.len(),
            });
        }

        Ok(report)
    }

    /// Report applied/unapplied counts per group without mutating anything.
    pub async fn status(&self) -> Result<StatusReport, InstrumentError> {
        let (set, _) = self.build_set()?;
        let mut report = StatusReport {
            groups: Vec::new(),
            failures: Vec::new(),
        };

        for kind in GroupKind::ALL {
            let partition = check_all(set.group(kind)).await;
            report.groups.push(GroupStatus {
                group: kind,
                applied: partition.applied.len(),
                unapplied: partition.not_applied.len(),
            });
            record_failures(&mut report.failures, kind, partition.failures);
        }

        Ok(report)
    }
}

fn record_failures(
    records: &mut Vec<FailureRecord>,
    group: GroupKind,
    failures: Vec<BatchFailure>,
) {
    for failure in failures {
        warn!(
            group = %group,
            operation = %failure.operation,
            error = %failure.error,
            "operation failed"
        );
        records.push(FailureRecord {
            group,
            operation: failure.operation,
            error: failure.error.to_string(),
        });
    }
}
