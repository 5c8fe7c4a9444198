//! Instrumentation set: the four ordered operation groups.

use crate::error::ConfigurationError;
use crate::ops::Operation;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// The four operation groups, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupKind {
    Overrides,
    Patches,
    Copies,
    AnnotationRemovals,
}

impl GroupKind {
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Overrides,
        GroupKind::Patches,
        GroupKind::Copies,
        GroupKind::AnnotationRemovals,
    ];
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupKind::Overrides => "overrides",
            GroupKind::Patches => "patches",
            GroupKind::Copies => "copies",
            GroupKind::AnnotationRemovals => "annotation_removals",
        };
        write!(f, "{name}")
    }
}

/// The assembled operation groups consumed by the orchestrator.
///
/// Declared operations come first in the patch and copy groups, followed by
/// version-discovered ones. Operations within one group must target disjoint
/// files; concurrent dispatch inside a group relies on it.
#[derive(Debug)]
pub struct InstrumentationSet {
    overrides: Vec<Operation>,
    patches: Vec<Operation>,
    copies: Vec<Operation>,
    annotation_removals: Vec<Operation>,
}

impl InstrumentationSet {
    /// Assemble the four groups, validating intra-group disjointness.
    pub fn build(
        overrides: Vec<Operation>,
        declared_patches: Vec<Operation>,
        discovered_patches: Vec<Operation>,
        declared_copies: Vec<Operation>,
        discovered_copies: Vec<Operation>,
        annotation_removals: Vec<Operation>,
    ) -> Result<Self, ConfigurationError> {
        let mut patches = declared_patches;
        patches.extend(discovered_patches);

        let mut copies = declared_copies;
        copies.extend(discovered_copies);

        let set = InstrumentationSet {
            overrides,
            patches,
            copies,
            annotation_removals,
        };

        for kind in GroupKind::ALL {
            ensure_disjoint(kind, set.group(kind))?;
        }

        Ok(set)
    }

    /// Operations in one group, in registration order.
    pub fn group(&self, kind: GroupKind) -> &[Operation] {
        match kind {
            GroupKind::Overrides => &self.overrides,
            GroupKind::Patches => &self.patches,
            GroupKind::Copies => &self.copies,
            GroupKind::AnnotationRemovals => &self.annotation_removals,
        }
    }

    /// Total number of operations across all groups.
    pub fn len(&self) -> usize {
        GroupKind::ALL.iter().map(|k| self.group(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Duplicate target paths inside one group are a configuration error, not
/// something the runtime arbitrates.
fn ensure_disjoint(kind: GroupKind, ops: &[Operation]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for op in ops {
        if !seen.insert(op.target_path()) {
            return Err(ConfigurationError::DuplicateTarget {
                group: kind.to_string(),
                path: op.target_path().to_path_buf(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{CopyFile, FileOverride, PatchFile};
    use std::path::PathBuf;

    fn override_op(target: &str) -> Operation {
        Operation::Override(FileOverride {
            target: PathBuf::from(target),
            content: String::new(),
        })
    }

    #[test]
    fn test_declared_operations_precede_discovered() {
        let declared = Operation::Patch(PatchFile {
            patch: PathBuf::from("/settings/a.php.patch"),
            original: PathBuf::from("/live/a.php"),
        });
        let discovered = Operation::Patch(PatchFile {
            patch: PathBuf::from("/res/cakephp/4/APP_DIR/b.php.patch"),
            original: PathBuf::from("/live/b.php"),
        });

        let set = InstrumentationSet::build(
            vec![],
            vec![declared.clone()],
            vec![discovered.clone()],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();

        assert_eq!(set.group(GroupKind::Patches), &[declared, discovered]);
    }

    #[test]
    fn test_duplicate_target_in_group_is_rejected() {
        let result = InstrumentationSet::build(
            vec![override_op("/live/app.php"), override_op("/live/app.php")],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::DuplicateTarget { ref group, .. }) if group == "overrides"
        ));
    }

    #[test]
    fn test_same_target_across_groups_is_allowed() {
        // A copy may materialize a file that a later annotation removal
        // targets; disjointness is an intra-group invariant only.
        let copy = Operation::Copy(CopyFile {
            src: PathBuf::from("/res/stub.php"),
            dst: PathBuf::from("/live/stub.php"),
        });
        let annotation = Operation::AnnotationRemoval(crate::ops::AnnotationRemoval {
            target: PathBuf::from("/live/stub.php"),
            pattern: "@marker".to_string(),
        });

        let set = InstrumentationSet::build(
            vec![],
            vec![],
            vec![],
            vec![copy],
            vec![],
            vec![annotation],
        )
        .unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_set() {
        let set =
            InstrumentationSet::build(vec![], vec![], vec![], vec![], vec![], vec![]).unwrap();
        assert!(set.is_empty());
        for kind in GroupKind::ALL {
            assert!(set.group(kind).is_empty());
        }
    }
}
