//! Sidecar backups for reversible mutations.
//!
//! Operations that rewrite or shadow an existing file first copy it to a
//! sidecar next to the target. Revert restores the sidecar; if no sidecar
//! exists the target did not pre-exist and revert removes it.

use crate::error::MutationError;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to the full file name of the backed-up target.
pub const BACKUP_SUFFIX: &str = ".instr-orig";

/// Sidecar path for a target file: `app.php` -> `app.php.instr-orig`.
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(BACKUP_SUFFIX);
    target.with_file_name(name)
}

/// Copy the target to its sidecar before mutating it.
pub fn stash(target: &Path) -> Result<(), MutationError> {
    let sidecar = backup_path(target);
    fs::copy(target, &sidecar).map_err(|e| MutationError::io(&sidecar, e))?;
    Ok(())
}

/// Restore the sidecar over the target, or remove the target if no sidecar
/// exists (the file was materialized by apply).
pub fn restore_or_remove(target: &Path) -> Result<(), MutationError> {
    if restore_if_stashed(target)? {
        return Ok(());
    }
    if target.exists() {
        fs::remove_file(target).map_err(|e| MutationError::io(target, e))?;
    }
    Ok(())
}

/// Restore the sidecar over the target if one exists. Returns whether a
/// sidecar was found.
pub fn restore_if_stashed(target: &Path) -> Result<bool, MutationError> {
    let sidecar = backup_path(target);
    if !sidecar.exists() {
        return Ok(false);
    }
    fs::rename(&sidecar, target).map_err(|e| MutationError::io(target, e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_appends_suffix() {
        let path = backup_path(Path::new("/tree/config/app.php"));
        assert_eq!(path, Path::new("/tree/config/app.php.instr-orig"));
    }

    #[test]
    fn test_stash_and_restore_roundtrip() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("file.php");
        fs::write(&target, "original").unwrap();

        stash(&target).unwrap();
        fs::write(&target, "mutated").unwrap();

        assert!(restore_if_stashed(&target).unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), "original");
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn test_restore_or_remove_without_sidecar_deletes() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("materialized.php");
        fs::write(&target, "new file").unwrap();

        restore_or_remove(&target).unwrap();
        assert!(!target.exists());
    }
}
