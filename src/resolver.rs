//! Version-scoped resource discovery.
//!
//! Instrumentation resources live under a directory convention keyed by
//! framework major version:
//!
//! ```text
//! <patch_dir>/cakephp/<major>/APP_DIR/**        -> application dir
//! <patch_dir>/cakephp/<major>/CAKEPHP_PATH/**   -> framework dir
//! <patch_dir>/cakephp/<major>/WEBROOT/**        -> webroot dir
//! ```
//!
//! `*.patch` files map to patch operations against the live file obtained by
//! stripping the suffix; `*.php` files map to copy operations with the
//! relative path kept as-is. A missing version directory yields empty groups:
//! an uninstrumented version is valid, not an error.

use crate::error::ResolutionError;
use crate::ops::{CopyFile, Operation, PatchFile};
use crate::target::TargetContext;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Suffix marking a unified-diff resource.
pub const PATCH_SUFFIX: &str = "patch";

/// Suffix of framework script files, used for copy resources.
pub const SCRIPT_SUFFIX: &str = "php";

/// The three logical roots a resource subtree can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    App,
    Framework,
    Webroot,
}

impl RootKind {
    pub const ALL: [RootKind; 3] = [RootKind::App, RootKind::Framework, RootKind::Webroot];

    /// Name of the resource subtree for this root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            RootKind::App => "APP_DIR",
            RootKind::Framework => "CAKEPHP_PATH",
            RootKind::Webroot => "WEBROOT",
        }
    }

    /// The live target root this kind resolves against.
    pub fn live_root<'a>(&self, ctx: &'a TargetContext) -> &'a Path {
        match self {
            RootKind::App => &ctx.app_dir,
            RootKind::Framework => &ctx.framework_dir,
            RootKind::Webroot => &ctx.webroot_dir,
        }
    }
}

/// The version-scoped resource directory for a framework major version.
pub fn version_dir(patch_dir: &Path, major_version: u32) -> PathBuf {
    patch_dir.join("cakephp").join(major_version.to_string())
}

/// Discover resource files with the given suffix under one root subtree,
/// returned as paths relative to that subtree, sorted for determinism.
///
/// A missing subtree yields an empty list.
pub fn discover(root_subtree: &Path, suffix: &str) -> Result<Vec<PathBuf>, ResolutionError> {
    if !root_subtree.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root_subtree).follow_links(false) {
        let entry = entry.map_err(|e| ResolutionError::WalkFailed {
            path: root_subtree.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some(suffix) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root_subtree)
            .map_err(|e| ResolutionError::WalkFailed {
                path: root_subtree.to_path_buf(),
                reason: e.to_string(),
            })?
            .to_path_buf();
        found.push(relative);
    }

    found.sort();
    Ok(found)
}

/// Resolve a discovered relative path against the live root for its kind.
///
/// Fails closed on traversal segments or non-relative input so a crafted
/// resource tree can never address files outside the target roots.
pub fn resolve_target(
    relative: &Path,
    kind: RootKind,
    ctx: &TargetContext,
    strip_suffix: bool,
) -> Result<PathBuf, ResolutionError> {
    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ResolutionError::EscapesRoot(relative.to_path_buf()))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ResolutionError::NotRelative(relative.to_path_buf()))
            }
        }
    }

    let mut target = relative.to_path_buf();
    if strip_suffix {
        // `controller.php.patch` -> `controller.php`
        target = target.with_extension("");
    }

    Ok(kind.live_root(ctx).join(target))
}

/// Discovered patch operations for the context's framework version.
///
/// Individual resolution failures reject only the affected resource; they
/// are returned alongside the operations for the run summary.
pub fn discovered_patches(
    patch_dir: &Path,
    ctx: &TargetContext,
) -> (Vec<Operation>, Vec<ResolutionError>) {
    discover_operations(patch_dir, ctx, PATCH_SUFFIX, |resource, live| {
        Operation::Patch(PatchFile {
            patch: resource,
            original: live,
        })
    })
}

/// Discovered copy operations for the context's framework version.
pub fn discovered_copies(
    patch_dir: &Path,
    ctx: &TargetContext,
) -> (Vec<Operation>, Vec<ResolutionError>) {
    discover_operations(patch_dir, ctx, SCRIPT_SUFFIX, |resource, live| {
        Operation::Copy(CopyFile {
            src: resource,
            dst: live,
        })
    })
}

fn discover_operations(
    patch_dir: &Path,
    ctx: &TargetContext,
    suffix: &str,
    build: impl Fn(PathBuf, PathBuf) -> Operation,
) -> (Vec<Operation>, Vec<ResolutionError>) {
    let version_dir = version_dir(patch_dir, ctx.framework_major_version);
    let strip = suffix == PATCH_SUFFIX;

    let mut operations = Vec::new();
    let mut rejected = Vec::new();

    for kind in RootKind::ALL {
        let subtree = version_dir.join(kind.dir_name());
        let relatives = match discover(&subtree, suffix) {
            Ok(r) => r,
            Err(e) => {
                rejected.push(e);
                continue;
            }
        };

        for relative in relatives {
            match resolve_target(&relative, kind, ctx, strip) {
                Ok(live) => operations.push(build(subtree.join(&relative), live)),
                Err(e) => rejected.push(e),
            }
        }
    }

    (operations, rejected)
}
