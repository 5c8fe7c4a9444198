//! Target context: resolved filesystem roots and detected framework version.
//!
//! Built once at orchestration start and immutable thereafter. Mutation
//! operations never read the context directly; they receive concrete paths
//! from the resolver.

use crate::error::DetectionError;
use std::fs;
use std::path::{Path, PathBuf};

/// The three live filesystem roots plus the detected framework major version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetContext {
    /// Application code root (controllers, models, config).
    pub app_dir: PathBuf,
    /// Framework installation root (the CakePHP core itself).
    pub framework_dir: PathBuf,
    /// Project-local webroot served by the HTTP server.
    pub webroot_dir: PathBuf,
    /// Major version parsed from the framework's dotted version string.
    pub framework_major_version: u32,
}

impl TargetContext {
    /// Build a context from known roots and a dotted version string.
    ///
    /// Validates that all three roots exist and are pairwise distinct.
    pub fn new(
        app_dir: PathBuf,
        framework_dir: PathBuf,
        webroot_dir: PathBuf,
        version: &str,
    ) -> Result<Self, DetectionError> {
        for root in [&app_dir, &framework_dir, &webroot_dir] {
            if !root.is_dir() {
                return Err(DetectionError::MissingRoot(root.clone()));
            }
        }

        let roots = [&app_dir, &framework_dir, &webroot_dir];
        for i in 0..roots.len() {
            for j in (i + 1)..roots.len() {
                if roots[i] == roots[j] {
                    return Err(DetectionError::OverlappingRoots(roots[i].clone()));
                }
            }
        }

        Ok(TargetContext {
            framework_major_version: parse_major_version(version)?,
            app_dir,
            framework_dir,
            webroot_dir,
        })
    }

    /// Detect the application layout starting from a webroot directory.
    ///
    /// Supports the two layouts CakePHP has shipped:
    /// - Cake 3+ app skeleton: `<app>/webroot`, framework under
    ///   `<app>/vendor/cakephp/cakephp`
    /// - Cake 2: `<root>/app/webroot`, framework under `<root>/lib/Cake`
    ///
    /// The version string is read from the framework's `VERSION.txt`.
    pub fn detect(webroot_dir: &Path) -> Result<Self, DetectionError> {
        let webroot_dir = dunce::canonicalize(webroot_dir)
            .map_err(|_| DetectionError::WebrootNotFound(webroot_dir.to_path_buf()))?;

        let app_dir = webroot_dir
            .parent()
            .ok_or_else(|| DetectionError::FrameworkNotFound(webroot_dir.clone()))?
            .to_path_buf();

        let framework_dir = locate_framework_dir(&app_dir)
            .ok_or_else(|| DetectionError::FrameworkNotFound(app_dir.clone()))?;

        let version = read_framework_version(&framework_dir)?;

        TargetContext::new(app_dir, framework_dir, webroot_dir, &version)
    }
}

/// Probe the known framework locations relative to the application dir.
fn locate_framework_dir(app_dir: &Path) -> Option<PathBuf> {
    let mut candidates = vec![app_dir.join("vendor").join("cakephp").join("cakephp")];
    if let Some(root) = app_dir.parent() {
        candidates.push(root.join("lib").join("Cake"));
        candidates.push(root.join("vendor").join("cakephp").join("cakephp"));
    }

    candidates.into_iter().find(|c| c.is_dir())
}

/// Read the dotted version string from `VERSION.txt` under the framework dir.
///
/// The file carries a comment banner; the version is the last non-empty,
/// non-comment line.
fn read_framework_version(framework_dir: &Path) -> Result<String, DetectionError> {
    let version_file = framework_dir.join("VERSION.txt");
    let text = fs::read_to_string(&version_file).map_err(|e| DetectionError::VersionUnreadable {
        path: version_file.clone(),
        reason: e.to_string(),
    })?;

    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("//") && !l.starts_with('#'))
        .last()
        .map(str::to_string)
        .ok_or(DetectionError::VersionUnreadable {
            path: version_file,
            reason: "no version line found".to_string(),
        })
}

/// Parse the major version: text before the first `.`, as a positive integer.
fn parse_major_version(version: &str) -> Result<u32, DetectionError> {
    let major = version.split('.').next().unwrap_or("").trim();
    match major.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(DetectionError::InvalidVersion(version.to_string())),
    }
}
