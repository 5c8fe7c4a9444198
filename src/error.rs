//! Error types for the instrumentation engine.

use std::path::PathBuf;
use thiserror::Error;

/// Framework detection failed. Fatal: no operation can be resolved
/// without a target context.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Webroot directory not found: {0}")]
    WebrootNotFound(PathBuf),

    #[error("Could not locate CakePHP installation relative to {0}")]
    FrameworkNotFound(PathBuf),

    #[error("Could not read framework version from {path}: {reason}")]
    VersionUnreadable { path: PathBuf, reason: String },

    #[error("Invalid framework version string: {0:?}")]
    InvalidVersion(String),

    #[error("Target roots must be distinct directories: {0} appears twice")]
    OverlappingRoots(PathBuf),

    #[error("Target root does not exist: {0}")]
    MissingRoot(PathBuf),
}

/// A discovered resource resolved outside its intended target root.
/// Rejects the individual operation, not the whole resolver run.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Resource path {0} escapes its target root (traversal segment)")]
    EscapesRoot(PathBuf),

    #[error("Resource path {0} is not relative")]
    NotRelative(PathBuf),

    #[error("Failed to walk resource directory {path}: {reason}")]
    WalkFailed { path: PathBuf, reason: String },
}

/// An individual apply/revert/check failed. Recorded per-operation;
/// never aborts the batch or subsequent groups.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Patch context mismatch in {file} (hunk {hunk})")]
    PatchContextMismatch { file: PathBuf, hunk: usize },

    #[error("Malformed patch file {file}: {reason}")]
    MalformedPatch { file: PathBuf, reason: String },

    #[error("Copy source missing: {0}")]
    CopySourceMissing(PathBuf),

    #[error("Target file missing: {0}")]
    TargetMissing(PathBuf),

    #[error("Invalid annotation pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MutationError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MutationError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Settings or instrumentation-set construction errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Duplicate target path in {group} group: {path}")]
    DuplicateTarget { group: String, path: PathBuf },

    #[error("Failed to read settings file {path}: {reason}")]
    SettingsUnreadable { path: PathBuf, reason: String },

    #[error("Invalid settings file {path}: {reason}")]
    SettingsInvalid { path: PathBuf, reason: String },

    #[error("Override {target} must declare exactly one of `content` or `content_file`")]
    AmbiguousOverrideContent { target: PathBuf },

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),
}

/// Umbrella error for orchestration entry points.
#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("Detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Mutation failed: {0}")]
    Mutation(#[from] MutationError),
}
