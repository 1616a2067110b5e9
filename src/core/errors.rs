//! FSF-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Top-level error type for filesystem feed scanning.
///
/// Codes in the `FSF-1xxx` range are configuration failures and stop a scan
/// before it starts. `FSF-2xxx` errors are raised per object during a walk and
/// are only ever reported, never propagated out of the scanner.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("[FSF-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FSF-1002] invalid pattern {pattern:?}: {details}")]
    InvalidPattern { pattern: String, details: String },

    #[error("[FSF-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FSF-1004] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FSF-2001] path not decodable with filesystem encoding: {path}")]
    PathEncoding { path: PathBuf },

    #[error("[FSF-2002] cannot read metadata for {path}: {details}")]
    MetadataRead { path: PathBuf, details: String },

    #[error("[FSF-2003] invalid entry dropped: {details}")]
    InvalidEntry { details: String },

    #[error("[FSF-2004] traversal failure at {path}: {details}")]
    Traversal { path: PathBuf, details: String },

    #[error("[FSF-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FSF-3002] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },
}

impl FeedError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FSF-1001",
            Self::InvalidPattern { .. } => "FSF-1002",
            Self::ConfigParse { .. } => "FSF-1003",
            Self::MissingConfig { .. } => "FSF-1004",
            Self::PathEncoding { .. } => "FSF-2001",
            Self::MetadataRead { .. } => "FSF-2002",
            Self::InvalidEntry { .. } => "FSF-2003",
            Self::Traversal { .. } => "FSF-2004",
            Self::Io { .. } => "FSF-3001",
            Self::Serialization { .. } => "FSF-3002",
        }
    }

    /// Whether the error aborts the whole scan.
    ///
    /// Per-object failures are local: the offending object is skipped (or
    /// emitted without the unreadable field) and the walk continues.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::PathEncoding { .. }
                | Self::MetadataRead { .. }
                | Self::InvalidEntry { .. }
                | Self::Traversal { .. }
        )
    }

    /// Path the error refers to, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::MissingConfig { path }
            | Self::PathEncoding { path }
            | Self::MetadataRead { path, .. }
            | Self::Traversal { path, .. }
            | Self::Io { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::ConfigParse {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FeedError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<walkdir::Error> for FeedError {
    fn from(value: walkdir::Error) -> Self {
        let path = value.path().map(Path::to_path_buf).unwrap_or_default();
        Self::Traversal {
            path,
            details: value.to_string(),
        }
    }
}
