//! Feed entries: one record per qualifying filesystem object.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{FeedError, Result};

/// How a qualifying object was classified.
///
/// Directories and symlinks are both "directory-style": their title keeps the
/// extension. Only files have it stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "dir",
            Self::Symlink => "symlink",
        }
    }
}

/// A structured record describing one matched filesystem object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path to the object.
    pub location: PathBuf,
    /// `file://` URI for `location`.
    pub url: String,
    /// Base name including extension.
    pub filename: String,
    /// Base name without extension for files, full base name otherwise.
    pub title: String,
    /// Last modification time, absent when it could not be read.
    pub timestamp: Option<DateTime<Utc>>,
    pub kind: EntryKind,
}

impl Entry {
    /// Build an entry for `path`.
    ///
    /// An unreadable timestamp is reported through `report` and left empty.
    /// An entry that fails [`Entry::validate`] is reported and dropped.
    pub fn create(path: &Path, kind: EntryKind, mut report: impl FnMut(FeedError)) -> Option<Self> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = match kind {
            EntryKind::File => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            EntryKind::Directory | EntryKind::Symlink => filename.clone(),
        };
        let url = Url::from_file_path(path)
            .map(String::from)
            .unwrap_or_default();

        let timestamp = match modified_time(path) {
            Ok(ts) => Some(ts),
            Err(err) => {
                report(err);
                None
            }
        };

        let entry = Self {
            location: path.to_path_buf(),
            url,
            filename,
            title,
            timestamp,
            kind,
        };

        match entry.validate() {
            Ok(()) => Some(entry),
            Err(err) => {
                report(err);
                None
            }
        }
    }

    /// An entry is well-formed only when location, url, and title are all set.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("location", self.location.as_os_str().is_empty()),
            ("url", self.url.is_empty()),
            ("title", self.title.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FeedError::InvalidEntry {
                details: format!(
                    "{} missing {}",
                    self.location.display(),
                    missing.join(", ")
                ),
            })
        }
    }

    /// JSON form used for line-oriented output.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| FeedError::Serialization {
            context: "entry",
            details: e.to_string(),
        })
    }
}

/// Target mtime (symlinks are followed, so a dangling link has none).
fn modified_time(path: &Path) -> Result<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .map_err(|err| FeedError::MetadataRead {
            path: path.to_path_buf(),
            details: err.to_string(),
        })
}
