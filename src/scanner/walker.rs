//! Lazy tree scanner: walks each root in order and yields feed entries.
//!
//! Depth is always absolute (segment count from the filesystem root), so a
//! root of `/tmp/x` with one level of recursion admits `/tmp/x/a.avi` (depth 4)
//! and rejects `/tmp/x/sub/b.avi` (depth 5). `walkdir` is told to stop
//! descending at the same bound, which only saves work; the absolute check is
//! what decides.
//!
//! Every per-object failure is routed to the [`DiagnosticSink`] and the walk
//! moves on. Nothing raised inside a walk ever reaches the caller.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::vec;

use walkdir::WalkDir;

use crate::core::config::{ScanConfig, ScanOptions};
use crate::core::errors::FeedError;
use crate::core::paths::{path_depth, resolve_root};
use crate::logger::{DiagnosticSink, ScanEvent, TracingSink};
use crate::scanner::entry::{Entry, EntryKind};

/// Counters kept while a scan runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Roots taken from the config so far.
    pub roots: usize,
    /// Roots that could not be walked at all.
    pub failed_roots: usize,
    /// Filesystem objects enumerated below the roots.
    pub visited: usize,
    /// Entries handed to the caller.
    pub emitted: usize,
}

/// Traversal state for the root currently being walked.
struct RootWalk {
    max_depth: Option<usize>,
    inner: walkdir::IntoIter,
}

/// Iterator over the entries of a [`ScanConfig`], one root after another.
///
/// Dropping the scanner mid-way simply stops the scan.
pub struct TreeScanner<S: DiagnosticSink = TracingSink> {
    config: ScanConfig,
    options: ScanOptions,
    sink: S,
    pending_roots: vec::IntoIter<PathBuf>,
    current: Option<RootWalk>,
    stats: ScanStats,
    started: bool,
    finished: bool,
}

impl TreeScanner<TracingSink> {
    /// Scanner reporting through `tracing`.
    pub fn new(config: ScanConfig, options: ScanOptions) -> Self {
        Self::with_sink(config, options, TracingSink)
    }
}

impl<S: DiagnosticSink> TreeScanner<S> {
    pub fn with_sink(config: ScanConfig, options: ScanOptions, sink: S) -> Self {
        let pending_roots = config.roots.clone().into_iter();
        Self {
            config,
            options,
            sink,
            pending_roots,
            current: None,
            stats: ScanStats::default(),
            started: false,
            finished: false,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Prepare the next root, or report why it cannot be walked.
    fn open_root(&mut self, root: &Path) -> Option<RootWalk> {
        self.stats.roots += 1;
        let resolved = resolve_root(root);

        match fs::metadata(&resolved) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                self.stats.failed_roots += 1;
                self.sink.record(&ScanEvent::Suppressed(FeedError::Traversal {
                    path: resolved,
                    details: "root is not a directory".to_string(),
                }));
                return None;
            }
            Err(err) => {
                self.stats.failed_roots += 1;
                self.sink.record(&ScanEvent::Suppressed(FeedError::Traversal {
                    path: resolved,
                    details: err.to_string(),
                }));
                return None;
            }
        }

        let base_depth = path_depth(&resolved);
        let max_depth = self.config.recursion.max_depth(base_depth);
        self.sink.record(&ScanEvent::RootStarted {
            root: &resolved,
            base_depth,
            max_depth,
        });

        let mut walk = WalkDir::new(&resolved)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(limit) = self.config.recursion.walk_limit() {
            walk = walk.max_depth(limit);
        }

        Some(RootWalk {
            max_depth,
            inner: walk.into_iter(),
        })
    }
}

impl<S: DiagnosticSink> Iterator for TreeScanner<S> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            self.sink.record(&ScanEvent::ScanStarted {
                roots: self.config.roots.len(),
            });
        }

        loop {
            let Some(walk) = self.current.as_mut() else {
                let Some(root) = self.pending_roots.next() else {
                    self.finished = true;
                    self.sink.record(&ScanEvent::ScanFinished {
                        emitted: self.stats.emitted,
                        visited: self.stats.visited,
                    });
                    return None;
                };
                self.current = self.open_root(&root);
                continue;
            };

            let item = match walk.inner.next() {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Err(err)) => {
                    if err.depth() == 0 {
                        self.stats.failed_roots += 1;
                    }
                    self.sink.record(&ScanEvent::Suppressed(err.into()));
                    continue;
                }
                Some(Ok(item)) => item,
            };

            self.stats.visited += 1;
            let max_depth = walk.max_depth;
            if let Some(entry) = inspect(
                &self.config,
                self.options,
                &mut self.sink,
                max_depth,
                &item,
            ) {
                self.stats.emitted += 1;
                return Some(entry);
            }
        }
    }
}

/// Decide whether one enumerated object yields an entry.
fn inspect<S: DiagnosticSink>(
    config: &ScanConfig,
    options: ScanOptions,
    sink: &mut S,
    max_depth: Option<usize>,
    item: &walkdir::DirEntry,
) -> Option<Entry> {
    let path = item.path();

    let Some(path_str) = path.to_str() else {
        sink.record(&ScanEvent::Suppressed(FeedError::PathEncoding {
            path: path.to_path_buf(),
        }));
        return None;
    };

    if max_depth.is_some_and(|max| path_depth(path) > max) {
        return None;
    }

    sink.record(&ScanEvent::Checking { path });
    if !config.matcher.is_match(path_str) {
        return None;
    }

    let Some(kind) = classify(config, item.file_type()) else {
        sink.record(&ScanEvent::TypeMismatch { path });
        return None;
    };

    let entry = Entry::create(path, kind, |err| sink.record(&ScanEvent::Suppressed(err)))?;
    if options.test_mode {
        sink.record(&ScanEvent::EntryEmitted(&entry));
    }
    Some(entry)
}

/// Map a (non-following) file type to an entry kind the config retrieves.
///
/// A symlink never counts as a directory or a file, whatever it points at, so
/// a link to a directory is only emitted when symlinks are retrieved.
fn classify(config: &ScanConfig, file_type: fs::FileType) -> Option<EntryKind> {
    let retrieve = config.retrieve;
    if file_type.is_dir() && retrieve.dirs {
        Some(EntryKind::Directory)
    } else if file_type.is_symlink() && retrieve.symlinks {
        Some(EntryKind::Symlink)
    } else if file_type.is_file() && retrieve.files {
        Some(EntryKind::File)
    } else {
        None
    }
}

/// Run a scan to completion, collecting every entry.
pub fn scan<S: DiagnosticSink>(config: &ScanConfig, options: ScanOptions, sink: S) -> Vec<Entry> {
    TreeScanner::with_sink(config.clone(), options, sink).collect()
}
