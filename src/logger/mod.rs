//! Scan diagnostics: structured events routed to pluggable sinks.
//!
//! The walker never logs directly. It hands every notable step to a
//! [`DiagnosticSink`]; the CLI wires that to `tracing` (and optionally a JSONL
//! file), tests wire it to a [`MemorySink`].

#![allow(missing_docs)]

pub mod jsonl;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::FeedError;
use crate::scanner::entry::Entry;

pub use self::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry};

/// `tracing` target used for every scan event.
pub const SCAN_TARGET: &str = "fsfeed::scan";

/// Severity level for scan events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

/// One step of a scan, as seen by the diagnostics channel.
#[derive(Debug)]
pub enum ScanEvent<'a> {
    ScanStarted {
        roots: usize,
    },
    RootStarted {
        root: &'a Path,
        base_depth: usize,
        max_depth: Option<usize>,
    },
    Checking {
        path: &'a Path,
    },
    /// Matched the filter but is not a retrieved object type.
    TypeMismatch {
        path: &'a Path,
    },
    /// Key fields of a produced entry; only sent in test mode.
    EntryEmitted(&'a Entry),
    /// A per-object (or per-root) failure that was skipped over.
    Suppressed(FeedError),
    ScanFinished {
        emitted: usize,
        visited: usize,
    },
}

impl ScanEvent<'_> {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::ScanStarted { .. } => EventType::ScanStart,
            Self::RootStarted { .. } => EventType::RootStart,
            Self::Checking { .. } => EventType::ObjectCheck,
            Self::TypeMismatch { .. } => EventType::TypeMismatch,
            Self::EntryEmitted(_) => EventType::TestEntry,
            Self::Suppressed(err) => match err {
                FeedError::PathEncoding { .. } => EventType::PathEncoding,
                FeedError::MetadataRead { .. } => EventType::MetadataRead,
                FeedError::InvalidEntry { .. } => EventType::InvalidEntry,
                _ => EventType::Traversal,
            },
            Self::ScanFinished { .. } => EventType::ScanComplete,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Checking { .. } => Severity::Trace,
            Self::RootStarted { .. } | Self::TypeMismatch { .. } => Severity::Debug,
            Self::ScanStarted { .. } | Self::EntryEmitted(_) | Self::ScanFinished { .. } => {
                Severity::Info
            }
            Self::Suppressed(
                FeedError::PathEncoding { .. } | FeedError::InvalidEntry { .. },
            ) => Severity::Error,
            Self::Suppressed(_) => Severity::Warning,
        }
    }

    /// Filesystem path the event is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::RootStarted { root, .. } => Some(*root),
            Self::Checking { path } | Self::TypeMismatch { path } => Some(*path),
            Self::EntryEmitted(entry) => Some(entry.location.as_path()),
            Self::Suppressed(err) => err.path(),
            Self::ScanStarted { .. } | Self::ScanFinished { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Suppressed(err) => Some(err.code()),
            _ => None,
        }
    }
}

/// Receiver for scan events.
pub trait DiagnosticSink {
    fn record(&mut self, event: &ScanEvent<'_>);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn record(&mut self, event: &ScanEvent<'_>) {
        (**self).record(event);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Box<S> {
    fn record(&mut self, event: &ScanEvent<'_>) {
        (**self).record(event);
    }
}

impl<S: DiagnosticSink> DiagnosticSink for Option<S> {
    fn record(&mut self, event: &ScanEvent<'_>) {
        if let Some(sink) = self {
            sink.record(event);
        }
    }
}

/// Fan out to two sinks, first `A` then `B`.
impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for (A, B) {
    fn record(&mut self, event: &ScanEvent<'_>) {
        self.0.record(event);
        self.1.record(event);
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&mut self, _event: &ScanEvent<'_>) {}
}

/// Forwards events to `tracing` under [`SCAN_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&mut self, event: &ScanEvent<'_>) {
        match event {
            ScanEvent::ScanStarted { roots } => {
                tracing::info!(target: SCAN_TARGET, roots, "starting filesystem scan");
            }
            ScanEvent::RootStarted {
                root,
                base_depth,
                max_depth,
            } => {
                tracing::debug!(
                    target: SCAN_TARGET,
                    root = %root.display(),
                    base_depth,
                    max_depth = ?max_depth,
                    "walking root"
                );
            }
            ScanEvent::Checking { path } => {
                tracing::trace!(target: SCAN_TARGET, path = %path.display(), "checking");
            }
            ScanEvent::TypeMismatch { path } => {
                tracing::debug!(
                    target: SCAN_TARGET,
                    path = %path.display(),
                    "object type not retrieved"
                );
            }
            ScanEvent::EntryEmitted(entry) => {
                tracing::info!(
                    target: SCAN_TARGET,
                    title = %entry.title,
                    url = %entry.url,
                    filename = %entry.filename,
                    location = %entry.location.display(),
                    timestamp = ?entry.timestamp,
                    "test mode entry"
                );
            }
            ScanEvent::Suppressed(err) => {
                if event.severity() == Severity::Error {
                    tracing::error!(target: SCAN_TARGET, code = err.code(), "{err}");
                } else {
                    tracing::warn!(target: SCAN_TARGET, code = err.code(), "{err}");
                }
            }
            ScanEvent::ScanFinished { emitted, visited } => {
                tracing::info!(target: SCAN_TARGET, emitted, visited, "scan finished");
            }
        }
    }
}

/// Collects events as [`LogEntry`] records for later inspection.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<LogEntry>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogEntry] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LogEntry> {
        self.records
    }

    /// Number of recorded events of the given type.
    pub fn count(&self, event: EventType) -> usize {
        self.records.iter().filter(|r| r.event == event).count()
    }

    /// Error codes of all suppressed failures, in order.
    pub fn error_codes(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|r| r.error_code.as_deref())
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&mut self, event: &ScanEvent<'_>) {
        self.records.push(LogEntry::from_event(event));
    }
}
