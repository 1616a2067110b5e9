//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use filesystem_feed::prelude::*;
//! ```

// Core
pub use crate::core::config::{
    RawConfig, RawOptions, Recursion, RetrievalOption, RetrieveSet, ScanConfig, ScanOptions,
};
pub use crate::core::errors::{FeedError, Result};

// Diagnostics
pub use crate::logger::{DiagnosticSink, MemorySink, NullSink, ScanEvent, Severity, TracingSink};

// Scanner
pub use crate::scanner::entry::{Entry, EntryKind};
pub use crate::scanner::feed_entries;
pub use crate::scanner::patterns::PathMatcher;
pub use crate::scanner::walker::{ScanStats, TreeScanner};
