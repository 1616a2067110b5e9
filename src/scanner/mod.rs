//! Tree scanner: name filters, entry construction, and the lazy walker.

pub mod entry;
pub mod patterns;
pub mod walker;

use crate::core::config::{RawConfig, ScanConfig, ScanOptions};
use crate::core::errors::Result;
use crate::logger::DiagnosticSink;

use self::entry::Entry;
use self::walker::TreeScanner;

/// Normalize `raw` and scan it to completion.
///
/// Only configuration errors are returned; everything that goes wrong during
/// the walk is reported to `sink` instead.
pub fn feed_entries<S: DiagnosticSink>(
    raw: RawConfig,
    options: ScanOptions,
    sink: S,
) -> Result<Vec<Entry>> {
    let config = ScanConfig::from_raw(raw)?;
    Ok(TreeScanner::with_sink(config, options, sink).collect())
}
