#![forbid(unsafe_code)]

//! Filesystem feed: turn one or more directory trees into a sequence of feed
//! entries, one per matching file, directory, or symbolic link.
//!
//! Two stages run in sequence:
//! 1. **Config normalization** turns a bare path, a list of paths, or an
//!    options object into a [`ScanConfig`](core::config::ScanConfig).
//! 2. **Tree scanning** walks each root lazily, filtering by absolute depth,
//!    name pattern, and object type.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use filesystem_feed::prelude::*;
//!
//! let raw = RawConfig::from_json_str(r#"{"path": "~/videos", "mask": "*.mkv", "recursion": true}"#)?;
//! let config = ScanConfig::from_raw(raw)?;
//! for entry in TreeScanner::new(config, ScanOptions::default()) {
//!     println!("{} -> {}", entry.title, entry.url);
//! }
//! # Ok::<(), FeedError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod scanner;
