// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Filtering paths by source extension and `ignore` glob patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`) behind the
//!   `FileWatchSource` capability.
//! - Classifying raw notifications into per-file events, including an
//!   initial scan that reports every pre-existing file.
//! - Debouncing bursts of changes per path.
//!
//! It does **not** know about compilation; it only turns filesystem changes
//! into file-level events.

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod service;
pub mod watcher;

pub use debounce::Debouncer;
pub use patterns::{collect_matching_files, WatchFilter};
pub use service::{WatchEvent, WatchService};
pub use watcher::{FileWatchSource, NotifyWatchSource, RawFsEvent};
