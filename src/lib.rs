//! Render/update latency benchmark for a reactive component list.
//!
//! The interesting part is [`tracker`]: every component registers its
//! per-cycle completion through [`tracker::MonitorUpdate`], and
//! [`tracker::QuiescenceTracker::settle`] waits until a whole update cascade
//! has played out. [`bench::BenchmarkDriver`] uses that signal to bracket
//! the `render`, `update` and `update-reflect` measurements.
//!
//! Notes for hosts:
//!  - Everything runs on one thread. Drive the benchmark from a
//!    current-thread Tokio runtime inside a `tokio::task::LocalSet`; the
//!    update scheduler spawns its flushes with `spawn_local`.
//!  - Runtime types are built on `Rc`/`RefCell` and are not `Send`.

use thiserror::Error;

pub mod bench;
pub mod component;
pub mod core;
pub mod fixtures;
pub mod tracker;

pub use bench::{BenchConfig, BenchmarkDriver, Phase, PhaseFilter, PhaseRun};
pub use component::{ComponentError, UpdateError};
pub use crate::core::dom::DocumentError;
pub use crate::core::timing::{PerformanceEntry, TimingError};
pub use tracker::{CompletionRegistry, QuiescenceTracker, SettleReport};

#[derive(Error, Debug, Clone)]
pub enum BenchError {
    #[error("Update error: {0}")]
    Update(#[from] UpdateError),
    #[error("Component error: {0}")]
    Component(#[from] ComponentError),
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("Timing error: {0}")]
    Timing(#[from] TimingError),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;

/// Formats a measure the way the report prints it: `name: 12.345ms`.
pub fn format_measure(entry: &PerformanceEntry) -> String {
    format!("{}: {:.3}ms", entry.name, entry.duration)
}
