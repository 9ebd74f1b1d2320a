//! Update-completion tracking.
//!
//! Components push "my current update has finished" futures into a
//! [`CompletionRegistry`]; [`QuiescenceTracker::settle`] drains and awaits it
//! round after round until an update cascade has fully played out.

pub mod monitor;

pub use monitor::MonitorUpdate;

use crate::component::UpdateError;
use futures::future::{try_join_all, LocalBoxFuture};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// One component's outstanding update.
pub type PendingCompletion = LocalBoxFuture<'static, Result<(), UpdateError>>;

/// Append-only list of outstanding completions, swapped out wholesale by each
/// drain round.
#[derive(Clone, Default)]
pub struct CompletionRegistry {
    pending: Rc<RefCell<Vec<PendingCompletion>>>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, completion: PendingCompletion) {
        self.pending.borrow_mut().push(completion);
    }

    /// Takes everything registered so far and installs an empty list, so
    /// registrations made while the taken batch is awaited land in the next
    /// round.
    pub fn take(&self) -> Vec<PendingCompletion> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl std::fmt::Debug for CompletionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

/// What a [`QuiescenceTracker::settle`] call had to wait for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleReport {
    /// Drain rounds that awaited at least one completion.
    pub rounds: usize,
    /// Completions awaited across all rounds.
    pub completions: usize,
}

#[derive(Debug, Clone, Default)]
pub struct QuiescenceTracker {
    registry: CompletionRegistry,
}

impl QuiescenceTracker {
    pub fn new(registry: CompletionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CompletionRegistry {
        &self.registry
    }

    pub fn pending(&self) -> usize {
        self.registry.len()
    }

    /// Resolves once every registered completion, and every completion
    /// registered while those were awaited, has resolved.
    ///
    /// Stops only after a round that found the registry empty and still found
    /// it empty after yielding one scheduler turn, so updates that were
    /// scheduled but not yet applied get the chance to register first. The
    /// first failed completion aborts the wait and is returned.
    pub async fn settle(&self) -> Result<SettleReport, UpdateError> {
        let mut report = SettleReport::default();
        loop {
            let batch = self.registry.take();
            if batch.is_empty() {
                tokio::task::yield_now().await;
                if self.registry.is_empty() {
                    break;
                }
                continue;
            }
            report.rounds += 1;
            report.completions += batch.len();
            trace!("drain round {} awaiting {} completions", report.rounds, batch.len());
            try_join_all(batch).await?;
        }
        debug!(
            "settled after {} rounds, {} completions",
            report.rounds, report.completions
        );
        Ok(report)
    }
}
