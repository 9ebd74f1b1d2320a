use super::Element;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::trace;

/// Deferred update queue.
///
/// The first element enqueued after a flush spawns a local task that drains
/// the queue; elements enqueued while draining (children scheduled by a
/// parent's render) are applied by that same flush. Requires a
/// `tokio::task::LocalSet`.
#[derive(Clone, Default)]
pub struct UpdateScheduler {
    inner: Rc<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    queue: RefCell<VecDeque<Element>>,
    flush_scheduled: Cell<bool>,
    flushes: Cell<u64>,
    applied: Cell<u64>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&self, element: Element) {
        self.inner.queue.borrow_mut().push_back(element);
        if !self.inner.flush_scheduled.replace(true) {
            let scheduler = self.clone();
            tokio::task::spawn_local(async move {
                scheduler.flush();
            });
        }
    }

    /// Applies every queued update, including ones queued along the way.
    /// Returns how many updates were applied.
    pub fn flush(&self) -> usize {
        let mut applied = 0;
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(element) = next else {
                break;
            };
            element.perform_update();
            applied += 1;
        }
        self.inner.flush_scheduled.set(false);
        self.inner.flushes.set(self.inner.flushes.get() + 1);
        self.inner.applied.set(self.inner.applied.get() + applied as u64);
        trace!("update flush applied {} element updates", applied);
        applied
    }

    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.flush_scheduled.get()
    }

    /// Total updates applied across all flushes.
    pub fn applied_updates(&self) -> u64 {
        self.inner.applied.get()
    }

    pub fn flush_count(&self) -> u64 {
        self.inner.flushes.get()
    }
}
