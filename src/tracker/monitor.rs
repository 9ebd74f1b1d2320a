use super::CompletionRegistry;
use crate::component::{Element, UpdateHooks};
use futures::FutureExt;

/// Hooks that make every element's update cycle visible to a
/// [`CompletionRegistry`].
///
/// An element registers its completion once per cycle: on its first apply
/// (covering the initial render), and afterwards on the first request of each
/// cycle.
#[derive(Debug, Clone)]
pub struct MonitorUpdate {
    registry: CompletionRegistry,
}

impl MonitorUpdate {
    pub fn new(registry: CompletionRegistry) -> Self {
        Self { registry }
    }

    fn register(&self, element: &Element) {
        self.registry
            .register(element.update_complete().boxed_local());
    }
}

impl UpdateHooks for MonitorUpdate {
    fn on_schedule_update(&self, element: &Element, was_pending: bool) {
        if !was_pending && element.has_updated() {
            self.register(element);
        }
    }

    fn on_first_apply(&self, element: &Element) {
        self.register(element);
    }
}
