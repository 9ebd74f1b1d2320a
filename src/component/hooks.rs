use super::Element;

/// Observation points around an element's update cycle.
///
/// The runtime calls these around its own scheduling and apply steps, so any
/// component can be observed without changing how it renders. None of the
/// hooks may call back into the same element mutably; reading its state and
/// taking [`Element::update_complete`] is fine.
pub trait UpdateHooks {
    /// Runs right after `element` scheduled an update. `was_pending` is the
    /// pending flag as it stood before this request.
    fn on_schedule_update(&self, _element: &Element, _was_pending: bool) {}

    /// Runs before the element applies its very first update.
    fn on_first_apply(&self, _element: &Element) {}

    /// Runs before every later update is applied.
    fn on_subsequent_apply(&self, _element: &Element) {}
}

/// Hooks that observe nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl UpdateHooks for NoopHooks {}
