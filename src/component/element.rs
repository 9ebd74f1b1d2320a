use super::{
    Component, ComponentError, ComponentRuntime, Part, PropValue, PropertyDeclaration,
    PropertyMap, Template, UpdateError,
};
use crate::core::dom::{DocumentError, NodeId};
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture, Shared};
use futures::FutureExt;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{trace, warn};

/// Resolves once the update cycle that was pending when it was taken has been
/// applied. Taken while no update is pending, it is already resolved.
pub type UpdateComplete = Shared<LocalBoxFuture<'static, Result<(), UpdateError>>>;

/// Handle to a live component instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Element {
    inner: Rc<RefCell<ElementInner>>,
    runtime: Rc<ComponentRuntime>,
}

struct ElementInner {
    tag: &'static str,
    component: Box<dyn Component>,
    props: PropertyMap,
    node: NodeId,
    slots: Vec<Slot>,
    connected: bool,
    disposed: bool,
    cycle: UpdateCycle,
}

#[derive(Default)]
struct UpdateCycle {
    has_updated: bool,
    update_requested: bool,
    enqueued: bool,
    changed: SmallVec<[&'static str; 3]>,
    reflecting: SmallVec<[&'static str; 3]>,
    resolver: Option<oneshot::Sender<Result<(), UpdateError>>>,
    complete: Option<UpdateComplete>,
    update_count: u64,
}

impl UpdateCycle {
    fn begin(&mut self, tag: &'static str) {
        let (resolver, receiver) = oneshot::channel();
        self.update_requested = true;
        self.resolver = Some(resolver);
        self.complete = Some(
            receiver
                .map(move |outcome| match outcome {
                    Ok(result) => result,
                    Err(oneshot::Canceled) => Err(UpdateError::Abandoned {
                        tag: tag.to_string(),
                    }),
                })
                .boxed_local()
                .shared(),
        );
    }

    fn finish(&mut self, succeeded: bool) -> Option<oneshot::Sender<Result<(), UpdateError>>> {
        if succeeded {
            self.has_updated = true;
        }
        self.update_requested = false;
        self.update_count += 1;
        self.complete = None;
        self.resolver.take()
    }
}

enum Slot {
    Text {
        tag: &'static str,
        class: &'static str,
        node: NodeId,
        text: NodeId,
        value: Rc<str>,
    },
    Child(Element),
}

impl Slot {
    fn node(&self) -> NodeId {
        match self {
            Slot::Text { node, .. } => *node,
            Slot::Child(child) => child.node(),
        }
    }

    fn release(self) {
        if let Slot::Child(child) = self {
            child.release();
        }
    }
}

fn commit_error(tag: &'static str, reason: impl fmt::Display) -> UpdateError {
    UpdateError::Commit {
        tag: tag.to_string(),
        reason: reason.to_string(),
    }
}

impl Element {
    pub(crate) fn new(runtime: Rc<ComponentRuntime>, component: Box<dyn Component>) -> Self {
        let tag = component.tag_name();
        let node = runtime.document().create_element(tag);
        let mut props = PropertyMap::default();
        let mut cycle = UpdateCycle::default();
        for (name, value) in component.defaults() {
            props.insert(name, value);
            cycle.changed.push(name);
        }
        // Every element starts with its first update requested; it is queued
        // once the element is connected.
        cycle.begin(tag);

        Self {
            inner: Rc::new(RefCell::new(ElementInner {
                tag,
                component,
                props,
                node,
                slots: Vec::new(),
                connected: false,
                disposed: false,
                cycle,
            })),
            runtime,
        }
    }

    pub fn tag_name(&self) -> &'static str {
        self.inner.borrow().tag
    }

    pub fn node(&self) -> NodeId {
        self.inner.borrow().node
    }

    pub fn has_updated(&self) -> bool {
        self.inner.borrow().cycle.has_updated
    }

    pub fn is_update_pending(&self) -> bool {
        self.inner.borrow().cycle.update_requested
    }

    pub fn is_connected(&self) -> bool {
        self.inner.borrow().connected
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }

    /// Number of update cycles this element has applied.
    pub fn update_count(&self) -> u64 {
        self.inner.borrow().cycle.update_count
    }

    pub fn property(&self, name: &str) -> Option<PropValue> {
        self.inner.borrow().props.get(name).cloned()
    }

    /// Child components currently rendered by this element, in order.
    pub fn children(&self) -> Vec<Element> {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Child(child) => Some(child.clone()),
                Slot::Text { .. } => None,
            })
            .collect()
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn update_complete(&self) -> UpdateComplete {
        match &self.inner.borrow().cycle.complete {
            Some(complete) => complete.clone(),
            None => future::ready(Ok(())).boxed_local().shared(),
        }
    }

    fn declaration(&self, name: &str) -> Result<PropertyDeclaration, ComponentError> {
        let inner = self.inner.borrow();
        inner
            .component
            .properties()
            .iter()
            .find(|decl| decl.name == name)
            .copied()
            .ok_or_else(|| ComponentError::UnknownProperty {
                tag: inner.tag.to_string(),
                name: name.to_string(),
            })
    }

    /// Assigns a declared property. Requests an update and returns `true`
    /// only when the value actually changed.
    pub fn set_property(&self, name: &str, value: PropValue) -> Result<bool, ComponentError> {
        let decl = self.declaration(name)?;
        {
            let mut inner = self.inner.borrow_mut();
            let changed = inner
                .props
                .get(decl.name)
                .map_or(true, |old| old.has_changed(&value));
            if !changed {
                return Ok(false);
            }
            inner.props.insert(decl.name, value);
        }
        self.request_update(Some(&decl));
        Ok(true)
    }

    /// Schedules an update for this element. Any number of requests before
    /// the update is applied fold into one cycle.
    pub fn request_update(&self, property: Option<&PropertyDeclaration>) {
        let (was_pending, enqueue) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            if inner.disposed {
                return;
            }
            if let Some(decl) = property {
                if !inner.cycle.changed.contains(&decl.name) {
                    inner.cycle.changed.push(decl.name);
                }
                if decl.reflects(self.runtime.reflect()) && !inner.cycle.reflecting.contains(&decl.name) {
                    inner.cycle.reflecting.push(decl.name);
                }
            }
            let was_pending = inner.cycle.update_requested;
            if !was_pending {
                inner.cycle.begin(inner.tag);
            }
            let enqueue = inner.connected && !inner.cycle.enqueued;
            if enqueue {
                inner.cycle.enqueued = true;
            }
            (was_pending, enqueue)
        };
        if enqueue {
            self.runtime.scheduler().enqueue(self.clone());
        }
        self.runtime.hooks().on_schedule_update(self, was_pending);
    }

    /// Marks the element as attached, queueing its pending update.
    pub fn connect(&self) {
        let enqueue = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed || inner.connected {
                return;
            }
            inner.connected = true;
            let enqueue = inner.cycle.update_requested && !inner.cycle.enqueued;
            if enqueue {
                inner.cycle.enqueued = true;
            }
            enqueue
        };
        if enqueue {
            self.runtime.scheduler().enqueue(self.clone());
        }
    }

    /// Tears the element and its rendered subtree down and removes its nodes
    /// from the document. Pending completions resolve immediately.
    pub fn dispose(&self) -> Result<(), DocumentError> {
        let node = self.node();
        self.release();
        let document = self.runtime.document();
        if document.contains(node) {
            document.remove_subtree(node)?;
        }
        Ok(())
    }

    fn release(&self) {
        let (slots, resolver) = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.connected = false;
            inner.cycle.update_requested = false;
            inner.cycle.complete = None;
            (std::mem::take(&mut inner.slots), inner.cycle.resolver.take())
        };
        if let Some(resolver) = resolver {
            let _ = resolver.send(Ok(()));
        }
        for slot in slots {
            slot.release();
        }
    }

    /// Applies the pending update. Called by the scheduler's flush.
    pub(crate) fn perform_update(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.cycle.enqueued = false;
            if inner.disposed || !inner.cycle.update_requested {
                return;
            }
        }

        let hooks = self.runtime.hooks().clone();
        if self.has_updated() {
            hooks.on_subsequent_apply(self);
        } else {
            hooks.on_first_apply(self);
        }

        let result = self.apply();
        let (tag, resolver) = {
            let mut inner = self.inner.borrow_mut();
            let resolver = inner.cycle.finish(result.is_ok());
            (inner.tag, resolver)
        };
        match &result {
            Ok(()) => trace!("<{}> updated", tag),
            Err(e) => warn!("<{}> update failed: {}", tag, e),
        }
        if let Some(resolver) = resolver {
            let _ = resolver.send(result);
        }
    }

    fn apply(&self) -> Result<(), UpdateError> {
        let document = self.runtime.document();
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let tag = inner.tag;

        inner.cycle.changed.clear();
        let reflecting = std::mem::take(&mut inner.cycle.reflecting);
        for name in reflecting {
            if let Some(value) = inner.props.get(name).and_then(PropValue::to_attribute) {
                document
                    .set_attribute(inner.node, name, value)
                    .map_err(|e| commit_error(tag, e))?;
            }
        }

        let template = inner.component.render(&inner.props)?;
        inner.commit(&template, &self.runtime)
    }
}

impl ElementInner {
    /// Reconciles rendered slots against `template` by position: matching
    /// slots are patched in place, mismatches are replaced, extras removed.
    fn commit(&mut self, template: &Template, runtime: &Rc<ComponentRuntime>) -> Result<(), UpdateError> {
        let tag = self.tag;
        let document = runtime.document();
        let parts = template.parts();

        for (index, part) in parts.iter().enumerate() {
            if self.patch_slot(index, part, runtime)? {
                continue;
            }
            let slot = mount_part(part, runtime).map_err(|e| commit_error(tag, e))?;
            let new_node = slot.node();
            if index < self.slots.len() {
                let old = std::mem::replace(&mut self.slots[index], slot);
                document
                    .replace_child(self.node, old.node(), new_node)
                    .map_err(|e| commit_error(tag, e))?;
                old.release();
            } else {
                document
                    .append_child(self.node, new_node)
                    .map_err(|e| commit_error(tag, e))?;
                self.slots.push(slot);
            }
            if let Some(Slot::Child(child)) = self.slots.get(index) {
                child.connect();
            }
        }

        while self.slots.len() > parts.len() {
            if let Some(old) = self.slots.pop() {
                let node = old.node();
                old.release();
                document.remove_subtree(node).map_err(|e| commit_error(tag, e))?;
            }
        }
        Ok(())
    }

    fn patch_slot(
        &mut self,
        index: usize,
        part: &Part,
        runtime: &Rc<ComponentRuntime>,
    ) -> Result<bool, UpdateError> {
        let tag = self.tag;
        match (self.slots.get_mut(index), part) {
            (
                Some(Slot::Text {
                    tag: slot_tag,
                    class: slot_class,
                    text,
                    value,
                    ..
                }),
                Part::Text {
                    tag: part_tag,
                    class: part_class,
                    value: next,
                },
            ) if slot_tag == part_tag && slot_class == part_class => {
                if value != next {
                    runtime
                        .document()
                        .set_text(*text, next)
                        .map_err(|e| commit_error(tag, e))?;
                    *value = next.clone();
                }
                Ok(true)
            }
            (Some(Slot::Child(child)), Part::Child { tag: part_tag, props }) if child.tag_name() == *part_tag => {
                for (name, value) in props {
                    child
                        .set_property(name, value.clone())
                        .map_err(|e| commit_error(tag, e))?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn mount_part(part: &Part, runtime: &Rc<ComponentRuntime>) -> Result<Slot, ComponentError> {
    let document = runtime.document();
    match part {
        Part::Text { tag, class, value } => {
            let node = document.create_element(tag);
            document.set_attribute(node, "class", class)?;
            let text = document.create_text(value);
            document.append_child(node, text)?;
            Ok(Slot::Text {
                tag: *tag,
                class: *class,
                node,
                text,
                value: value.clone(),
            })
        }
        Part::Child { tag, props } => {
            let child = runtime.create_element(tag)?;
            for (name, value) in props {
                child.set_property(name, value.clone())?;
            }
            Ok(Slot::Child(child))
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Element")
            .field("tag", &inner.tag)
            .field("node", &inner.node)
            .field("connected", &inner.connected)
            .field("has_updated", &inner.cycle.has_updated)
            .field("update_requested", &inner.cycle.update_requested)
            .field("slots", &inner.slots.len())
            .finish()
    }
}
