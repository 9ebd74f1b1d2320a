//! Minimal reactive component runtime.
//!
//! Components declare properties and render a flat [`Template`]; the runtime
//! batches property writes into one update per element per cycle, applies
//! updates from a deferred flush, and exposes each cycle's completion as an
//! awaitable. Everything here is `!Send` and expects to run inside a
//! `tokio::task::LocalSet`.

pub mod element;
pub mod hooks;
pub mod mount;
pub mod scheduler;

pub use element::{Element, UpdateComplete};
pub use hooks::{NoopHooks, UpdateHooks};
pub use mount::MountPoint;
pub use scheduler::UpdateScheduler;

use crate::core::dom::{Document, DocumentError};
use crate::fixtures::{Dataset, Record};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("No component is defined for <{0}>")]
    UnknownTag(String),
    #[error("<{0}> is already defined")]
    AlreadyDefined(String),
    #[error("<{tag}> has no property '{name}'")]
    UnknownProperty { tag: String, name: String },
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Failure of a single element update. Cloneable because every awaiter of a
/// completion receives its own copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("<{tag}> failed to render: {reason}")]
    Render { tag: String, reason: String },
    #[error("<{tag}> failed to commit: {reason}")]
    Commit { tag: String, reason: String },
    #[error("<{tag}> was dropped before its update completed")]
    Abandoned { tag: String },
}

/// Property value as seen by change detection. Text compares by value;
/// records and lists compare by identity.
#[derive(Clone)]
pub enum PropValue {
    Text(Rc<str>),
    Record(Rc<Record>),
    List(Dataset),
}

impl PropValue {
    pub fn text(value: &str) -> Self {
        PropValue::Text(Rc::from(value))
    }

    pub fn has_changed(&self, next: &PropValue) -> bool {
        match (self, next) {
            (PropValue::Text(a), PropValue::Text(b)) => a != b,
            (PropValue::Record(a), PropValue::Record(b)) => !Rc::ptr_eq(a, b),
            (PropValue::List(a), PropValue::List(b)) => !Rc::ptr_eq(a, b),
            _ => true,
        }
    }

    /// Attribute form used when the property reflects. Only text reflects.
    pub fn to_attribute(&self) -> Option<&str> {
        match self {
            PropValue::Text(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Rc<str>> {
        match self {
            PropValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Rc<Record>> {
        match self {
            PropValue::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Dataset> {
        match self {
            PropValue::List(list) => Some(list),
            _ => None,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(value) => f.debug_tuple("Text").field(value).finish(),
            PropValue::Record(record) => f
                .debug_tuple("Record")
                .field(&record.field(0).unwrap_or_default())
                .finish(),
            PropValue::List(list) => f.debug_tuple("List").field(&list.len()).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reflect {
    Never,
    /// Follows the runtime's shared [`ReflectConfig`] at the time the
    /// property changes.
    Shared,
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDeclaration {
    pub name: &'static str,
    pub reflect: Reflect,
}

impl PropertyDeclaration {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            reflect: Reflect::Never,
        }
    }

    pub const fn shared(name: &'static str) -> Self {
        Self {
            name,
            reflect: Reflect::Shared,
        }
    }

    pub fn reflects(&self, config: &ReflectConfig) -> bool {
        match self.reflect {
            Reflect::Never => false,
            Reflect::Shared => config.is_enabled(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    values: SmallVec<[(&'static str, PropValue); 3]>,
}

impl PropertyMap {
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Stores `value`, returning the previous one.
    pub fn insert(&mut self, name: &'static str, value: PropValue) -> Option<PropValue> {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.values.push((name, value));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Part {
    /// `<tag class="class">value</tag>`
    Text {
        tag: &'static str,
        class: &'static str,
        value: Rc<str>,
    },
    /// A child component with the properties bound to it.
    Child {
        tag: &'static str,
        props: SmallVec<[(&'static str, PropValue); 3]>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parts: Vec::with_capacity(capacity),
        }
    }

    pub fn text(mut self, tag: &'static str, class: &'static str, value: Rc<str>) -> Self {
        self.parts.push(Part::Text { tag, class, value });
        self
    }

    pub fn child<I>(mut self, tag: &'static str, props: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, PropValue)>,
    {
        self.parts.push(Part::Child {
            tag,
            props: props.into_iter().collect(),
        });
        self
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// A component type: declared properties plus a pure render function.
pub trait Component: 'static {
    fn tag_name(&self) -> &'static str;

    fn properties(&self) -> &'static [PropertyDeclaration];

    /// Initial property values, applied before the element's first update.
    fn defaults(&self) -> Vec<(&'static str, PropValue)> {
        Vec::new()
    }

    fn render(&self, props: &PropertyMap) -> Result<Template, UpdateError>;
}

pub type ComponentFactory = Rc<dyn Fn() -> Box<dyn Component>>;

/// Shared "reflect properties to attributes" switch read by every
/// [`Reflect::Shared`] declaration.
#[derive(Debug, Clone, Default)]
pub struct ReflectConfig {
    enabled: Rc<Cell<bool>>,
}

impl ReflectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Enables reflection until the returned guard is dropped.
    #[must_use = "reflection is turned off again when the guard drops"]
    pub fn enable_scoped(&self) -> ReflectGuard {
        self.set(true);
        ReflectGuard {
            config: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ReflectGuard {
    config: ReflectConfig,
}

impl Drop for ReflectGuard {
    fn drop(&mut self) {
        self.config.set(false);
    }
}

/// Everything an element needs from its surroundings: the document it draws
/// into, the scheduler that applies its updates, the hooks observing them and
/// the registry of component definitions.
pub struct ComponentRuntime {
    document: Arc<Document>,
    scheduler: UpdateScheduler,
    definitions: RefCell<HashMap<&'static str, ComponentFactory>>,
    hooks: Rc<dyn UpdateHooks>,
    reflect: ReflectConfig,
}

impl ComponentRuntime {
    pub fn new(document: Arc<Document>, hooks: Rc<dyn UpdateHooks>, reflect: ReflectConfig) -> Rc<Self> {
        Rc::new(Self {
            document,
            scheduler: UpdateScheduler::new(),
            definitions: RefCell::new(HashMap::new()),
            hooks,
            reflect,
        })
    }

    pub fn define<F>(&self, tag: &'static str, factory: F) -> Result<(), ComponentError>
    where
        F: Fn() -> Box<dyn Component> + 'static,
    {
        let mut definitions = self.definitions.borrow_mut();
        if definitions.contains_key(tag) {
            return Err(ComponentError::AlreadyDefined(tag.to_string()));
        }
        definitions.insert(tag, Rc::new(factory));
        tracing::trace!("defined <{}>", tag);
        Ok(())
    }

    /// Instantiates a detached element for `tag`. Its first update is
    /// requested but only enqueued once the element is connected.
    pub fn create_element(self: &Rc<Self>, tag: &str) -> Result<Element, ComponentError> {
        let factory = self
            .definitions
            .borrow()
            .get(tag)
            .cloned()
            .ok_or_else(|| ComponentError::UnknownTag(tag.to_string()))?;
        Ok(Element::new(self.clone(), factory()))
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    pub fn hooks(&self) -> &Rc<dyn UpdateHooks> {
        &self.hooks
    }

    pub fn reflect(&self) -> &ReflectConfig {
        &self.reflect
    }
}
