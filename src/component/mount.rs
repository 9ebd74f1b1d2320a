use super::{ComponentError, ComponentRuntime, Element};
use crate::core::dom::{DocumentError, NodeId};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// A container node under `body` that component trees are attached to.
pub struct MountPoint {
    runtime: Rc<ComponentRuntime>,
    node: NodeId,
    mounted: RefCell<Vec<Element>>,
}

impl MountPoint {
    pub fn new(runtime: Rc<ComponentRuntime>) -> Result<Self, DocumentError> {
        let document = runtime.document();
        let node = document.create_element("div");
        document.append_child(document.body(), node)?;
        Ok(Self {
            runtime,
            node,
            mounted: RefCell::new(Vec::new()),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Creates an element for `tag`, appends it and connects it. Its first
    /// update runs on the next scheduler flush.
    pub fn create(&self, tag: &str) -> Result<Element, ComponentError> {
        let element = self.runtime.create_element(tag)?;
        self.runtime
            .document()
            .append_child(self.node, element.node())?;
        element.connect();
        self.mounted.borrow_mut().push(element.clone());
        debug!("mounted <{}>", tag);
        Ok(element)
    }

    /// Disposes every mounted tree, leaving the container empty.
    pub fn clear(&self) -> Result<(), DocumentError> {
        let mounted = std::mem::take(&mut *self.mounted.borrow_mut());
        let count = mounted.len();
        for element in mounted {
            element.dispose()?;
        }
        debug!("cleared {} mounted trees", count);
        Ok(())
    }

    /// Number of trees mounted and not yet cleared.
    pub fn len(&self) -> usize {
        self.mounted.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.borrow().is_empty()
    }
}
