use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    ChildList,
    Attributes,
    CharacterData,
}

/// Running totals of the mutations applied to a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStats {
    pub child_list: u64,
    pub attributes: u64,
    pub character_data: u64,
}

impl MutationStats {
    fn record(&mut self, mutation_type: MutationType) {
        match mutation_type {
            MutationType::ChildList => self.child_list += 1,
            MutationType::Attributes => self.attributes += 1,
            MutationType::CharacterData => self.character_data += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub tag_name: String,
    pub text_content: String,
    pub attributes: HashMap<String, String>,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 8]>,
}

impl Node {
    pub fn new_element(tag_name: String, id: NodeId) -> Self {
        Self {
            id,
            node_type: NodeType::Element,
            tag_name,
            text_content: String::new(),
            attributes: HashMap::new(),
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn new_text(content: String, id: NodeId) -> Self {
        Self {
            id,
            node_type: NodeType::Text,
            tag_name: "#text".to_string(),
            text_content: content,
            attributes: HashMap::new(),
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn new_document(id: NodeId) -> Self {
        Self {
            id,
            node_type: NodeType::Document,
            tag_name: "#document".to_string(),
            text_content: String::new(),
            attributes: HashMap::new(),
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    pub fn get_tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }
}

/// Node arena backing every mounted component tree.
///
/// The document owns a `#document` root with a single `body` element; mount
/// points hang their containers off `body`.
pub struct Document {
    next_id: AtomicU64,
    body: NodeId,
    nodes: Arc<DashMap<NodeId, Arc<RwLock<Node>>>>,
    stats: Arc<RwLock<MutationStats>>,
}

impl Document {
    pub fn new() -> Self {
        let nodes = Arc::new(DashMap::new());
        let root_node = NodeId(0);
        let body = NodeId(1);
        let mut root = Node::new_document(root_node);
        root.children.push(body);
        let mut body_node = Node::new_element("body".to_string(), body);
        body_node.parent = Some(root_node);
        nodes.insert(root_node, Arc::new(RwLock::new(root)));
        nodes.insert(body, Arc::new(RwLock::new(body_node)));

        Self {
            next_id: AtomicU64::new(2),
            body,
            nodes,
            stats: Arc::new(RwLock::new(MutationStats::default())),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn allocate_id(&self) -> NodeId {
        NodeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn create_element(&self, tag_name: &str) -> NodeId {
        let node_id = self.allocate_id();
        let node = Node::new_element(tag_name.to_string(), node_id);
        self.nodes.insert(node_id, Arc::new(RwLock::new(node)));
        node_id
    }

    pub fn create_text(&self, content: &str) -> NodeId {
        let node_id = self.allocate_id();
        let node = Node::new_text(content.to_string(), node_id);
        self.nodes.insert(node_id, Arc::new(RwLock::new(node)));
        node_id
    }

    fn node(&self, node_id: NodeId) -> Result<Arc<RwLock<Node>>> {
        self.nodes
            .get(&node_id)
            .map(|e| e.clone())
            .ok_or(DocumentError::NodeNotFound(node_id))
    }

    pub fn append_child(&self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        let parent = self.node(parent_id)?;
        let child = self.node(child_id)?;
        if parent.read().is_text() {
            return Err(DocumentError::InvalidOperation(
                "text nodes cannot have children".to_string(),
            ));
        }
        parent.write().children.push(child_id);
        child.write().parent = Some(parent_id);
        self.record_mutation(MutationType::ChildList);
        Ok(())
    }

    /// Swaps `old_id` for `new_id` at the same position under `parent_id` and
    /// drops the old subtree from the arena.
    pub fn replace_child(&self, parent_id: NodeId, old_id: NodeId, new_id: NodeId) -> Result<()> {
        let parent = self.node(parent_id)?;
        let child = self.node(new_id)?;
        {
            let mut parent = parent.write();
            let slot = parent
                .children
                .iter_mut()
                .find(|id| **id == old_id)
                .ok_or(DocumentError::NodeNotFound(old_id))?;
            *slot = new_id;
        }
        child.write().parent = Some(parent_id);
        self.drop_subtree(old_id);
        self.record_mutation(MutationType::ChildList);
        Ok(())
    }

    /// Detaches `node_id` from its parent and removes it and all of its
    /// descendants from the arena.
    pub fn remove_subtree(&self, node_id: NodeId) -> Result<()> {
        let node = self.node(node_id)?;
        let parent = node.read().parent;
        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.nodes.get(&parent_id) {
                parent_node.write().children.retain(|id| *id != node_id);
            }
        }
        self.drop_subtree(node_id);
        self.record_mutation(MutationType::ChildList);
        Ok(())
    }

    fn drop_subtree(&self, node_id: NodeId) {
        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            if let Some((_, node)) = self.nodes.remove(&id) {
                stack.extend(node.read().children.iter().copied());
            }
        }
    }

    pub fn set_attribute(&self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let node = self.node(node_id)?;
        node.write()
            .attributes
            .insert(name.to_string(), value.to_string());
        self.record_mutation(MutationType::Attributes);
        Ok(())
    }

    pub fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.nodes.get(&node_id)?.read().get_attribute(name)
    }

    pub fn set_text(&self, node_id: NodeId, content: &str) -> Result<()> {
        let node = self.node(node_id)?;
        {
            let mut node = node.write();
            if !node.is_text() {
                return Err(DocumentError::InvalidOperation(format!(
                    "<{}> is not a text node",
                    node.tag_name
                )));
            }
            node.text_content.clear();
            node.text_content.push_str(content);
        }
        self.record_mutation(MutationType::CharacterData);
        Ok(())
    }

    /// Concatenated text of every text node under `node_id`, in tree order.
    pub fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let node = node.read();
            if node.is_text() {
                out.push_str(&node.text_content);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub fn get_children(&self, node_id: NodeId) -> Vec<NodeId> {
        if let Some(node) = self.nodes.get(&node_id) {
            node.read().children.iter().copied().collect()
        } else {
            Vec::new()
        }
    }

    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> Vec<NodeId> {
        let mut result: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|entry| entry.value().read().get_tag_name().eq_ignore_ascii_case(tag_name))
            .map(|entry| *entry.key())
            .collect();
        result.sort_by_key(|id| id.0);
        result
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn record_mutation(&self, mutation_type: MutationType) {
        self.stats.write().record(mutation_type);
    }

    pub fn mutation_stats(&self) -> MutationStats {
        *self.stats.read()
    }

    pub fn get_performance_metrics(&self) -> serde_json::Value {
        let stats = self.mutation_stats();
        serde_json::json!({
            "node_count": self.nodes.len(),
            "mutations": {
                "child_list": stats.child_list,
                "attributes": stats.attributes,
                "character_data": stats.character_data
            }
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
