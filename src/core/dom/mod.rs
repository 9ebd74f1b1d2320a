pub mod document;

pub use document::{
    Document, DocumentError, MutationStats, MutationType, Node, NodeId, NodeType,
};
