pub mod dom;
pub mod timing;

pub use dom::{Document, DocumentError, NodeId};
pub use timing::{EntryType, Performance, PerformanceEntry, TimingError};
