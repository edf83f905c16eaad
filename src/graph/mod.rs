//! In-memory property graph
//!
//! Backing store for [`crate::session::MemoryGraph`]:
//! - Nodes with labels and properties
//! - Directed, typed relationships
//! - Pattern lookup by labels and property equality

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, NodeId};
