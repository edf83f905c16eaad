//! Graph relationships

use super::types::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// A directed, typed relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, edge_type: impl Into<String>) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Same endpoints in this direction, same type
    pub fn links(&self, source: NodeId, target: NodeId, edge_type: &str) -> bool {
        self.source == source && self.target == target && self.edge_type == edge_type
    }

    /// Same endpoints in either direction, same type
    pub fn connects(&self, a: NodeId, b: NodeId, edge_type: &str) -> bool {
        self.links(a, b, edge_type) || self.links(b, a, edge_type)
    }
}
