//! Graph session boundary
//!
//! The upsert service borrows a session for the duration of one call and
//! never opens, pools or closes it. Implemented by:
//! - [`MemorySession`]: in-process, for tests, dry runs and the CLI
//! - driver-backed sessions outside this crate

pub mod memory;

pub use memory::{MemoryGraph, MemorySession, MemoryTransaction};

use crate::graph::{Node, PropertyValue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors reported by a session or transaction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The graph engine refused or could not run the statement
    #[error("Statement rejected: {0}")]
    Rejected(String),

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session is closed")]
    Closed,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// A node returned by a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Engine-assigned identifier
    pub id: String,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl GraphNode {
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

impl From<&Node> for GraphNode {
    fn from(node: &Node) -> Self {
        GraphNode {
            id: node.id.as_u64().to_string(),
            labels: node.labels.iter().cloned().collect(),
            properties: node.properties.clone(),
        }
    }
}

/// A session against a graph engine.
///
/// Sessions are not shared between tasks; every call takes `&mut self`.
#[async_trait]
pub trait GraphSession: Send {
    /// Run a read-only statement outside any explicit transaction
    async fn run_read(&mut self, statement: &str) -> SessionResult<Vec<GraphNode>>;

    /// Open a transaction; it borrows the session until committed or rolled back
    async fn begin<'a>(&'a mut self) -> SessionResult<Box<dyn GraphTransaction + 'a>>;
}

/// One unit of work. Dropping it without committing discards its writes.
#[async_trait]
pub trait GraphTransaction: Send {
    /// Run a statement, returning the nodes of its `RETURN` column
    async fn run(&mut self, statement: &str) -> SessionResult<Vec<GraphNode>>;

    async fn commit(self: Box<Self>) -> SessionResult<()>;

    async fn rollback(self: Box<Self>) -> SessionResult<()>;
}
