//! In-process session over an in-memory graph
//!
//! Transactions hold the graph lock for their whole lifetime and write to
//! a private copy, which replaces the shared graph on commit.

use super::{GraphNode, GraphSession, GraphTransaction, SessionError, SessionResult};
use crate::graph::{Edge, GraphStore, Node};
use crate::query::{self, ExecutionError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Shared in-memory graph; cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    store: Arc<Mutex<GraphStore>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session on this graph
    pub fn session(&self) -> MemorySession {
        MemorySession {
            graph: self.clone(),
            closed: false,
        }
    }

    /// Run a statement directly, committing immediately
    pub async fn execute(&self, statement: &str) -> SessionResult<Vec<GraphNode>> {
        let mut store = self.store.lock().await;
        let nodes = query::execute(statement, &mut store).map_err(rejected)?;
        Ok(nodes.iter().map(GraphNode::from).collect())
    }

    pub async fn node_count(&self) -> usize {
        self.store.lock().await.node_count()
    }

    pub async fn edge_count(&self) -> usize {
        self.store.lock().await.edge_count()
    }

    /// Copy of every node, in creation order
    pub async fn nodes(&self) -> Vec<Node> {
        self.store.lock().await.all_nodes().cloned().collect()
    }

    /// Copy of every relationship, in creation order
    pub async fn edges(&self) -> Vec<Edge> {
        self.store.lock().await.all_edges().cloned().collect()
    }
}

/// Session on a [`MemoryGraph`]
#[derive(Debug)]
pub struct MemorySession {
    graph: MemoryGraph,
    closed: bool,
}

impl MemorySession {
    /// Later calls fail with [`SessionError::Closed`]
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn run_read(&mut self, statement: &str) -> SessionResult<Vec<GraphNode>> {
        self.ensure_open()?;
        debug!("Read: {}", statement);

        let mut store = self.graph.store.lock().await;
        let nodes = query::execute_read(statement, &mut store).map_err(rejected)?;
        Ok(nodes.iter().map(GraphNode::from).collect())
    }

    async fn begin<'a>(&'a mut self) -> SessionResult<Box<dyn GraphTransaction + 'a>> {
        self.ensure_open()?;

        let guard = Arc::clone(&self.graph.store).lock_owned().await;
        let working = guard.clone();
        debug!("Transaction opened");
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Transaction on a [`MemoryGraph`]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<GraphStore>,
    working: GraphStore,
}

#[async_trait]
impl GraphTransaction for MemoryTransaction {
    async fn run(&mut self, statement: &str) -> SessionResult<Vec<GraphNode>> {
        debug!("Write: {}", statement);
        let nodes = query::execute(statement, &mut self.working).map_err(rejected)?;
        Ok(nodes.iter().map(GraphNode::from).collect())
    }

    async fn commit(self: Box<Self>) -> SessionResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> SessionResult<()> {
        debug!("Transaction rolled back");
        Ok(())
    }
}

fn rejected(err: ExecutionError) -> SessionError {
    SessionError::Rejected(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_publishes() {
        let graph = MemoryGraph::new();
        let mut session = graph.session();

        let mut tx = session.begin().await.unwrap();
        let nodes = tx.run("MERGE (m:person {uid:'u1'}) RETURN m").await.unwrap();
        assert_eq!(nodes[0].labels, vec!["person"]);
        tx.commit().await.unwrap();

        assert_eq!(graph.node_count().await, 1);
        assert_eq!(session.run_read("MATCH (n {uid:'u1'}) RETURN n").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard() {
        let graph = MemoryGraph::new();
        let mut session = graph.session();

        let mut tx = session.begin().await.unwrap();
        tx.run("MERGE (m:person {uid:'u1'}) RETURN m").await.unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = session.begin().await.unwrap();
            tx.run("MERGE (m:person {uid:'u2'}) RETURN m").await.unwrap();
        }

        assert_eq!(graph.node_count().await, 0);
    }

    #[tokio::test]
    async fn test_read_rejects_writes() {
        let graph = MemoryGraph::new();
        let mut session = graph.session();
        let err = session.run_read("MERGE (m:person {uid:'u1'}) RETURN m").await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_closed_session() {
        let graph = MemoryGraph::new();
        let mut session = graph.session();
        session.close();
        assert_eq!(
            session.run_read("MATCH (n {uid:'u1'}) RETURN n").await.unwrap_err(),
            SessionError::Closed
        );
        assert!(session.begin().await.is_err());
    }
}
