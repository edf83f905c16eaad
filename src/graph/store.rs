//! In-memory graph storage
//!
//! Ordered maps keep iteration deterministic, so MATCH results and CLI
//! output come out in creation order.

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, NodeId};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory property graph
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, labels: Vec<String>, properties: PropertyMap) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(id, Node::new(id, labels, properties));
        id
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn set_node_property(&mut self, id: NodeId, key: &str, value: PropertyValue) -> GraphResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.set_property(key, value);
        Ok(())
    }

    /// Nodes carrying every label and property of the pattern
    pub fn find_nodes(&self, labels: &[String], properties: &PropertyMap) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.matches(labels, properties))
            .map(|node| node.id)
            .collect()
    }

    pub fn create_edge(&mut self, source: NodeId, target: NodeId, edge_type: &str) -> GraphResult<EdgeId> {
        if !self.nodes.contains_key(&source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !self.nodes.contains_key(&target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.insert(id, Edge::new(id, source, target, edge_type));
        Ok(id)
    }

    /// First edge of `edge_type` from `source` to `target`; with
    /// `directed == false` the reverse direction also counts
    pub fn find_edge(&self, source: NodeId, target: NodeId, edge_type: &str, directed: bool) -> Option<EdgeId> {
        self.edges
            .values()
            .find(|edge| {
                if directed {
                    edge.links(source, target, edge_type)
                } else {
                    edge.connects(source, target, edge_type)
                }
            })
            .map(|edge| edge.id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(uid: &str) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("uid".to_string(), uid.into());
        props
    }

    #[test]
    fn test_create_and_find_nodes() {
        let mut store = GraphStore::new();
        let a = store.create_node(vec!["person".to_string()], props("u1"));
        let b = store.create_node(vec!["org".to_string()], props("o1"));

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.find_nodes(&[], &props("o1")), vec![b]);
        assert_eq!(store.find_nodes(&["person".to_string()], &PropertyMap::new()), vec![a]);
        assert!(store.find_nodes(&[], &props("x")).is_empty());
    }

    #[test]
    fn test_edges() {
        let mut store = GraphStore::new();
        let a = store.create_node(Vec::new(), props("u1"));
        let b = store.create_node(Vec::new(), props("o1"));

        let e = store.create_edge(a, b, "WORKS_AT").unwrap();
        assert_eq!(store.find_edge(a, b, "WORKS_AT", true), Some(e));
        assert_eq!(store.find_edge(b, a, "WORKS_AT", true), None);
        assert_eq!(store.find_edge(b, a, "WORKS_AT", false), Some(e));
        assert_eq!(
            store.create_edge(a, NodeId(99), "X"),
            Err(GraphError::InvalidEdgeTarget(NodeId(99)))
        );
    }

    #[test]
    fn test_set_property() {
        let mut store = GraphStore::new();
        let a = store.create_node(Vec::new(), props("u1"));
        store.set_node_property(a, "name", "Ann".into()).unwrap();
        assert_eq!(store.get_node(a).unwrap().get_property("name"), Some(&"Ann".into()));
        assert!(store.set_node_property(NodeId(5), "name", "x".into()).is_err());
    }
}
