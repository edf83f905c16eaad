//! Statement execution against a [`GraphStore`]
//!
//! Clauses run left to right over a set of rows, each row binding
//! variables to nodes. A `MATCH` that finds nothing leaves zero rows, and
//! every later clause then does nothing, as in Cypher. `MERGE` binds all
//! existing matches or creates exactly one node or relationship per row.

use super::ast::{Clause, EdgeDirection, NodePattern, RelationshipPattern, SetItem, Statement};
use super::parser::ParseError;
use crate::graph::{GraphError, GraphStore, Node, NodeId};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Variable '{0}' is not bound")]
    UnboundVariable(String),

    #[error("Variable '{0}' is already bound")]
    AlreadyBound(String),

    #[error("Cannot merge node using null property value for '{0}'")]
    NullPropertyInMerge(String),

    #[error("Statement modifies the graph but was run as a read")]
    NotReadOnly,
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

type Row = BTreeMap<String, NodeId>;

/// Counts of what one statement changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub nodes_created: usize,
    pub relationships_created: usize,
    pub properties_set: usize,
}

/// Runs parsed statements against a graph store
pub struct QueryExecutor<'a> {
    store: &'a mut GraphStore,
    stats: ExecutionStats,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a mut GraphStore) -> Self {
        Self {
            store,
            stats: ExecutionStats::default(),
        }
    }

    pub fn stats(&self) -> ExecutionStats {
        self.stats
    }

    /// Execute a statement, returning one node snapshot per result row
    pub fn execute(&mut self, statement: &Statement) -> ExecutionResult<Vec<Node>> {
        let mut rows: Vec<Row> = vec![Row::new()];

        for clause in &statement.clauses {
            rows = match clause {
                Clause::Match(pattern) => self.match_node(rows, pattern)?,
                Clause::MergeNode(pattern) => self.merge_node(rows, pattern)?,
                Clause::MergeRelationship(pattern) => self.merge_relationship(rows, pattern)?,
                Clause::Set(item) => self.set_property(rows, item)?,
            };
        }

        let results = rows
            .iter()
            .map(|row| {
                let id = bound(row, &statement.returns)?;
                self.store
                    .get_node(id)
                    .cloned()
                    .ok_or(ExecutionError::Graph(GraphError::NodeNotFound(id)))
            })
            .collect::<ExecutionResult<Vec<_>>>()?;

        debug!("Statement returned {} rows, {:?}", results.len(), self.stats);
        Ok(results)
    }

    fn match_node(&mut self, rows: Vec<Row>, pattern: &NodePattern) -> ExecutionResult<Vec<Row>> {
        let candidates = self.store.find_nodes(&pattern.labels, &pattern.properties);
        let mut out = Vec::new();

        for row in rows {
            if let Some(id) = row.get(&pattern.variable) {
                if candidates.contains(id) {
                    out.push(row);
                }
                continue;
            }
            for id in &candidates {
                let mut extended = row.clone();
                extended.insert(pattern.variable.clone(), *id);
                out.push(extended);
            }
        }

        Ok(out)
    }

    fn merge_node(&mut self, rows: Vec<Row>, pattern: &NodePattern) -> ExecutionResult<Vec<Row>> {
        if let Some((key, _)) = pattern.properties.iter().find(|(_, v)| v.is_null()) {
            return Err(ExecutionError::NullPropertyInMerge(key.clone()));
        }

        let mut out = Vec::new();
        for row in rows {
            if row.contains_key(&pattern.variable) {
                return Err(ExecutionError::AlreadyBound(pattern.variable.clone()));
            }

            let mut found = self.store.find_nodes(&pattern.labels, &pattern.properties);
            if found.is_empty() {
                found.push(
                    self.store
                        .create_node(pattern.labels.clone(), pattern.properties.clone()),
                );
                self.stats.nodes_created += 1;
            }

            for id in found {
                let mut extended = row.clone();
                extended.insert(pattern.variable.clone(), id);
                out.push(extended);
            }
        }

        Ok(out)
    }

    fn merge_relationship(&mut self, rows: Vec<Row>, pattern: &RelationshipPattern) -> ExecutionResult<Vec<Row>> {
        for row in &rows {
            let left = bound(row, &pattern.left)?;
            let right = bound(row, &pattern.right)?;

            let (source, target) = match pattern.direction {
                EdgeDirection::RightToLeft => (right, left),
                EdgeDirection::LeftToRight | EdgeDirection::Undirected => (left, right),
            };
            let directed = pattern.direction != EdgeDirection::Undirected;

            if self.store.find_edge(source, target, &pattern.edge_type, directed).is_none() {
                self.store.create_edge(source, target, &pattern.edge_type)?;
                self.stats.relationships_created += 1;
            }
        }

        Ok(rows)
    }

    fn set_property(&mut self, rows: Vec<Row>, item: &SetItem) -> ExecutionResult<Vec<Row>> {
        for row in &rows {
            let id = bound(row, &item.variable)?;
            self.store.set_node_property(id, &item.key, item.value.clone())?;
            self.stats.properties_set += 1;
        }
        Ok(rows)
    }
}

fn bound(row: &Row, variable: &str) -> ExecutionResult<NodeId> {
    row.get(variable)
        .copied()
        .ok_or_else(|| ExecutionError::UnboundVariable(variable.to_string()))
}
