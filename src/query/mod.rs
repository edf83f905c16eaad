//! Statement dialect
//!
//! The subset of Cypher the compiler emits, parsed and executed against
//! the in-memory graph:
//! - `MATCH` on a node pattern
//! - `MERGE` of a node pattern or a relationship between bound nodes
//! - `SET v.key=value`
//! - `RETURN v`
//!
//! Anything else is a parse error; this is not a general Cypher engine.

pub mod ast;
pub mod executor;
pub mod parser;

pub use ast::{Clause, EdgeDirection, NodePattern, RelationshipPattern, SetItem, Statement};
pub use executor::{ExecutionError, ExecutionResult, ExecutionStats, QueryExecutor};
pub use parser::{parse_statement, ParseError, ParseResult};

use crate::graph::{GraphStore, Node};

/// Parse and execute a statement that may modify the graph
pub fn execute(text: &str, store: &mut GraphStore) -> ExecutionResult<Vec<Node>> {
    let statement = parse_statement(text)?;
    QueryExecutor::new(store).execute(&statement)
}

/// Parse and execute a statement that must not modify the graph
pub fn execute_read(text: &str, store: &mut GraphStore) -> ExecutionResult<Vec<Node>> {
    let statement = parse_statement(text)?;
    if !statement.is_read_only() {
        return Err(ExecutionError::NotReadOnly);
    }
    QueryExecutor::new(store).execute(&statement)
}
