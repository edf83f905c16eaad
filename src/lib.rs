//! cypher-sink
//!
//! Writes schema-described records into a Cypher graph database. Each
//! record is compiled into one statement that matches its related nodes,
//! merges its own node and merges the configured relationships:
//!
//! ```text
//! MATCH (a1 {uid:'o1'}) MERGE (m:person {uid:'u1',name:'Ann'}) MERGE (m)-[:WORKS_AT]->(a1) RETURN m
//! ```
//!
//! # Layout
//!
//! - [`record`]: schemas, field values, JSON decoding
//! - [`compiler`]: shape classification, identity, literals, MATCH/MERGE
//!   generation, the relation-spec language
//! - [`session`]: the graph session boundary and an in-memory session
//! - [`service`]: upsert orchestration and the batch record writer
//! - [`config`]: sink configuration and its execution-stage form
//! - [`graph`], [`query`]: the in-memory graph behind [`MemoryGraph`]
//!
//! ## Example Usage
//!
//! ```rust
//! use cypher_sink::{
//!     CompilerConfig, GraphUpsertService, MemoryGraph, Record, RecordSchema, Schema, SchemaField,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let schema = Arc::new(
//!     RecordSchema::new(
//!         "Person",
//!         vec![
//!             SchemaField::new("type", Schema::String),
//!             SchemaField::new("uid", Schema::String),
//!             SchemaField::new("name", Schema::String),
//!         ],
//!     )
//!     .unwrap(),
//! );
//! let record = Record::builder(schema)
//!     .set("type", "Person")
//!     .set("uid", "u1")
//!     .set("name", "Ann")
//!     .build()
//!     .unwrap();
//!
//! let graph = MemoryGraph::new();
//! let mut session = graph.session();
//! let service = GraphUpsertService::new(CompilerConfig::default());
//!
//! let outcome = service.upsert(&mut session, &record, &[]).await.unwrap();
//! assert!(outcome.is_created());
//! assert_eq!(graph.node_count().await, 1);
//! # });
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod config;
pub mod graph;
pub mod query;
pub mod record;
pub mod service;
pub mod session;

// Re-export main types for convenience
pub use compiler::{
    decode_relations, encode_relations, parse_relations, CompileError, CompileResult, CompiledStatement,
    CompilerConfig, Direction, Identity, LiteralEscape, NullPolicy, QueryCompiler, RelationParseError,
    RelationSpec,
};

pub use config::{ConfigError, ConfigResult, ConnectionConfig, ExecutionConfig, SinkConfig};

pub use record::{FieldValue, Record, RecordSchema, Schema, SchemaError, SchemaField};

pub use service::{
    FailurePolicy, GraphRecordWriter, GraphUpsertService, UpsertError, UpsertOutcome, UpsertResult, WriteSummary,
};

pub use session::{GraphNode, GraphSession, GraphTransaction, MemoryGraph, MemorySession, SessionError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
