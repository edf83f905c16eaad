//! Schema-described records
//!
//! The input side of the compiler: a [`Record`] is an ordered set of field
//! values that always travels with the [`RecordSchema`] it follows.

pub mod json;
pub mod schema;
pub mod value;

pub use schema::{RecordSchema, Schema, SchemaError, SchemaField, SchemaResult};
pub use value::{FieldValue, Record, RecordBuilder};
