//! Graph upsert orchestration
//!
//! [`GraphUpsertService`] runs one record per call on a borrowed session;
//! [`GraphRecordWriter`] drives a batch through it and applies the
//! caller's failure policy.

pub mod upsert;
pub mod writer;

pub use upsert::{GraphUpsertService, UpsertError, UpsertOutcome, UpsertResult};
pub use writer::{FailurePolicy, GraphRecordWriter, WriteSummary};
