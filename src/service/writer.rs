//! Batch record writer
//!
//! Feeds records one at a time through [`GraphUpsertService`] on a session
//! it owns, and decides per record whether a failure ends the batch.

use super::upsert::{GraphUpsertService, UpsertOutcome, UpsertResult};
use crate::compiler::{CompilerConfig, RelationSpec};
use crate::record::Record;
use crate::session::GraphSession;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// What to do when one record fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the error; the batch stops
    #[default]
    Abort,
    /// Log the error, count the record as skipped, continue
    Skip,
}

/// Counts over the records written so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl WriteSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

impl fmt::Display for WriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped",
            self.created, self.updated, self.skipped
        )
    }
}

/// Writes records to the graph through one owned session
pub struct GraphRecordWriter<S: GraphSession> {
    session: S,
    service: GraphUpsertService,
    relations: Vec<RelationSpec>,
    policy: FailurePolicy,
    summary: WriteSummary,
}

impl<S: GraphSession> GraphRecordWriter<S> {
    pub fn new(session: S, config: CompilerConfig, relations: Vec<RelationSpec>, policy: FailurePolicy) -> Self {
        Self {
            session,
            service: GraphUpsertService::new(config),
            relations,
            policy,
            summary: WriteSummary::default(),
        }
    }

    /// Upsert one record.
    ///
    /// Under [`FailurePolicy::Skip`] a failed record yields `Ok(None)`.
    pub async fn write(&mut self, record: &Record) -> UpsertResult<Option<UpsertOutcome>> {
        match self.service.upsert(&mut self.session, record, &self.relations).await {
            Ok(outcome) => {
                if outcome.is_created() {
                    self.summary.created += 1;
                } else {
                    self.summary.updated += 1;
                }
                Ok(Some(outcome))
            }
            Err(err) => match self.policy {
                FailurePolicy::Abort => Err(err),
                FailurePolicy::Skip => {
                    warn!("Skipping record: {}", err);
                    self.summary.skipped += 1;
                    Ok(None)
                }
            },
        }
    }

    /// Upsert records in order, stopping at the first error that aborts
    pub async fn write_all<'r, I>(&mut self, records: I) -> UpsertResult<WriteSummary>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        for record in records {
            self.write(record).await?;
        }
        Ok(self.summary)
    }

    pub fn summary(&self) -> WriteSummary {
        self.summary
    }

    /// Finish the batch, handing back the session
    pub fn close(self) -> (S, WriteSummary) {
        info!("Writer closed: {}", self.summary);
        (self.session, self.summary)
    }
}
