//! Node upsert against a borrowed session

use crate::compiler::{
    CompileError, CompileResult, CompiledStatement, CompilerConfig, Identity, QueryCompiler, RelationSpec,
};
use crate::record::{FieldValue, Record};
use crate::session::{GraphNode, GraphSession, GraphTransaction, SessionError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upsert errors, reported per record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpsertError {
    /// The record could not be compiled; nothing was executed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The identity lookup returned several nodes
    #[error("{count} nodes match {key_field}={key_value}")]
    AmbiguousMatch {
        key_field: String,
        key_value: String,
        count: usize,
    },

    /// The graph engine rejected or could not run a statement
    #[error("Execution failed: {0}")]
    Execution(#[from] SessionError),

    /// The write statement returned no node
    #[error("No node returned for {key_field}={key_value}")]
    CreationFailed { key_field: String, key_value: String },
}

pub type UpsertResult<T> = Result<T, UpsertError>;

/// What an upsert did
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(GraphNode),
    Updated(GraphNode),
}

impl UpsertOutcome {
    pub fn node(&self) -> &GraphNode {
        match self {
            UpsertOutcome::Created(node) | UpsertOutcome::Updated(node) => node,
        }
    }

    pub fn into_node(self) -> GraphNode {
        match self {
            UpsertOutcome::Created(node) | UpsertOutcome::Updated(node) => node,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

/// Statements prepared for one record before any session work
struct PreparedUpsert {
    identity: Identity,
    lookup: CompiledStatement,
    update: CompiledStatement,
    /// Only needed when no node exists, so its error is held until then
    create: CompileResult<CompiledStatement>,
}

/// Looks records up by identity and creates or updates their nodes.
///
/// Holds no session: every call borrows one from the caller, and runs in
/// a single transaction on it. No retries.
#[derive(Debug, Clone, Default)]
pub struct GraphUpsertService {
    compiler: QueryCompiler,
}

impl GraphUpsertService {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            compiler: QueryCompiler::new(config),
        }
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Find the node whose `key_field` equals `key_value`, whatever its label
    pub async fn find_by_identity<S>(
        &self,
        session: &mut S,
        key_field: &str,
        key_value: &FieldValue,
    ) -> UpsertResult<Option<GraphNode>>
    where
        S: GraphSession + ?Sized,
    {
        let lookup = self.compiler.compile_key_lookup(key_field, key_value)?;
        let nodes = session.run_read(&lookup.text()).await?;
        single(nodes, key_field, key_value)
    }

    /// Identities of related records that have no node in the graph.
    ///
    /// Walks every nested record and array element the create statement
    /// would match, in the same order. An empty result means the create
    /// statement will find all of them.
    pub async fn missing_references<S>(&self, session: &mut S, record: &Record) -> UpsertResult<Vec<Identity>>
    where
        S: GraphSession + ?Sized,
    {
        let related = self.compiler.related(record)?;

        let mut missing = Vec::new();
        for binding in related.bindings.values().flatten() {
            let identity = &binding.identity;
            if self
                .find_by_identity(session, &identity.key_field, &identity.key_value)
                .await?
                .is_none()
            {
                info!(
                    "No node for related {} {}={}",
                    identity.label, identity.key_field, identity.key_value
                );
                missing.push(identity.clone());
            }
        }

        if missing.is_empty() {
            debug!("All related records present");
        }
        Ok(missing)
    }

    /// Update the record's node if it exists, otherwise create it together
    /// with its relationships.
    ///
    /// Both statements are compiled before the session is touched. An
    /// error in the root identity or the update aborts before any
    /// transaction opens; an error in the create statement (such as a
    /// related record without a key) only fails the record when the
    /// lookup finds no node, so existing nodes stay updatable.
    pub async fn upsert<S>(
        &self,
        session: &mut S,
        record: &Record,
        relations: &[RelationSpec],
    ) -> UpsertResult<UpsertOutcome>
    where
        S: GraphSession + ?Sized,
    {
        let prepared = self.prepare(record, relations)?;

        let mut tx = session.begin().await?;
        match self.write(tx.as_mut(), &prepared).await {
            Ok(outcome) => {
                tx.commit().await?;
                match &outcome {
                    UpsertOutcome::Created(node) => info!(
                        "Created node {} for {}={}",
                        node.id, prepared.identity.key_field, prepared.identity.key_value
                    ),
                    UpsertOutcome::Updated(node) => info!(
                        "Updated node {} for {}={}",
                        node.id, prepared.identity.key_field, prepared.identity.key_value
                    ),
                }
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed after '{}': {}", err, rollback);
                }
                Err(err)
            }
        }
    }

    fn prepare(&self, record: &Record, relations: &[RelationSpec]) -> UpsertResult<PreparedUpsert> {
        let identity = self.compiler.identity(record)?;
        Ok(PreparedUpsert {
            lookup: self.compiler.compile_lookup(&identity)?,
            update: self.compiler.compile_update(record, &identity)?,
            create: self.compiler.compile_create(record, relations),
            identity,
        })
    }

    async fn write<T>(&self, tx: &mut T, prepared: &PreparedUpsert) -> UpsertResult<UpsertOutcome>
    where
        T: GraphTransaction + ?Sized,
    {
        let identity = &prepared.identity;
        let existing = single(
            tx.run(&prepared.lookup.text()).await?,
            &identity.key_field,
            &identity.key_value,
        )?;

        let statement = match (&existing, &prepared.create) {
            (Some(_), _) => &prepared.update,
            (None, Ok(create)) => create,
            (None, Err(err)) => return Err(UpsertError::Compile(err.clone())),
        };
        debug!("Executing: {}", statement);

        let node = tx
            .run(&statement.text())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| UpsertError::CreationFailed {
                key_field: identity.key_field.clone(),
                key_value: identity.key_value.to_string(),
            })?;

        Ok(if existing.is_some() {
            UpsertOutcome::Updated(node)
        } else {
            UpsertOutcome::Created(node)
        })
    }
}

fn single(nodes: Vec<GraphNode>, key_field: &str, key_value: &FieldValue) -> UpsertResult<Option<GraphNode>> {
    match nodes.len() {
        0 | 1 => Ok(nodes.into_iter().next()),
        count => {
            warn!("{} nodes match {}={}", count, key_field, key_value);
            Err(UpsertError::AmbiguousMatch {
                key_field: key_field.to_string(),
                key_value: key_value.to_string(),
                count,
            })
        }
    }
}
