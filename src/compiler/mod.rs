//! Graph mutation query compiler
//!
//! Compiles one schema-described record into Cypher statements:
//!
//! ```text
//! MATCH (a1 {uid:'o1'})
//! MERGE (m:person {uid:'u1',name:'Ann'})
//! MERGE (m)-[:WORKS_AT]->(a1)
//! RETURN m
//! ```
//!
//! Compilation is pure: a [`QueryCompiler`] holds only its
//! [`CompilerConfig`], and every statement is built fresh per record.
//! Any compile error aborts the whole record before anything is executed.

pub mod assembler;
pub mod identity;
pub mod literal;
pub mod matcher;
pub mod merge;
pub mod relation;
pub mod shape;

pub use assembler::{merge_node_clause, CompiledStatement, QueryAssembler};
pub use identity::{Identity, IdentityResolver};
pub use literal::{escape_identifier, Delimiter, LiteralEscape, NullPolicy, PropertyRenderer};
pub use matcher::{is_match_alias, AliasBinding, MatchSet, MatchStatementGenerator};
pub use merge::generate_relationship_merges;
pub use relation::{
    decode_relations, encode_relations, parse_relations, Direction, RelationParseError, RelationSpec,
};
pub use shape::{ClassifiedField, FieldShape, RecordLayout, ScalarType, ShapeKind};

use crate::record::{FieldValue, Record, RecordSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Path used for the root record in identity errors
const ROOT_PATH: &str = "root";

/// Alias bound by identity lookups
const LOOKUP_ALIAS: &str = "n";

/// Compilation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Value shape disagrees with the declared schema
    #[error("Schema inconsistency in field '{field}': {reason}")]
    SchemaInconsistency { field: String, reason: String },

    /// Label or key absent on a record that must be addressable
    #[error("Record '{record}' has no identity: field '{field}' is missing or empty")]
    MissingIdentity { record: String, field: String },

    #[error("Relation error: {0}")]
    Relation(#[from] RelationParseError),

    /// A compiler setting would produce a malformed statement
    #[error("Invalid setting '{setting}' = '{value}': {reason}")]
    InvalidSetting {
        setting: String,
        value: String,
        reason: String,
    },
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Compiler settings, passed explicitly to every [`QueryCompiler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Metadata field holding the node label
    pub label_field: String,
    /// Field holding the unique node key
    pub key_field: String,
    /// Alias of the node being written
    pub node_alias: String,
    /// String literal escaping
    pub escape: LiteralEscape,
    /// Null handling in creation statements (updates always write nulls)
    pub create_nulls: NullPolicy,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            label_field: "type".to_string(),
            key_field: "uid".to_string(),
            node_alias: "m".to_string(),
            escape: LiteralEscape::Cypher,
            create_nulls: NullPolicy::Omit,
        }
    }
}

impl CompilerConfig {
    /// Check the settings that end up inside statement text.
    ///
    /// The node alias must be a plain identifier and must not collide with
    /// the `a1, a2, ...` aliases given to matched nodes.
    pub fn validate(&self) -> CompileResult<()> {
        let alias = self.node_alias.as_str();
        let invalid = |reason: &str| CompileError::InvalidSetting {
            setting: "node_alias".to_string(),
            value: alias.to_string(),
            reason: reason.to_string(),
        };

        if escape_identifier(alias) != alias {
            return Err(invalid("not a plain identifier"));
        }
        if is_match_alias(alias) {
            return Err(invalid("reserved for matched nodes"));
        }
        for (setting, value) in [("label_field", &self.label_field), ("key_field", &self.key_field)] {
            if value.trim().is_empty() {
                return Err(CompileError::InvalidSetting {
                    setting: setting.to_string(),
                    value: value.clone(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Compiles records into create, update and lookup statements
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Classify the fields of a record schema
    pub fn layout(&self, schema: &RecordSchema) -> CompileResult<RecordLayout> {
        RecordLayout::classify(schema)
    }

    /// Identity of a root record; absence is an error
    pub fn identity(&self, record: &Record) -> CompileResult<Identity> {
        self.resolver().require(record, ROOT_PATH)
    }

    /// Full create-and-relate statement for a record without a stored node
    pub fn compile_create(&self, record: &Record, relations: &[RelationSpec]) -> CompileResult<CompiledStatement> {
        self.config.validate()?;
        let layout = self.layout(record.schema())?;
        let identity = self.identity(record)?;
        let alias = self.config.node_alias.as_str();

        let matches = self.generate_matches(&layout, record)?;
        let properties = self.properties(&layout, record, Delimiter::Property, self.config.create_nulls, true)?;
        let relationships = generate_relationship_merges(relations, &matches, alias)?;

        let statement = QueryAssembler::new()
            .matches(&matches)
            .binding(merge_node_clause(alias, &identity.label, &properties), alias)
            .clauses(relationships)
            .returning(alias);

        debug!("Compiled create statement: {}", statement);
        Ok(statement)
    }

    /// Identities of every related record, keyed by structural field
    pub fn related(&self, record: &Record) -> CompileResult<MatchSet> {
        let layout = self.layout(record.schema())?;
        self.generate_matches(&layout, record)
    }

    /// Property update for a record whose node already exists.
    ///
    /// Every scalar field except the label and key is assigned; null and
    /// empty values clear the stored property.
    pub fn compile_update(&self, record: &Record, identity: &Identity) -> CompileResult<CompiledStatement> {
        self.config.validate()?;
        let layout = self.layout(record.schema())?;
        let alias = self.config.node_alias.as_str();
        let renderer = self.renderer();

        let assignments = self
            .properties(&layout, record, Delimiter::Assignment, NullPolicy::WriteNull, false)?
            .into_iter()
            .map(|assignment| format!("SET {}.{}", alias, assignment));

        let statement = QueryAssembler::new()
            .binding(
                format!(
                    "MATCH ({} {{{}:{}}})",
                    alias,
                    escape_identifier(&identity.key_field),
                    renderer.literal(&identity.key_field, &identity.key_value)?
                ),
                alias,
            )
            .clauses(assignments)
            .returning(alias);

        debug!("Compiled update statement: {}", statement);
        Ok(statement)
    }

    /// `MATCH (n {key:value}) RETURN n` for an identity
    pub fn compile_lookup(&self, identity: &Identity) -> CompileResult<CompiledStatement> {
        self.compile_key_lookup(&identity.key_field, &identity.key_value)
    }

    /// Lookup by key alone; the label plays no part in matching
    pub fn compile_key_lookup(&self, key_field: &str, key_value: &FieldValue) -> CompileResult<CompiledStatement> {
        if key_value.is_blank() {
            return Err(CompileError::MissingIdentity {
                record: ROOT_PATH.to_string(),
                field: key_field.to_string(),
            });
        }

        let clause = format!(
            "MATCH ({} {{{}:{}}})",
            LOOKUP_ALIAS,
            escape_identifier(key_field),
            self.renderer().literal(key_field, key_value)?
        );
        Ok(QueryAssembler::new().binding(clause, LOOKUP_ALIAS).returning(LOOKUP_ALIAS))
    }

    /// Render the record's own scalar properties in schema order
    fn properties(
        &self,
        layout: &RecordLayout,
        record: &Record,
        delimiter: Delimiter,
        nulls: NullPolicy,
        include_key: bool,
    ) -> CompileResult<Vec<String>> {
        let renderer = self.renderer();
        let mut rendered = Vec::new();

        for (field, value) in layout.bind(record)? {
            if field.shape.is_structural()
                || field.name == self.config.label_field
                || (!include_key && field.name == self.config.key_field)
            {
                continue;
            }
            if let Some(property) = renderer.render_property(&field.name, value, &field.shape, delimiter, nulls)? {
                rendered.push(property);
            }
        }

        Ok(rendered)
    }

    fn generate_matches(&self, layout: &RecordLayout, record: &Record) -> CompileResult<MatchSet> {
        MatchStatementGenerator::new(self.resolver(), self.renderer()).generate(layout, record)
    }

    fn resolver(&self) -> IdentityResolver<'_> {
        IdentityResolver::new(&self.config.label_field, &self.config.key_field)
    }

    fn renderer(&self) -> PropertyRenderer {
        PropertyRenderer::new(self.config.escape)
    }
}
