//! MATCH clause generation for related records
//!
//! Each nested record, and each element of an array of records, is bound
//! to a fresh alias by a `MATCH` on its identity. Clauses come out in
//! schema field order, then array index order.

use super::identity::{Identity, IdentityResolver};
use super::literal::{escape_identifier, PropertyRenderer};
use super::shape::{RecordLayout, ShapeKind};
use super::CompileResult;
use crate::record::{FieldValue, Record};
use indexmap::IndexMap;

/// Prefix of aliases bound to matched nodes
pub const MATCH_ALIAS_PREFIX: &str = "a";

/// True for aliases of the form `a<digits>`
pub fn is_match_alias(alias: &str) -> bool {
    alias
        .strip_prefix(MATCH_ALIAS_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// One matched node bound inside a statement
#[derive(Debug, Clone, PartialEq)]
pub struct AliasBinding {
    pub alias: String,
    pub identity: Identity,
}

/// MATCH clauses for one root record plus the aliases they bind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSet {
    /// Clauses in emission order
    pub clauses: Vec<String>,
    /// Structural field name -> aliases bound for it (possibly none)
    pub bindings: IndexMap<String, Vec<AliasBinding>>,
}

impl MatchSet {
    /// All bound aliases in emission order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .values()
            .flatten()
            .map(|binding| binding.alias.as_str())
    }
}

/// Emits `MATCH (aN {key:value})` clauses for related records
pub struct MatchStatementGenerator<'c> {
    resolver: IdentityResolver<'c>,
    renderer: PropertyRenderer,
    next_alias: usize,
}

impl<'c> MatchStatementGenerator<'c> {
    pub fn new(resolver: IdentityResolver<'c>, renderer: PropertyRenderer) -> Self {
        Self {
            resolver,
            renderer,
            next_alias: 1,
        }
    }

    /// Generate match clauses for every structural field of `record`.
    ///
    /// Fails on the first related record without an identity; no partial
    /// result is returned.
    pub fn generate(&mut self, layout: &RecordLayout, record: &Record) -> CompileResult<MatchSet> {
        let mut set = MatchSet::default();

        for (field, value) in layout.bind(record)? {
            let bound = match (&field.shape.kind, value) {
                (ShapeKind::Nested(_), FieldValue::Record(nested)) => {
                    vec![self.bind(nested, &field.name, &mut set.clauses)?]
                }
                (ShapeKind::NestedList(_), FieldValue::Array(items)) => {
                    let mut bound = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        if let FieldValue::Record(nested) = item {
                            let path = format!("{}[{}]", field.name, index);
                            bound.push(self.bind(nested, &path, &mut set.clauses)?);
                        }
                    }
                    bound
                }
                (ShapeKind::Nested(_) | ShapeKind::NestedList(_), _) => Vec::new(),
                _ => continue,
            };
            set.bindings.insert(field.name.clone(), bound);
        }

        Ok(set)
    }

    fn bind(&mut self, nested: &Record, path: &str, clauses: &mut Vec<String>) -> CompileResult<AliasBinding> {
        RecordLayout::classify(nested.schema())?.check_nested(nested, path)?;
        let identity = self.resolver.require(nested, path)?;
        let alias = format!("{}{}", MATCH_ALIAS_PREFIX, self.next_alias);
        self.next_alias += 1;

        clauses.push(format!(
            "MATCH ({} {{{}:{}}})",
            alias,
            escape_identifier(&identity.key_field),
            self.renderer.literal(&identity.key_field, &identity.key_value)?
        ));

        Ok(AliasBinding { alias, identity })
    }
}
