//! Statement assembly
//!
//! Clauses are joined in fixed order: matches, node merge, relationship
//! merges, return. The assembler only concatenates; it never executes.

use super::literal::{escape_identifier, PropertyRenderer};
use super::matcher::MatchSet;
use std::fmt;

/// One executable statement, built fresh per record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    /// Non-empty clauses in execution order
    pub clauses: Vec<String>,
    /// Aliases bound by the statement, in binding order
    pub aliases: Vec<String>,
}

impl CompiledStatement {
    /// Single-space joined statement text
    pub fn text(&self) -> String {
        self.clauses.join(" ")
    }
}

impl fmt::Display for CompiledStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Accumulates clauses and aliases for one statement
#[derive(Debug, Default)]
pub struct QueryAssembler {
    clauses: Vec<String>,
    aliases: Vec<String>,
}

impl QueryAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every match clause and its aliases
    pub fn matches(mut self, set: &MatchSet) -> Self {
        self.clauses.extend(set.clauses.iter().cloned());
        self.aliases.extend(set.aliases().map(str::to_string));
        self
    }

    /// Append a clause that binds `alias`
    pub fn binding(mut self, clause: String, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self.clause(clause)
    }

    /// Append clauses binding no new alias; empty strings are dropped
    pub fn clauses(mut self, clauses: impl IntoIterator<Item = String>) -> Self {
        for clause in clauses {
            self = self.clause(clause);
        }
        self
    }

    fn clause(mut self, clause: String) -> Self {
        if !clause.trim().is_empty() {
            self.clauses.push(clause);
        }
        self
    }

    /// Finish with `RETURN alias`
    pub fn returning(self, alias: &str) -> CompiledStatement {
        let mut statement = CompiledStatement {
            clauses: self.clauses,
            aliases: self.aliases,
        };
        statement.clauses.push(format!("RETURN {}", alias));
        statement
    }
}

/// `MERGE (alias:label {k:v,...})`
pub fn merge_node_clause(alias: &str, label: &str, properties: &[String]) -> String {
    if properties.is_empty() {
        format!("MERGE ({}:{})", alias, escape_identifier(label))
    } else {
        format!(
            "MERGE ({}:{} {})",
            alias,
            escape_identifier(label),
            PropertyRenderer::property_map(properties)
        )
    }
}
