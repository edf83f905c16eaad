//! Relation specification language
//!
//! Human-authored form, used in configuration:
//!
//! ```text
//! WORKS_AT:>(company),MEMBER_OF:<(clubs)
//! ```
//!
//! Wire form, used to carry parsed specs from configuration time to
//! execution time:
//!
//! ```text
//! company|>|WORKS_AT,clubs|<|MEMBER_OF
//! ```
//!
//! `parse(encode(parse(x)))` equals `parse(x)`; the texts themselves differ
//! because the two forms order the parts differently.

use pest::Parser;
use pest_derive::Parser;
use std::str::FromStr;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "compiler/relation.pest"]
struct RelationParser;

const LIST_DELIMITER: char = ',';
const WIRE_DELIMITER: char = '|';

/// Relation specification errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelationParseError {
    /// Fragment does not follow `label:>(field)` / `label:<(field)`
    #[error("Malformed relation '{fragment}': {reason}")]
    Malformed { fragment: String, reason: String },

    /// Two relations target the same field
    #[error("Duplicate relation target '{field}'")]
    DuplicateTarget { field: String },

    /// Target is not a nested-record or array-of-record field
    #[error("Relation target '{field}' is not a related-record field")]
    UnknownTarget { field: String },

    /// Wire fragment does not have the `field|direction|label` form
    #[error("Invalid serialized relation '{fragment}'")]
    InvalidWire { fragment: String },
}

pub type RelationResult<T> = Result<T, RelationParseError>;

/// Edge direction, relative to the node being written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `(m)-[:L]->(related)`
    Outgoing,
    /// `(m)<-[:L]-(related)`
    Incoming,
    /// `(m)-[:L]-(related)`; not expressible in the text form
    Undirected,
}

impl Direction {
    pub fn token(&self) -> &'static str {
        match self {
            Direction::Outgoing => ">",
            Direction::Incoming => "<",
            Direction::Undirected => "-",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            ">" => Some(Direction::Outgoing),
            "<" => Some(Direction::Incoming),
            "-" => Some(Direction::Undirected),
            _ => None,
        }
    }
}

/// One relationship edge between the written node and a related field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationSpec {
    pub edge_label: String,
    pub direction: Direction,
    /// Name of the nested-record or array-of-record field on the root record
    pub field: String,
}

impl RelationSpec {
    pub fn new(edge_label: impl Into<String>, direction: Direction, field: impl Into<String>) -> Self {
        RelationSpec {
            edge_label: edge_label.into(),
            direction,
            field: field.into(),
        }
    }

    /// `field|direction|label`
    pub fn to_wire(&self) -> String {
        [self.field.as_str(), self.direction.token(), self.edge_label.as_str()]
            .join(&WIRE_DELIMITER.to_string())
    }

    /// Parse a single `field|direction|label` fragment
    pub fn from_wire(fragment: &str) -> RelationResult<Self> {
        let invalid = || RelationParseError::InvalidWire {
            fragment: fragment.to_string(),
        };

        let parts: Vec<&str> = fragment.split(WIRE_DELIMITER).collect();
        let [field, direction, label] = parts.as_slice() else {
            return Err(invalid());
        };
        if field.is_empty() || label.is_empty() {
            return Err(invalid());
        }
        let direction = Direction::from_token(direction).ok_or_else(invalid)?;

        Ok(RelationSpec::new(*label, direction, *field))
    }
}

impl FromStr for RelationSpec {
    type Err = RelationParseError;

    /// Parse one `label:>(field)` fragment (already trimmed)
    fn from_str(fragment: &str) -> RelationResult<Self> {
        let malformed = |reason: String| RelationParseError::Malformed {
            fragment: fragment.to_string(),
            reason,
        };

        let mut pairs = RelationParser::parse(Rule::relation, fragment)
            .map_err(|e| malformed(e.variant.message().into_owned()))?;
        let relation = pairs
            .next()
            .ok_or_else(|| malformed("empty relation".to_string()))?;

        let mut edge_label = None;
        let mut direction = None;
        let mut field = None;

        for inner in relation.into_inner() {
            match inner.as_rule() {
                Rule::edge_label => edge_label = Some(inner.as_str().trim().to_string()).filter(|l| !l.is_empty()),
                Rule::direction => direction = Direction::from_token(inner.as_str()),
                Rule::field_name => field = Some(inner.as_str().to_string()),
                _ => {}
            }
        }

        match (edge_label, direction, field) {
            (Some(edge_label), Some(direction), Some(field)) => Ok(RelationSpec {
                edge_label,
                direction,
                field,
            }),
            _ => Err(malformed("incomplete relation".to_string())),
        }
    }
}

/// Parse a comma-separated relation list.
///
/// Every target must be one of `related_fields` and may appear only once.
/// Empty or blank text yields an empty list.
pub fn parse_relations(text: &str, related_fields: &[&str]) -> RelationResult<Vec<RelationSpec>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut specs: Vec<RelationSpec> = Vec::new();
    for fragment in text.split(LIST_DELIMITER) {
        let spec: RelationSpec = fragment.trim().parse()?;
        if !related_fields.contains(&spec.field.as_str()) {
            return Err(RelationParseError::UnknownTarget { field: spec.field });
        }
        push_unique(&mut specs, spec)?;
    }
    Ok(specs)
}

/// Serialize specs to the wire form
pub fn encode_relations(specs: &[RelationSpec]) -> String {
    specs
        .iter()
        .map(RelationSpec::to_wire)
        .collect::<Vec<_>>()
        .join(&LIST_DELIMITER.to_string())
}

/// Deserialize specs from the wire form
pub fn decode_relations(wire: &str) -> RelationResult<Vec<RelationSpec>> {
    if wire.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut specs = Vec::new();
    for fragment in wire.split(LIST_DELIMITER) {
        push_unique(&mut specs, RelationSpec::from_wire(fragment.trim())?)?;
    }
    Ok(specs)
}

fn push_unique(specs: &mut Vec<RelationSpec>, spec: RelationSpec) -> RelationResult<()> {
    if specs.iter().any(|s| s.field == spec.field) {
        return Err(RelationParseError::DuplicateTarget { field: spec.field });
    }
    specs.push(spec);
    Ok(())
}
