//! Abstract syntax tree for the statement dialect

use crate::graph::{PropertyMap, PropertyValue};

/// One parsed statement: clauses in order, then `RETURN variable`
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub clauses: Vec<Clause>,
    pub returns: String,
}

impl Statement {
    /// True when no clause can change the graph
    pub fn is_read_only(&self) -> bool {
        self.clauses.iter().all(|c| matches!(c, Clause::Match(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `MATCH (v:label {k:v})`
    Match(NodePattern),
    /// `MERGE (v:label {k:v})`
    MergeNode(NodePattern),
    /// `MERGE (a)-[:T]->(b)` and friends
    MergeRelationship(RelationshipPattern),
    /// `SET v.k=value`
    Set(SetItem),
}

/// Node pattern
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: String,
    pub labels: Vec<String>,
    pub properties: PropertyMap,
}

/// Relationship between two bound variables
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub left: String,
    pub right: String,
    pub edge_type: String,
    pub direction: EdgeDirection,
}

impl RelationshipPattern {
    /// `(source, target)` variables, or `None` when undirected
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match self.direction {
            EdgeDirection::LeftToRight => Some((&self.left, &self.right)),
            EdgeDirection::RightToLeft => Some((&self.right, &self.left)),
            EdgeDirection::Undirected => None,
        }
    }
}

/// Arrow direction as written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// `-[]->`
    LeftToRight,
    /// `<-[]-`
    RightToLeft,
    /// `-[]-`
    Undirected,
}

/// Property assignment
#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub variable: String,
    pub key: String,
    pub value: PropertyValue,
}
