//! Relationship MERGE clause generation

use super::literal::escape_identifier;
use super::matcher::MatchSet;
use super::relation::{Direction, RelationParseError, RelationSpec};
use super::CompileResult;

/// Emit one `MERGE` per (spec, bound alias) pair.
///
/// Specs are processed in list order, aliases in binding order. A spec
/// whose field was bound to no alias (null nested record, empty array)
/// contributes nothing; a spec whose field was never bound at all is
/// rejected, since the spec list was not validated against this record.
pub fn generate_relationship_merges(
    specs: &[RelationSpec],
    matches: &MatchSet,
    node_alias: &str,
) -> CompileResult<Vec<String>> {
    let mut clauses = Vec::new();

    for spec in specs {
        let bound = matches.bindings.get(&spec.field).ok_or_else(|| {
            RelationParseError::UnknownTarget {
                field: spec.field.clone(),
            }
        })?;

        let edge = escape_identifier(&spec.edge_label);
        for binding in bound {
            clauses.push(merge_clause(node_alias, &edge, spec.direction, &binding.alias));
        }
    }

    Ok(clauses)
}

fn merge_clause(node: &str, edge: &str, direction: Direction, related: &str) -> String {
    match direction {
        Direction::Outgoing => format!("MERGE ({})-[:{}]->({})", node, edge, related),
        Direction::Incoming => format!("MERGE ({})<-[:{}]-({})", node, edge, related),
        Direction::Undirected => format!("MERGE ({})-[:{}]-({})", node, edge, related),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::identity::Identity;
    use crate::compiler::matcher::AliasBinding;
    use crate::compiler::CompileError;
    use crate::record::FieldValue;

    fn binding(alias: &str, uid: &str) -> AliasBinding {
        AliasBinding {
            alias: alias.to_string(),
            identity: Identity {
                label: "org".to_string(),
                key_field: "uid".to_string(),
                key_value: FieldValue::from(uid),
            },
        }
    }

    fn matches() -> MatchSet {
        let mut set = MatchSet::default();
        set.bindings.insert("company".to_string(), vec![binding("a1", "o1")]);
        set.bindings
            .insert("clubs".to_string(), vec![binding("a2", "c1"), binding("a3", "c2")]);
        set.bindings.insert("manager".to_string(), Vec::new());
        set
    }

    #[test]
    fn test_directions() {
        let specs = vec![
            RelationSpec::new("WORKS_AT", Direction::Outgoing, "company"),
            RelationSpec::new("MEMBER_OF", Direction::Incoming, "clubs"),
        ];
        let clauses = generate_relationship_merges(&specs, &matches(), "m").unwrap();
        assert_eq!(
            clauses,
            vec![
                "MERGE (m)-[:WORKS_AT]->(a1)",
                "MERGE (m)<-[:MEMBER_OF]-(a2)",
                "MERGE (m)<-[:MEMBER_OF]-(a3)",
            ]
        );
    }

    #[test]
    fn test_undirected_and_escaped_label() {
        let specs = vec![RelationSpec::new("knows well", Direction::Undirected, "company")];
        let clauses = generate_relationship_merges(&specs, &matches(), "m").unwrap();
        assert_eq!(clauses, vec!["MERGE (m)-[:`knows well`]-(a1)"]);
    }

    #[test]
    fn test_unbound_field_contributes_nothing() {
        let specs = vec![RelationSpec::new("REPORTS_TO", Direction::Outgoing, "manager")];
        assert!(generate_relationship_merges(&specs, &matches(), "m").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let specs = vec![RelationSpec::new("LIVES_AT", Direction::Outgoing, "address")];
        let err = generate_relationship_merges(&specs, &matches(), "m").unwrap_err();
        assert_eq!(
            err,
            CompileError::Relation(RelationParseError::UnknownTarget {
                field: "address".to_string()
            })
        );
    }
}
