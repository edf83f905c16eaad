//! Statement dialect parser using Pest

use crate::graph::{PropertyMap, PropertyValue};
use crate::query::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/dialect.pest"]
struct DialectParser;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error
    #[error("Parse error: {0}")]
    PestError(#[from] pest::error::Error<Rule>),

    /// Semantic error
    #[error("Semantic error: {0}")]
    SemanticError(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse one statement
pub fn parse_statement(input: &str) -> ParseResult<Statement> {
    let statement = DialectParser::parse(Rule::statement, input)?
        .next()
        .ok_or_else(|| semantic("empty statement"))?;

    let mut clauses = Vec::new();
    let mut returns = None;

    for pair in statement.into_inner() {
        match pair.as_rule() {
            Rule::match_clause => clauses.push(Clause::Match(parse_node(first_inner(pair)?)?)),
            Rule::merge_clause => {
                let pattern = first_inner(pair)?;
                clauses.push(match pattern.as_rule() {
                    Rule::relationship_pattern => Clause::MergeRelationship(parse_relationship(pattern)?),
                    _ => Clause::MergeNode(parse_node(pattern)?),
                });
            }
            Rule::set_clause => clauses.push(Clause::Set(parse_set(pair)?)),
            Rule::return_clause => returns = Some(first_inner(pair)?.as_str().to_string()),
            _ => {}
        }
    }

    Ok(Statement {
        clauses,
        returns: returns.ok_or_else(|| semantic("missing RETURN"))?,
    })
}

fn parse_node(pair: Pair<Rule>) -> ParseResult<NodePattern> {
    let mut variable = String::new();
    let mut labels = Vec::new();
    let mut properties = PropertyMap::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => variable = inner.as_str().to_string(),
            Rule::labels => {
                labels = inner.into_inner().map(|label| unquote_name(label.as_str())).collect();
            }
            Rule::properties => properties = parse_properties(inner)?,
            _ => {}
        }
    }

    Ok(NodePattern {
        variable,
        labels,
        properties,
    })
}

fn parse_properties(pair: Pair<Rule>) -> ParseResult<PropertyMap> {
    let mut props = PropertyMap::new();

    for property in pair.into_inner() {
        let mut key = String::new();
        let mut value = PropertyValue::Null;

        for part in property.into_inner() {
            match part.as_rule() {
                Rule::property_key => key = unquote_name(part.as_str()),
                Rule::value => value = parse_value(part)?,
                _ => {}
            }
        }

        if props.insert(key.clone(), value).is_some() {
            return Err(semantic(&format!("duplicate property '{}'", key)));
        }
    }

    Ok(props)
}

fn parse_relationship(pair: Pair<Rule>) -> ParseResult<RelationshipPattern> {
    let mut variables = Vec::new();
    let mut edge = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::node_ref => variables.push(first_inner(inner)?.as_str().to_string()),
            Rule::edge => {
                let arrow = first_inner(inner)?;
                let direction = match arrow.as_rule() {
                    Rule::outgoing_edge => EdgeDirection::LeftToRight,
                    Rule::incoming_edge => EdgeDirection::RightToLeft,
                    _ => EdgeDirection::Undirected,
                };
                edge = Some((unquote_name(first_inner(arrow)?.as_str()), direction));
            }
            _ => {}
        }
    }

    match (variables.as_slice(), edge) {
        ([left, right], Some((edge_type, direction))) => Ok(RelationshipPattern {
            left: left.clone(),
            right: right.clone(),
            edge_type,
            direction,
        }),
        _ => Err(semantic("incomplete relationship pattern")),
    }
}

fn parse_set(pair: Pair<Rule>) -> ParseResult<SetItem> {
    let mut variable = String::new();
    let mut key = String::new();
    let mut value = PropertyValue::Null;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => variable = inner.as_str().to_string(),
            Rule::property_key => key = unquote_name(inner.as_str()),
            Rule::value => value = parse_value(inner)?,
            _ => {}
        }
    }

    Ok(SetItem { variable, key, value })
}

fn parse_value(pair: Pair<Rule>) -> ParseResult<PropertyValue> {
    let inner = first_inner(pair)?;
    let text = inner.as_str();

    match inner.as_rule() {
        Rule::null => Ok(PropertyValue::Null),
        Rule::boolean => Ok(PropertyValue::Boolean(text.eq_ignore_ascii_case("true"))),
        Rule::integer => text
            .parse()
            .map(PropertyValue::Integer)
            .map_err(|_| semantic(&format!("integer out of range: {}", text))),
        Rule::float => text
            .parse()
            .map(PropertyValue::Float)
            .map_err(|_| semantic(&format!("invalid float: {}", text))),
        Rule::string => Ok(PropertyValue::String(unescape_string(text))),
        Rule::list => inner
            .into_inner()
            .map(parse_value)
            .collect::<ParseResult<Vec<_>>>()
            .map(PropertyValue::List),
        _ => Err(semantic(&format!("unexpected value: {}", text))),
    }
}

/// Strip backticks from a quoted name
fn unquote_name(raw: &str) -> String {
    match raw.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        Some(inner) => inner.replace("``", "`"),
        None => raw.to_string(),
    }
}

/// Strip quotes and resolve backslash escapes
fn unescape_string(raw: &str) -> String {
    let body = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn first_inner(pair: Pair<Rule>) -> ParseResult<Pair<Rule>> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| semantic(&format!("empty {:?}", rule)))
}

fn semantic(message: &str) -> ParseError {
    ParseError::SemanticError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_statement() {
        let statement = parse_statement(
            "MATCH (a1 {uid:'o1'}) MERGE (m:person {uid:'u1',age:42,score:2.5,tags:['a','b']}) \
             MERGE (m)-[:WORKS_AT]->(a1) RETURN m",
        )
        .unwrap();

        assert_eq!(statement.clauses.len(), 3);
        assert_eq!(statement.returns, "m");
        match &statement.clauses[1] {
            Clause::MergeNode(node) => {
                assert_eq!(node.variable, "m");
                assert_eq!(node.labels, vec!["person"]);
                assert_eq!(node.properties["age"], PropertyValue::Integer(42));
                assert_eq!(node.properties["score"], PropertyValue::Float(2.5));
                assert_eq!(
                    node.properties["tags"],
                    PropertyValue::List(vec!["a".into(), "b".into()])
                );
            }
            other => panic!("unexpected clause {:?}", other),
        }
        match &statement.clauses[2] {
            Clause::MergeRelationship(rel) => {
                assert_eq!(rel.edge_type, "WORKS_AT");
                assert_eq!(rel.direction, EdgeDirection::LeftToRight);
            }
            other => panic!("unexpected clause {:?}", other),
        }
    }

    #[test]
    fn test_parse_directions() {
        let incoming = parse_statement("MERGE (m)<-[:L]-(a1) RETURN m").unwrap();
        let undirected = parse_statement("MERGE (m)-[:`knows well`]-(a1) RETURN m").unwrap();

        match (&incoming.clauses[0], &undirected.clauses[0]) {
            (Clause::MergeRelationship(i), Clause::MergeRelationship(u)) => {
                assert_eq!(i.direction, EdgeDirection::RightToLeft);
                assert_eq!(u.direction, EdgeDirection::Undirected);
                assert_eq!(u.edge_type, "knows well");
            }
            other => panic!("unexpected clauses {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_statement() {
        let statement =
            parse_statement(r"MATCH (m {uid:'u1'}) SET m.name='O\'Brien' SET m.age=null RETURN m").unwrap();
        assert_eq!(
            statement.clauses[1],
            Clause::Set(SetItem {
                variable: "m".to_string(),
                key: "name".to_string(),
                value: "O'Brien".into(),
            })
        );
        assert_eq!(
            statement.clauses[2],
            Clause::Set(SetItem {
                variable: "m".to_string(),
                key: "age".to_string(),
                value: PropertyValue::Null,
            })
        );
    }

    #[test]
    fn test_rejects_other_cypher() {
        assert!(parse_statement("CREATE (n) RETURN n").is_err());
        assert!(parse_statement("MATCH (n {uid:'u1'})").is_err());
        assert!(parse_statement("MATCH (n {uid:'it's'}) RETURN n").is_err());
    }
}
