//! Property values stored on nodes and relationships

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property value
///
/// Serialized untagged, so a node's properties read as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Pattern equality: numbers compare across integer and float, and
    /// null never equals anything (including null).
    pub fn matches(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Null, _) | (_, PropertyValue::Null) => false,
            (PropertyValue::Integer(a), PropertyValue::Float(b))
            | (PropertyValue::Float(b), PropertyValue::Integer(a)) => (*a as f64) == *b,
            (PropertyValue::List(a), PropertyValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            (a, b) => a == b,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "Null",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::String(_) => "String",
            PropertyValue::List(_) => "List",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Properties in key order
pub type PropertyMap = BTreeMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_equality() {
        assert!(PropertyValue::Integer(2).matches(&PropertyValue::Float(2.0)));
        assert!(PropertyValue::from("a").matches(&"a".into()));
        assert!(!PropertyValue::from("a").matches(&"b".into()));
        assert!(!PropertyValue::Null.matches(&PropertyValue::Null));
    }

    #[test]
    fn test_untagged_json() {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "Ann".into());
        props.insert("age".to_string(), 30i64.into());
        assert_eq!(serde_json::to_string(&props).unwrap(), r#"{"age":30,"name":"Ann"}"#);
    }
}
