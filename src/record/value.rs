//! Runtime values of schema-described records

use super::schema::{RecordSchema, SchemaError, SchemaResult};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Value held by one record field
///
/// Supports:
/// - Scalars (boolean, 32/64-bit integers, 32/64-bit floats, string)
/// - Arrays of values
/// - Nested records
/// - Null
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Array(Vec<FieldValue>),
    Record(Record),
}

impl FieldValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null or the empty string
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Get string value if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get nested record if this is a record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Get elements if this is an array
    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Int(_) => "int",
            FieldValue::Long(_) => "long",
            FieldValue::Float(_) => "float",
            FieldValue::Double(_) => "double",
            FieldValue::String(_) => "string",
            FieldValue::Array(_) => "array",
            FieldValue::Record(_) => "record",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Long(l) => write!(f, "{}", l),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Double(d) => write!(f, "{}", d),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            FieldValue::Record(r) => write!(f, "{}{{..}}", r.schema().name),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i64> for FieldValue {
    fn from(l: i64) -> Self {
        FieldValue::Long(l)
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        FieldValue::Double(d)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<Record> for FieldValue {
    fn from(r: Record) -> Self {
        FieldValue::Record(r)
    }
}

impl From<Vec<Record>> for FieldValue {
    fn from(records: Vec<Record>) -> Self {
        FieldValue::Array(records.into_iter().map(FieldValue::Record).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A record: field values in schema order, plus the schema they follow
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    values: IndexMap<String, FieldValue>,
}

impl Record {
    /// Start building a record for `schema`
    pub fn builder(schema: Arc<RecordSchema>) -> RecordBuilder {
        RecordBuilder {
            schema,
            values: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Value of a field; `None` when the schema has no such field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Iterate `(name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Builder for [`Record`]
///
/// Fields that are never set hold [`FieldValue::Null`].
pub struct RecordBuilder {
    schema: Arc<RecordSchema>,
    values: Vec<(String, FieldValue)>,
}

impl RecordBuilder {
    /// Set a field value; setting the same field twice keeps the last value
    pub fn set(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> SchemaResult<Record> {
        let mut supplied: IndexMap<String, FieldValue> = IndexMap::new();
        for (name, value) in self.values {
            if self.schema.field(&name).is_none() {
                return Err(SchemaError::UnknownField {
                    record: self.schema.name.clone(),
                    field: name,
                });
            }
            supplied.insert(name, value);
        }

        let values = self
            .schema
            .fields
            .iter()
            .map(|field| {
                let value = supplied.swap_remove(&field.name).unwrap_or(FieldValue::Null);
                (field.name.clone(), value)
            })
            .collect();

        Ok(Record {
            schema: self.schema,
            values,
        })
    }
}
