//! Record schemas
//!
//! A closed description of a record's shape, as handed over by the pipeline
//! host. Schemas are parsed from the Avro-style JSON the host emits:
//!
//! ```json
//! {"type": "record", "name": "Person", "fields": [
//!     {"name": "uid", "type": "string"},
//!     {"name": "age", "type": ["null", "int"]},
//!     {"name": "company", "type": {"type": "record", "name": "Org", "fields": []}}
//! ]}
//! ```

use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while reading a schema definition
#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    /// The text is not valid JSON
    #[error("Invalid schema JSON: {0}")]
    InvalidJson(String),

    /// A type name the record model does not support
    #[error("Unsupported schema type '{0}'")]
    UnsupportedType(String),

    /// A structural element is missing or has the wrong JSON type
    #[error("Malformed schema: {0}")]
    Malformed(String),

    /// Two fields of one record share a name
    #[error("Duplicate field '{field}' in record '{record}'")]
    DuplicateField { record: String, field: String },

    /// A value was supplied for a field the schema does not declare
    #[error("Record '{record}' has no field '{field}'")]
    UnknownField { record: String, field: String },

    /// A decoded value does not fit the declared schema
    #[error("Field '{field}': expected {expected}, found {found}")]
    ValueMismatch {
        field: String,
        expected: String,
        found: String,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema of a single value
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Array(Box<Schema>),
    Record(Arc<RecordSchema>),
    Union(Vec<Schema>),
}

/// A named record with fields in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<SchemaField>,
}

/// One field of a record schema
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub schema: Schema,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        SchemaField {
            name: name.into(),
            schema,
        }
    }
}

impl RecordSchema {
    /// Create a record schema, rejecting duplicate field names
    pub fn new(name: impl Into<String>, fields: Vec<SchemaField>) -> SchemaResult<Self> {
        let name = name.into();
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    record: name,
                    field: field.name.clone(),
                });
            }
        }
        Ok(RecordSchema { name, fields })
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in declaration order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl Schema {
    /// Shorthand for a record schema wrapped in `Arc`
    pub fn record(name: impl Into<String>, fields: Vec<SchemaField>) -> SchemaResult<Self> {
        Ok(Schema::Record(Arc::new(RecordSchema::new(name, fields)?)))
    }

    /// Shorthand for `["null", inner]`
    pub fn nullable(inner: Schema) -> Self {
        Schema::Union(vec![Schema::Null, inner])
    }

    /// Shorthand for an array of `items`
    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// True for the non-structural leaf types
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Schema::Null
                | Schema::Boolean
                | Schema::Int
                | Schema::Long
                | Schema::Float
                | Schema::Double
                | Schema::String
        )
    }

    /// Get the record schema if this is a record
    pub fn as_record(&self) -> Option<&Arc<RecordSchema>> {
        match self {
            Schema::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Type name as used in the JSON form
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::String => "string",
            Schema::Array(_) => "array",
            Schema::Record(_) => "record",
            Schema::Union(_) => "union",
        }
    }

    /// Parse a schema from its JSON text
    pub fn parse_json(text: &str) -> SchemaResult<Self> {
        let json: JsonValue =
            serde_json::from_str(text).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Build a schema from an already decoded JSON value
    pub fn from_json(json: &JsonValue) -> SchemaResult<Self> {
        match json {
            JsonValue::String(name) => Self::from_type_name(name),
            JsonValue::Array(members) => {
                let members = members
                    .iter()
                    .map(Self::from_json)
                    .collect::<SchemaResult<Vec<_>>>()?;
                Ok(Schema::Union(members))
            }
            JsonValue::Object(obj) => {
                let type_name = obj
                    .get("type")
                    .ok_or_else(|| SchemaError::Malformed("object schema without 'type'".into()))?;
                match type_name.as_str() {
                    Some("record") => {
                        let name = obj
                            .get("name")
                            .and_then(JsonValue::as_str)
                            .ok_or_else(|| SchemaError::Malformed("record without 'name'".into()))?;
                        let fields = obj
                            .get("fields")
                            .and_then(JsonValue::as_array)
                            .ok_or_else(|| {
                                SchemaError::Malformed(format!("record '{}' without 'fields'", name))
                            })?;
                        let mut parsed = Vec::with_capacity(fields.len());
                        for field in fields {
                            let field_name = field
                                .get("name")
                                .and_then(JsonValue::as_str)
                                .ok_or_else(|| {
                                    SchemaError::Malformed(format!("field without 'name' in '{}'", name))
                                })?;
                            let field_type = field.get("type").ok_or_else(|| {
                                SchemaError::Malformed(format!("field '{}' without 'type'", field_name))
                            })?;
                            parsed.push(SchemaField::new(field_name, Self::from_json(field_type)?));
                        }
                        Schema::record(name, parsed)
                    }
                    Some("array") => {
                        let items = obj
                            .get("items")
                            .ok_or_else(|| SchemaError::Malformed("array without 'items'".into()))?;
                        Ok(Schema::array(Self::from_json(items)?))
                    }
                    // {"type": "string"} and friends
                    _ => Self::from_json(type_name),
                }
            }
            other => Err(SchemaError::Malformed(format!("unexpected schema node: {}", other))),
        }
    }

    fn from_type_name(name: &str) -> SchemaResult<Self> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "float" => Ok(Schema::Float),
            "double" => Ok(Schema::Double),
            "string" => Ok(Schema::String),
            other => Err(SchemaError::UnsupportedType(other.to_string())),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Array(items) => write!(f, "array<{}>", items),
            Schema::Record(r) => write!(f, "record<{}>", r.name),
            Schema::Union(members) => {
                write!(f, "union<")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, ">")
            }
            simple => write!(f, "{}", simple.type_name()),
        }
    }
}
