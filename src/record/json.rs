//! JSON record decoding
//!
//! One JSON object per record, as produced by the pipeline host or found in
//! a JSON-lines file. Absent keys decode to null; keys the schema does not
//! declare are rejected.

use super::schema::{RecordSchema, Schema, SchemaError, SchemaResult};
use super::value::{FieldValue, Record};
use serde_json::Value as JsonValue;
use std::sync::Arc;

impl Record {
    /// Decode a JSON object into a record of `schema`
    pub fn from_json(schema: Arc<RecordSchema>, json: &JsonValue) -> SchemaResult<Record> {
        let object = json.as_object().ok_or_else(|| SchemaError::ValueMismatch {
            field: schema.name.clone(),
            expected: "record".to_string(),
            found: json_type(json).to_string(),
        })?;

        let mut builder = Record::builder(Arc::clone(&schema));
        for (name, value) in object {
            let field = schema.field(name).ok_or_else(|| SchemaError::UnknownField {
                record: schema.name.clone(),
                field: name.clone(),
            })?;
            builder = builder.set(name.clone(), decode_value(name, &field.schema, value)?);
        }
        builder.build()
    }

    /// Decode a JSON object from text
    pub fn parse_json(schema: Arc<RecordSchema>, text: &str) -> SchemaResult<Record> {
        let json: JsonValue = serde_json::from_str(text).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        Self::from_json(schema, &json)
    }
}

fn decode_value(field: &str, schema: &Schema, json: &JsonValue) -> SchemaResult<FieldValue> {
    let mismatch = || SchemaError::ValueMismatch {
        field: field.to_string(),
        expected: schema.to_string(),
        found: json_type(json).to_string(),
    };

    match (schema, json) {
        (Schema::Null, JsonValue::Null) => Ok(FieldValue::Null),
        (Schema::Boolean, JsonValue::Bool(b)) => Ok(FieldValue::Boolean(*b)),
        (Schema::Int, JsonValue::Number(n)) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(FieldValue::Int)
            .ok_or_else(mismatch),
        (Schema::Long, JsonValue::Number(n)) => n.as_i64().map(FieldValue::Long).ok_or_else(mismatch),
        (Schema::Float, JsonValue::Number(n)) => n.as_f64().map(|f| FieldValue::Float(f as f32)).ok_or_else(mismatch),
        (Schema::Double, JsonValue::Number(n)) => n.as_f64().map(FieldValue::Double).ok_or_else(mismatch),
        (Schema::String, JsonValue::String(s)) => Ok(FieldValue::String(s.clone())),
        (Schema::Array(items), JsonValue::Array(values)) => values
            .iter()
            .enumerate()
            .map(|(i, v)| decode_value(&format!("{}[{}]", field, i), items, v))
            .collect::<SchemaResult<Vec<_>>>()
            .map(FieldValue::Array),
        (Schema::Record(record), JsonValue::Object(_)) => {
            Record::from_json(Arc::clone(record), json).map(FieldValue::Record)
        }
        (Schema::Union(members), JsonValue::Null) if members.contains(&Schema::Null) => Ok(FieldValue::Null),
        (Schema::Union(members), _) => members
            .iter()
            .filter(|m| **m != Schema::Null)
            .find_map(|m| decode_value(field, m, json).ok())
            .ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}

fn json_type(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
