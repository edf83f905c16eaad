//! Field shape classification
//!
//! Every field of a record schema is classified exactly once into a
//! [`FieldShape`]. Nullable unions are resolved to their single non-null
//! member before classification; everything downstream (identity lookup,
//! property rendering, match generation) works off the resulting
//! [`RecordLayout`] and never inspects raw schema tags again.

use super::{CompileError, CompileResult};
use crate::record::{FieldValue, Record, RecordSchema, Schema};
use std::sync::Arc;

/// Scalar leaf types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl ScalarType {
    fn from_schema(schema: &Schema) -> Option<Self> {
        match schema {
            Schema::Boolean => Some(ScalarType::Boolean),
            Schema::Int => Some(ScalarType::Int),
            Schema::Long => Some(ScalarType::Long),
            Schema::Float => Some(ScalarType::Float),
            Schema::Double => Some(ScalarType::Double),
            Schema::String => Some(ScalarType::String),
            _ => None,
        }
    }

    /// Whether a runtime value can be stored under this type.
    ///
    /// Integer widths are interchangeable, as are float widths.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (ScalarType::Boolean, FieldValue::Boolean(_))
                | (ScalarType::Int | ScalarType::Long, FieldValue::Int(_) | FieldValue::Long(_))
                | (ScalarType::Float | ScalarType::Double, FieldValue::Float(_) | FieldValue::Double(_))
                | (ScalarType::String, FieldValue::String(_))
        )
    }

    /// Strings are quoted, everything else renders bare
    pub fn is_quoted(&self) -> bool {
        matches!(self, ScalarType::String)
    }
}

/// What a field holds once nullability is peeled off
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// A single scalar, rendered as a node property
    Scalar(ScalarType),
    /// An array of scalars, rendered as a list property
    ScalarList(ScalarType),
    /// A nested record, matched as a related node
    Nested(Arc<RecordSchema>),
    /// An array of records, each matched as a related node
    NestedList(Arc<RecordSchema>),
}

/// Classified shape of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    pub kind: ShapeKind,
    /// The field itself may be null
    pub nullable: bool,
    /// Array elements may be null (only meaningful for list kinds)
    pub nullable_items: bool,
}

impl FieldShape {
    /// True for nested records and arrays of records
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, ShapeKind::Nested(_) | ShapeKind::NestedList(_))
    }

    /// Check that `value` agrees with this shape
    pub fn check(&self, field: &str, value: &FieldValue) -> CompileResult<()> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err(inconsistent(field, "null value in a non-nullable field"))
            };
        }

        match (&self.kind, value) {
            (ShapeKind::Scalar(t), v) if t.accepts(v) => Ok(()),
            (ShapeKind::Nested(_), FieldValue::Record(_)) => Ok(()),
            (ShapeKind::ScalarList(t), FieldValue::Array(items)) => {
                for item in items {
                    if item.is_null() {
                        if !self.nullable_items {
                            return Err(inconsistent(field, "null element in a non-nullable array"));
                        }
                    } else if !t.accepts(item) {
                        return Err(mismatch(field, &format!("array of {:?}", t), item));
                    }
                }
                Ok(())
            }
            (ShapeKind::NestedList(_), FieldValue::Array(items)) => {
                for item in items {
                    match item {
                        FieldValue::Record(_) => {}
                        FieldValue::Null if self.nullable_items => {}
                        other => return Err(mismatch(field, "array of records", other)),
                    }
                }
                Ok(())
            }
            (kind, v) => Err(mismatch(field, &describe(kind), v)),
        }
    }
}

/// A field name paired with its shape
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedField {
    pub name: String,
    pub shape: FieldShape,
}

/// Shapes of all fields of one record schema, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    fields: Vec<ClassifiedField>,
}

impl RecordLayout {
    /// Classify every field of `schema`
    pub fn classify(schema: &RecordSchema) -> CompileResult<Self> {
        let fields = schema
            .fields
            .iter()
            .map(|field| {
                Ok(ClassifiedField {
                    name: field.name.clone(),
                    shape: classify_field(&field.name, &field.schema)?,
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(RecordLayout { fields })
    }

    pub fn fields(&self) -> &[ClassifiedField] {
        &self.fields
    }

    pub fn shape(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.shape)
    }

    /// Names of nested-record and array-of-record fields
    pub fn structural_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.shape.is_structural())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Pair every classified field with its value, checking consistency
    pub fn bind<'r>(&'r self, record: &'r Record) -> CompileResult<Vec<(&'r ClassifiedField, &'r FieldValue)>> {
        self.fields
            .iter()
            .map(|field| {
                let value = record.get(&field.name).ok_or_else(|| {
                    inconsistent(&field.name, "field missing from record")
                })?;
                field.shape.check(&field.name, value)?;
                Ok((field, value))
            })
            .collect()
    }

    /// Check a related record's values, naming fields as `path.field`
    pub fn check_nested(&self, record: &Record, path: &str) -> CompileResult<()> {
        self.bind(record).map(|_| ()).map_err(|err| match err {
            CompileError::SchemaInconsistency { field, reason } => CompileError::SchemaInconsistency {
                field: format!("{}.{}", path, field),
                reason,
            },
            other => other,
        })
    }
}

/// Classify one field schema
pub fn classify_field(field: &str, schema: &Schema) -> CompileResult<FieldShape> {
    let (resolved, nullable) = strip_null(field, schema)?;

    if let Some(t) = ScalarType::from_schema(resolved) {
        return Ok(FieldShape {
            kind: ShapeKind::Scalar(t),
            nullable,
            nullable_items: false,
        });
    }

    match resolved {
        Schema::Record(r) => Ok(FieldShape {
            kind: ShapeKind::Nested(Arc::clone(r)),
            nullable,
            nullable_items: false,
        }),
        Schema::Array(items) => {
            let (item, nullable_items) = strip_null(field, items)?;
            let kind = if let Some(t) = ScalarType::from_schema(item) {
                ShapeKind::ScalarList(t)
            } else if let Schema::Record(r) = item {
                ShapeKind::NestedList(Arc::clone(r))
            } else {
                return Err(inconsistent(field, &format!("unsupported array items {}", item)));
            };
            Ok(FieldShape {
                kind,
                nullable,
                nullable_items,
            })
        }
        other => Err(inconsistent(field, &format!("unsupported schema {}", other))),
    }
}

/// Resolve `["null", T]` to `(T, true)` and plain `T` to `(T, false)`
fn strip_null<'s>(field: &str, schema: &'s Schema) -> CompileResult<(&'s Schema, bool)> {
    match schema {
        Schema::Union(members) => {
            let nullable = members.iter().any(|m| *m == Schema::Null);
            let mut non_null = members.iter().filter(|m| **m != Schema::Null);
            match (non_null.next(), non_null.next()) {
                (Some(single), None) => {
                    if matches!(single, Schema::Union(_)) {
                        return Err(inconsistent(field, "nested union"));
                    }
                    Ok((single, nullable))
                }
                (None, _) => Err(inconsistent(field, "union without a non-null member")),
                (Some(_), Some(_)) => Err(inconsistent(
                    field,
                    &format!("union with several non-null members {}", schema),
                )),
            }
        }
        Schema::Null => Err(inconsistent(field, "field typed as null")),
        other => Ok((other, false)),
    }
}

fn describe(kind: &ShapeKind) -> String {
    match kind {
        ShapeKind::Scalar(t) => format!("{:?}", t),
        ShapeKind::ScalarList(t) => format!("array of {:?}", t),
        ShapeKind::Nested(r) => format!("record {}", r.name),
        ShapeKind::NestedList(r) => format!("array of record {}", r.name),
    }
}

fn mismatch(field: &str, expected: &str, found: &FieldValue) -> CompileError {
    inconsistent(field, &format!("expected {}, found {}", expected, found.type_name()))
}

fn inconsistent(field: &str, reason: &str) -> CompileError {
    CompileError::SchemaInconsistency {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
