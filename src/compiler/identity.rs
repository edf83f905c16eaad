//! Node identity extraction
//!
//! A record is addressable in the graph through its label (taken from a
//! metadata field and lower-cased) and a unique key property.

use super::{CompileError, CompileResult};
use crate::record::{FieldValue, Record};

/// Label plus unique key of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Lower-cased graph label
    pub label: String,
    /// Name of the key property
    pub key_field: String,
    /// Key value; never null or empty
    pub key_value: FieldValue,
}

/// Reads identities off records using configured field names
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'c> {
    label_field: &'c str,
    key_field: &'c str,
}

impl<'c> IdentityResolver<'c> {
    pub fn new(label_field: &'c str, key_field: &'c str) -> Self {
        Self {
            label_field,
            key_field,
        }
    }

    /// Name of the metadata field holding the label
    pub fn label_field(&self) -> &'c str {
        self.label_field
    }

    /// Extract the identity, or `None` when the label or key is absent
    pub fn resolve(&self, record: &Record) -> Option<Identity> {
        let label = match record.get(self.label_field)? {
            FieldValue::String(s) if !s.trim().is_empty() => s.trim().to_lowercase(),
            _ => return None,
        };

        let key_value = match record.get(self.key_field)? {
            v @ (FieldValue::String(_) | FieldValue::Int(_) | FieldValue::Long(_)) if !v.is_blank() => {
                v.clone()
            }
            _ => return None,
        };

        Some(Identity {
            label,
            key_field: self.key_field.to_string(),
            key_value,
        })
    }

    /// Extract the identity or fail with `MissingIdentity`.
    ///
    /// `path` names the record in error messages (`"root"`, `"company"`,
    /// `"clubs[2]"`).
    pub fn require(&self, record: &Record, path: &str) -> CompileResult<Identity> {
        self.resolve(record).ok_or_else(|| {
            let missing = if self.resolve_label_only(record) {
                self.key_field
            } else {
                self.label_field
            };
            CompileError::MissingIdentity {
                record: path.to_string(),
                field: missing.to_string(),
            }
        })
    }

    fn resolve_label_only(&self, record: &Record) -> bool {
        matches!(record.get(self.label_field), Some(FieldValue::String(s)) if !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordSchema, Schema, SchemaField};
    use std::sync::Arc;

    fn schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::new(
                "Org",
                vec![
                    SchemaField::new("type", Schema::nullable(Schema::String)),
                    SchemaField::new("uid", Schema::nullable(Schema::String)),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_resolve_identity() {
        let record = Record::builder(schema())
            .set("type", "Org")
            .set("uid", "o1")
            .build()
            .unwrap();

        let identity = IdentityResolver::new("type", "uid").resolve(&record).unwrap();
        assert_eq!(identity.label, "org");
        assert_eq!(identity.key_field, "uid");
        assert_eq!(identity.key_value, FieldValue::from("o1"));
    }

    #[test]
    fn test_missing_key() {
        let record = Record::builder(schema()).set("type", "Org").set("uid", "").build().unwrap();
        let resolver = IdentityResolver::new("type", "uid");

        assert!(resolver.resolve(&record).is_none());
        assert_eq!(
            resolver.require(&record, "company").unwrap_err(),
            CompileError::MissingIdentity {
                record: "company".to_string(),
                field: "uid".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_label() {
        let record = Record::builder(schema()).set("uid", "o1").build().unwrap();
        let err = IdentityResolver::new("type", "uid").require(&record, "root").unwrap_err();
        assert!(matches!(err, CompileError::MissingIdentity { ref field, .. } if field == "type"));
    }

    #[test]
    fn test_unknown_fields_mean_no_identity() {
        let record = Record::builder(schema()).set("type", "Org").set("uid", "o1").build().unwrap();
        assert!(IdentityResolver::new("metadata", "uid").resolve(&record).is_none());
    }
}
