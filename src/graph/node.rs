//! Graph nodes

use super::property::{PropertyMap, PropertyValue};
use super::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A labeled node with properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    pub labels: BTreeSet<String>,

    /// Never holds `Null`: setting a property to null removes it
    pub properties: PropertyMap,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Node {
    pub fn new(id: NodeId, labels: impl IntoIterator<Item = String>, properties: PropertyMap) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let properties = properties.into_iter().filter(|(_, v)| !v.is_null()).collect();

        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Set a property; `Null` removes it. Returns the previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        let key = key.into();
        let old = if value.is_null() {
            self.properties.remove(&key)
        } else {
            self.properties.insert(key, value)
        };
        self.updated_at = chrono::Utc::now().timestamp_millis();
        old
    }

    /// Whether every label and property of a pattern holds on this node
    pub fn matches(&self, labels: &[String], properties: &PropertyMap) -> bool {
        labels.iter().all(|l| self.has_label(l))
            && properties
                .iter()
                .all(|(k, v)| self.get_property(k).map_or(false, |actual| actual.matches(v)))
    }
}
