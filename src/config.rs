//! Sink configuration
//!
//! Configuration is authored once (YAML or JSON), validated against the
//! input schema, then flattened into string settings handed to the
//! execution stage:
//!
//! ```yaml
//! reference_name: people_sink
//! connection:
//!   url: bolt://localhost:7687
//!   user: neo4j
//!   password: secret
//! relations: "WORKS_AT:>(company),MEMBER_OF:<(clubs)"
//! failure_policy: skip
//! ```
//!
//! Relations travel to the execution stage in wire form
//! (`company|>|WORKS_AT,clubs|<|MEMBER_OF`).

use crate::compiler::{
    decode_relations, encode_relations, parse_relations, CompileError, CompilerConfig, LiteralEscape, NullPolicy,
    RecordLayout, RelationParseError, RelationSpec,
};
use crate::record::RecordSchema;
use crate::service::{FailurePolicy, GraphRecordWriter};
use crate::session::GraphSession;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static REFERENCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("reference name pattern"));

static MACRO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{[^}]*\}").expect("macro pattern"));

/// Output configuration keys
pub mod keys {
    pub const REFERENCE_NAME: &str = "reference_name";
    pub const URL: &str = "url";
    pub const USER: &str = "user";
    pub const PASSWORD: &str = "password";
    pub const DATABASE: &str = "database";
    pub const RELATIONS: &str = "relations";
    pub const LABEL_FIELD: &str = "label_field";
    pub const KEY_FIELD: &str = "key_field";
    pub const NODE_ALIAS: &str = "node_alias";
    pub const ESCAPE: &str = "escape";
    pub const CREATE_NULLS: &str = "create_nulls";
    pub const FAILURE_POLICY: &str = "failure_policy";
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported configuration file type: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid reference name '{0}': use letters, digits, '_', '.' or '-'")]
    InvalidReferenceName(String),

    #[error("Unresolved macro in '{key}': {value}")]
    UnresolvedMacro { key: String, value: String },

    #[error("Invalid relations: {0}")]
    Relations(#[from] RelationParseError),

    /// The schema cannot be written to a graph, or a compiler setting is invalid
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Missing configuration key '{0}'")]
    Missing(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Graph database connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: Option<String>,
}

/// Sink configuration as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Name identifying this sink in lineage and logs
    pub reference_name: String,

    pub connection: ConnectionConfig,

    /// Relations in text form, e.g. `WORKS_AT:>(company)`
    #[serde(default)]
    pub relations: String,

    #[serde(flatten)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl SinkConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&text)?,
            Some("json") => Self::from_json(&text)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        debug!("Loaded sink configuration '{}' from {:?}", config.reference_name, path);
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check the configuration against the input schema and return the
    /// parsed relations.
    ///
    /// Macros must be expanded by the host before this runs.
    pub fn validate(&self, schema: &RecordSchema) -> ConfigResult<Vec<RelationSpec>> {
        if !REFERENCE_NAME.is_match(&self.reference_name) {
            return Err(ConfigError::InvalidReferenceName(self.reference_name.clone()));
        }
        if let Some(found) = MACRO.find(&self.relations) {
            return Err(ConfigError::UnresolvedMacro {
                key: keys::RELATIONS.to_string(),
                value: found.as_str().to_string(),
            });
        }

        self.compiler.validate()?;

        let layout = RecordLayout::classify(schema)?;
        Ok(parse_relations(&self.relations, &layout.structural_fields())?)
    }

    /// Flatten into the settings read by the execution stage
    pub fn output_configuration(&self, schema: &RecordSchema) -> ConfigResult<BTreeMap<String, String>> {
        let relations = self.validate(schema)?;

        let mut settings = BTreeMap::new();
        settings.insert(keys::REFERENCE_NAME.to_string(), self.reference_name.clone());
        settings.insert(keys::URL.to_string(), self.connection.url.clone());
        settings.insert(keys::USER.to_string(), self.connection.user.clone());
        settings.insert(keys::PASSWORD.to_string(), self.connection.password.clone());
        if let Some(database) = &self.connection.database {
            settings.insert(keys::DATABASE.to_string(), database.clone());
        }
        settings.insert(keys::RELATIONS.to_string(), encode_relations(&relations));
        settings.insert(keys::LABEL_FIELD.to_string(), self.compiler.label_field.clone());
        settings.insert(keys::KEY_FIELD.to_string(), self.compiler.key_field.clone());
        settings.insert(keys::NODE_ALIAS.to_string(), self.compiler.node_alias.clone());
        settings.insert(keys::ESCAPE.to_string(), variant_name(&self.compiler.escape)?);
        settings.insert(keys::CREATE_NULLS.to_string(), variant_name(&self.compiler.create_nulls)?);
        settings.insert(keys::FAILURE_POLICY.to_string(), variant_name(&self.failure_policy)?);
        Ok(settings)
    }
}

/// Settings restored on the execution side
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub reference_name: String,
    pub connection: ConnectionConfig,
    pub compiler: CompilerConfig,
    pub relations: Vec<RelationSpec>,
    pub failure_policy: FailurePolicy,
}

impl ExecutionConfig {
    pub fn from_output_configuration(settings: &BTreeMap<String, String>) -> ConfigResult<Self> {
        let required = |key: &str| {
            settings
                .get(key)
                .cloned()
                .ok_or_else(|| ConfigError::Missing(key.to_string()))
        };

        let defaults = CompilerConfig::default();
        let compiler = CompilerConfig {
            label_field: settings.get(keys::LABEL_FIELD).cloned().unwrap_or(defaults.label_field),
            key_field: settings.get(keys::KEY_FIELD).cloned().unwrap_or(defaults.key_field),
            node_alias: settings.get(keys::NODE_ALIAS).cloned().unwrap_or(defaults.node_alias),
            escape: optional_variant::<LiteralEscape>(settings, keys::ESCAPE)?.unwrap_or(defaults.escape),
            create_nulls: optional_variant::<NullPolicy>(settings, keys::CREATE_NULLS)?
                .unwrap_or(defaults.create_nulls),
        };
        compiler.validate()?;

        Ok(ExecutionConfig {
            reference_name: required(keys::REFERENCE_NAME)?,
            connection: ConnectionConfig {
                url: required(keys::URL)?,
                user: required(keys::USER)?,
                password: settings.get(keys::PASSWORD).cloned().unwrap_or_default(),
                database: settings.get(keys::DATABASE).cloned(),
            },
            compiler,
            relations: decode_relations(settings.get(keys::RELATIONS).map_or("", String::as_str))?,
            failure_policy: optional_variant(settings, keys::FAILURE_POLICY)?.unwrap_or_default(),
        })
    }

    /// Writer for this configuration on `session`
    pub fn writer<S: GraphSession>(&self, session: S) -> GraphRecordWriter<S> {
        GraphRecordWriter::new(
            session,
            self.compiler.clone(),
            self.relations.clone(),
            self.failure_policy,
        )
    }
}

/// Serialized name of a unit enum variant
fn variant_name<T: Serialize>(value: &T) -> ConfigResult<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(name) => Ok(name),
        other => Ok(other.to_string()),
    }
}

fn optional_variant<T: DeserializeOwned>(settings: &BTreeMap<String, String>, key: &str) -> ConfigResult<Option<T>> {
    settings
        .get(key)
        .map(|name| serde_json::from_value(serde_json::Value::String(name.clone())))
        .transpose()
        .map_err(ConfigError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Schema, SchemaField};

    fn schema() -> RecordSchema {
        let org = Schema::record("Org", vec![SchemaField::new("uid", Schema::String)]).unwrap();
        RecordSchema::new(
            "Person",
            vec![
                SchemaField::new("uid", Schema::String),
                SchemaField::new("company", Schema::nullable(org.clone())),
                SchemaField::new("clubs", Schema::array(org)),
            ],
        )
        .unwrap()
    }

    fn config(relations: &str) -> SinkConfig {
        SinkConfig {
            reference_name: "people_sink".to_string(),
            connection: ConnectionConfig {
                url: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: "secret".to_string(),
                database: None,
            },
            relations: relations.to_string(),
            compiler: CompilerConfig::default(),
            failure_policy: FailurePolicy::Skip,
        }
    }

    #[test]
    fn test_yaml_defaults() {
        let config = SinkConfig::from_yaml(
            "reference_name: s1\nconnection:\n  url: bolt://db\n  user: neo4j\nkey_field: id\n",
        )
        .unwrap();
        assert_eq!(config.compiler.key_field, "id");
        assert_eq!(config.compiler.label_field, "type");
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.relations.is_empty());
    }

    #[test]
    fn test_validate() {
        let relations = config("WORKS_AT:>(company), MEMBER_OF:<(clubs)").validate(&schema()).unwrap();
        assert_eq!(relations.len(), 2);

        let err = config("LIVES_AT:>(uid)").validate(&schema()).unwrap_err();
        assert!(matches!(err, ConfigError::Relations(RelationParseError::UnknownTarget { .. })));
    }

    #[test]
    fn test_reference_name_and_macros() {
        let mut bad = config("");
        bad.reference_name = "people sink".to_string();
        assert!(matches!(bad.validate(&schema()), Err(ConfigError::InvalidReferenceName(_))));

        let err = config("${relations}").validate(&schema()).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedMacro { ref value, .. } if value == "${relations}"));
    }

    #[test]
    fn test_output_configuration_round_trip() {
        let config = config("WORKS_AT:>(company),MEMBER_OF:<(clubs)");
        let settings = config.output_configuration(&schema()).unwrap();
        assert_eq!(settings[keys::RELATIONS], "company|>|WORKS_AT,clubs|<|MEMBER_OF");
        assert_eq!(settings[keys::FAILURE_POLICY], "skip");

        let restored = ExecutionConfig::from_output_configuration(&settings).unwrap();
        assert_eq!(restored.relations, config.validate(&schema()).unwrap());
        assert_eq!(restored.compiler, config.compiler);
        assert_eq!(restored.failure_policy, FailurePolicy::Skip);
        assert_eq!(restored.connection, config.connection);
    }

    #[test]
    fn test_missing_setting() {
        let err = ExecutionConfig::from_output_configuration(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref key) if key == keys::REFERENCE_NAME));
    }

    #[test]
    fn test_node_alias_survives_round_trip() {
        let mut config = config("WORKS_AT:>(company)");
        config.compiler.node_alias = "node".to_string();

        let settings = config.output_configuration(&schema()).unwrap();
        assert_eq!(settings[keys::NODE_ALIAS], "node");
        let restored = ExecutionConfig::from_output_configuration(&settings).unwrap();
        assert_eq!(restored.compiler.node_alias, "node");
        assert_eq!(restored.compiler, config.compiler);
    }

    #[test]
    fn test_node_alias_validated() {
        let mut sink = config("WORKS_AT:>(company)");
        sink.compiler.node_alias = "a1".to_string();
        let err = sink.validate(&schema()).unwrap_err();
        assert!(matches!(err, ConfigError::Compile(CompileError::InvalidSetting { .. })));

        let mut settings = config("").output_configuration(&schema()).unwrap();
        settings.insert(keys::NODE_ALIAS.to_string(), "a2".to_string());
        assert!(matches!(
            ExecutionConfig::from_output_configuration(&settings),
            Err(ConfigError::Compile(_))
        ));
    }
}
