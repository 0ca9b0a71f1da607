use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Number, Value as Json};
use xlang_api::ConfigDocument;

use crate::error::{EngineError, Result};

/// Root host configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Offline schema negotiations to run.
    #[serde(default, rename = "plan")]
    pub plans: Vec<PlanConfig>,
}

/// One component to register and negotiate schemas for.
///
/// ```toml
/// [[plan]]
/// component = "Word Count"
/// config = { input_col = "text", output_col = "len" }
///
/// [plan.input_schemas."*"]
/// text = "STRING"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    pub component: String,

    #[serde(default)]
    pub config: Option<toml::Value>,

    /// Input tag → schema descriptor, written as a TOML table.
    #[serde(default)]
    pub input_schemas: BTreeMap<String, toml::Value>,
}

impl PlanConfig {
    /// The component configuration as a JSON document.
    pub fn config_document(&self) -> Option<ConfigDocument> {
        self.config.as_ref().map(toml_to_json)
    }

    /// Input schema descriptors in wire form.
    pub fn input_descriptors(&self) -> HashMap<String, ConfigDocument> {
        self.input_schemas
            .iter()
            .map(|(tag, descriptor)| (tag.clone(), toml_to_json(descriptor)))
            .collect()
    }
}

impl HostConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Convert a TOML value into the equivalent JSON value.
///
/// Datetimes become their RFC 3339 text; non-finite floats become `null`.
pub fn toml_to_json(value: &toml::Value) -> Json {
    match value {
        toml::Value::String(s) => Json::String(s.clone()),
        toml::Value::Integer(i) => Json::from(*i),
        toml::Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        toml::Value::Boolean(b) => Json::Bool(*b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(items) => Json::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let mut map = Map::with_capacity(table.len());
            for (key, item) in table {
                map.insert(key.clone(), toml_to_json(item));
            }
            Json::Object(map)
        }
    }
}
