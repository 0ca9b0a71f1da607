use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XlangError};
use crate::schema::TypeName;

/// Parsed, arbitrarily nested configuration document.
pub type ConfigDocument = serde_json::Value;

/// Declared shape of a configuration value. Descriptive only: injection
/// converts through serde, this is what the orchestrator's UI shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigType {
    Scalar(TypeName),
    Collection(Box<ConfigType>),
    Map(Box<ConfigType>, Box<ConfigType>),
    /// A structured value, named by its type (e.g. `InputColumn`).
    Object(String),
    Any,
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigType::Scalar(name) => write!(f, "{name}"),
            ConfigType::Collection(element) => write!(f, "COLLECTION<{element}>"),
            ConfigType::Map(key, value) => write!(f, "MAP<{key}, {value}>"),
            ConfigType::Object(name) => f.write_str(name),
            ConfigType::Any => f.write_str("ANY"),
        }
    }
}

/// Maps a Rust field type to its [`ConfigType`]. Used by `#[derive(Configurable)]`.
pub trait ConfigTypeOf {
    fn config_type() -> ConfigType;
}

macro_rules! scalar_config_type {
    ($($ty:ty => $name:ident),* $(,)?) => {
        $(impl ConfigTypeOf for $ty {
            fn config_type() -> ConfigType {
                ConfigType::Scalar(TypeName::$name)
            }
        })*
    };
}

scalar_config_type!(
    String => String,
    bool => Boolean,
    i8 => Byte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float,
    f64 => Double,
);

impl<T: ConfigTypeOf> ConfigTypeOf for Option<T> {
    fn config_type() -> ConfigType {
        T::config_type()
    }
}

impl<T: ConfigTypeOf> ConfigTypeOf for Vec<T> {
    fn config_type() -> ConfigType {
        ConfigType::Collection(Box::new(T::config_type()))
    }
}

impl<T: ConfigTypeOf> ConfigTypeOf for HashMap<String, T> {
    fn config_type() -> ConfigType {
        ConfigType::Map(Box::new(String::config_type()), Box::new(T::config_type()))
    }
}

impl<T: ConfigTypeOf> ConfigTypeOf for BTreeMap<String, T> {
    fn config_type() -> ConfigType {
        ConfigType::Map(Box::new(String::config_type()), Box::new(T::config_type()))
    }
}

impl ConfigTypeOf for serde_json::Value {
    fn config_type() -> ConfigType {
        ConfigType::Any
    }
}

/// Reference to a column of one of the component's input collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputColumn {
    pub source_tag: String,
    pub source_column_name: String,
}

impl ConfigTypeOf for InputColumn {
    fn config_type() -> ConfigType {
        ConfigType::Object("InputColumn".to_string())
    }
}

/// One declared binding: configuration `path` (dotted) → component `field`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigProperty {
    pub field: String,
    pub path: String,
    pub description: String,
    pub config_type: ConfigType,
}

/// A component that receives configuration through declared bindings.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Default, Configurable)]
/// struct Tokenizer {
///     #[config(path = "input.column", description = "Column holding the text")]
///     column: String,
/// }
/// ```
pub trait Configurable {
    /// Bindings this component declares.
    fn config_properties(&self) -> Vec<ConfigProperty>;

    /// Whether `field` exists and can be assigned.
    fn has_config_field(&self, field: &str) -> bool;

    /// Assign a resolved configuration node to `field`.
    fn set_config_field(&mut self, field: &str, value: &ConfigDocument) -> Result<()>;
}

/// Deserialize a configuration node into a typed field value.
pub fn from_config_value<T: DeserializeOwned>(field: &str, value: &ConfigDocument) -> Result<T> {
    T::deserialize(value).map_err(|e| XlangError::codec(field, e.to_string()))
}

/// Walk `doc` along the dot-separated `path`.
///
/// `None` if a segment is missing, a node on the way is not a mapping, or the
/// reached node is `null`.
pub fn resolve_path<'a>(doc: &'a ConfigDocument, path: &str) -> Option<&'a ConfigDocument> {
    let mut node = doc;
    for segment in path.split('.') {
        node = node.as_object()?.get(segment)?;
        if node.is_null() {
            return None;
        }
    }
    Some(node)
}

/// Apply every declared binding of `target` that resolves in `doc`.
///
/// Best-effort: unresolved paths leave the field at its default, and values
/// that cannot be converted to the field type are logged and skipped.
/// Returns the number of fields assigned.
pub fn inject_config<C: Configurable + ?Sized>(target: &mut C, doc: &ConfigDocument) -> usize {
    let mut applied = 0;
    for property in target.config_properties() {
        let Some(node) = resolve_path(doc, &property.path) else {
            tracing::trace!(field = %property.field, path = %property.path, "config path not present");
            continue;
        };
        match target.set_config_field(&property.field, node) {
            Ok(()) => applied += 1,
            Err(e) => tracing::warn!(
                field = %property.field,
                path = %property.path,
                error = %e,
                "config value not applied"
            ),
        }
    }
    applied
}

/// Declared bindings whose target field the component does not expose.
pub fn undeclared_fields<C: Configurable + ?Sized>(target: &C) -> Vec<String> {
    target
        .config_properties()
        .into_iter()
        .filter(|p| !target.has_config_field(&p.field))
        .map(|p| p.field)
        .collect()
}
