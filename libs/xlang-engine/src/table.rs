//! Declared-components table.
//!
//! Built once at process start from each component module's declarations,
//! then shared read-only by the registry and the per-record callback adapter.

use std::collections::BTreeMap;
use std::fmt;

use xlang_api::config::undeclared_fields;
use xlang_api::{ConfigProperty, Configurable, FunctionId, RowTransformFunction, Transform, TransformShape};

use crate::error::{EngineError, Result};

type ComponentCtor = Box<dyn Fn() -> Transform + Send + Sync>;
type FunctionCtor = Box<dyn Fn() -> Box<dyn RowTransformFunction> + Send + Sync>;

/// What the orchestrator's UI shows for a declared component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDescriptor {
    pub name: String,
    pub description: String,
    pub shape: TransformShape,
    pub input_tags: Vec<String>,
    pub output_tags: Vec<String>,
    pub properties: Vec<ConfigProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub id: FunctionId,
    pub name: String,
}

struct DeclaredComponent {
    descriptor: ComponentDescriptor,
    ctor: ComponentCtor,
}

struct DeclaredFunction {
    descriptor: FunctionDescriptor,
    ctor: FunctionCtor,
}

/// Name → component constructor and id → function constructor.
pub struct ComponentTable {
    components: BTreeMap<String, DeclaredComponent>,
    functions: BTreeMap<FunctionId, DeclaredFunction>,
}

impl fmt::Debug for ComponentTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTable")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentTable {
    pub fn builder() -> ComponentTableBuilder {
        ComponentTableBuilder::default()
    }

    /// Fresh, unconfigured instance of the component declared as `name`.
    pub fn construct(&self, name: &str) -> Result<Transform> {
        self.components
            .get(name)
            .map(|c| (c.ctor)())
            .ok_or_else(|| EngineError::UnknownComponent(name.to_string()))
    }

    /// Fresh instance of the per-record function declared under `id`.
    pub fn instantiate_function(&self, id: FunctionId) -> Result<Box<dyn RowTransformFunction>> {
        self.functions
            .get(&id)
            .map(|f| (f.ctor)())
            .ok_or(EngineError::UnknownFunction(id))
    }

    pub fn describe(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.get(name).map(|c| &c.descriptor)
    }

    pub fn function(&self, id: FunctionId) -> Option<&FunctionDescriptor> {
        self.functions.get(&id).map(|f| &f.descriptor)
    }

    /// Declared components, ordered by name.
    pub fn components(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components.values().map(|c| &c.descriptor)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values().map(|f| &f.descriptor)
    }
}

/// Collects declarations; each component module contributes through it.
#[derive(Default)]
pub struct ComponentTableBuilder {
    components: BTreeMap<String, DeclaredComponent>,
    functions: BTreeMap<FunctionId, DeclaredFunction>,
}

impl ComponentTableBuilder {
    /// Declare a component under its display `name`.
    ///
    /// A probe instance is built once to capture the descriptor. Bindings
    /// that name a field the component does not expose are logged here and
    /// left to fail softly at injection time.
    pub fn component<F>(mut self, name: &str, description: &str, ctor: F) -> Self
    where
        F: Fn() -> Transform + Send + Sync + 'static,
    {
        let probe = ctor();
        for field in undeclared_fields(&probe) {
            tracing::warn!(component = %name, field = %field, "declared config field is not exposed by component");
        }
        let descriptor = ComponentDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            shape: probe.shape(),
            input_tags: probe.input_tags(),
            output_tags: probe.output_tags(),
            properties: probe.config_properties(),
        };
        if self.components.contains_key(name) {
            tracing::warn!(component = %name, "component declared twice, keeping the later declaration");
        }
        self.components.insert(
            name.to_string(),
            DeclaredComponent {
                descriptor,
                ctor: Box::new(ctor),
            },
        );
        self
    }

    /// Declare a per-record function under its fixed `id`.
    pub fn function<F, T>(mut self, id: FunctionId, name: &str, ctor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: RowTransformFunction + 'static,
    {
        if self.functions.contains_key(&id) {
            tracing::warn!(function = %id, name = %name, "function declared twice, keeping the later declaration");
        }
        self.functions.insert(
            id,
            DeclaredFunction {
                descriptor: FunctionDescriptor {
                    id,
                    name: name.to_string(),
                },
                ctor: Box::new(move || Box::new(ctor()) as Box<dyn RowTransformFunction>),
            },
        );
        self
    }

    pub fn build(self) -> ComponentTable {
        tracing::debug!(
            components = self.components.len(),
            functions = self.functions.len(),
            "component table built"
        );
        ComponentTable {
            components: self.components,
            functions: self.functions,
        }
    }
}
