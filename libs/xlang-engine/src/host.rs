//! Component registry and transform dispatcher.
//!
//! The orchestrator drives every instance through
//! `register → init → (metadata | expand)* → teardown`. Each call is
//! checked against the instance's [`LifecycleState`] so misuse surfaces as
//! a named error.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use uuid::Uuid;
use xlang_api::codec::{decode_schema, encode_schema};
use xlang_api::{
    ConfigDocument, OrchestratorClient, RemoteCollectionTuple, Schema, Transform, TupleRef,
    inject_config,
};

use crate::error::{EngineError, Result};
use crate::table::ComponentTable;

/// Per-instance lifecycle position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Initialized,
    TornDown,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Constructed => "constructed",
            LifecycleState::Initialized => "initialized",
            LifecycleState::TornDown => "torn down",
        };
        f.write_str(name)
    }
}

const CONSTRUCTED_OR_INITIALIZED: &[LifecycleState] =
    &[LifecycleState::Constructed, LifecycleState::Initialized];

struct Instance {
    component: String,
    state: LifecycleState,
    transform: Transform,
}

impl Instance {
    fn require(&self, id: &str, operation: &'static str, allowed: &[LifecycleState]) -> Result<()> {
        if self.state == LifecycleState::TornDown {
            return Err(EngineError::UnknownInstance(id.to_string()));
        }
        if !allowed.contains(&self.state) {
            return Err(EngineError::InvalidState {
                instance: id.to_string(),
                state: self.state,
                operation,
            });
        }
        Ok(())
    }
}

type InstanceSlot = Arc<Mutex<Instance>>;

/// Live component instances bound to one orchestrator connection.
///
/// The id map is guarded by a read-write lock held only for map access;
/// each instance has its own async mutex so a long `expand` on one
/// instance does not block calls on another.
pub struct ComponentHost {
    table: Arc<ComponentTable>,
    client: Arc<dyn OrchestratorClient>,
    instances: RwLock<HashMap<String, InstanceSlot>>,
}

impl fmt::Debug for ComponentHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHost")
            .field("table", &self.table)
            .field("instances", &self.instance_count())
            .finish()
    }
}

impl ComponentHost {
    pub fn new(table: Arc<ComponentTable>, client: Arc<dyn OrchestratorClient>) -> Self {
        Self {
            table,
            client,
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &ComponentTable {
        &self.table
    }

    fn read_instances(&self) -> RwLockReadGuard<'_, HashMap<String, InstanceSlot>> {
        match self.instances.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("instance registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_instances(&self) -> RwLockWriteGuard<'_, HashMap<String, InstanceSlot>> {
        match self.instances.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("instance registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn lookup(&self, id: &str) -> Result<InstanceSlot> {
        self.read_instances()
            .get(&id.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| EngineError::UnknownInstance(id.to_string()))
    }

    pub fn instance_count(&self) -> usize {
        self.read_instances().len()
    }

    /// Current lifecycle state of a live instance.
    pub async fn state(&self, id: &str) -> Result<LifecycleState> {
        let slot = self.lookup(id)?;
        let instance = slot.lock().await;
        instance.require(id, "query state", CONSTRUCTED_OR_INITIALIZED)?;
        Ok(instance.state)
    }

    /// Instantiate the component declared as `name`, apply `config` to it
    /// and return the new instance id.
    pub fn register(&self, name: &str, config: Option<&ConfigDocument>) -> Result<String> {
        let mut transform = self.table.construct(name)?;
        if let Some(doc) = config {
            let applied = inject_config(&mut transform, doc);
            tracing::debug!(component = %name, applied, "configuration injected");
        }

        let id = Uuid::new_v4().to_string();
        let instance = Instance {
            component: name.to_string(),
            state: LifecycleState::Constructed,
            transform,
        };
        self.write_instances()
            .insert(id.clone(), Arc::new(Mutex::new(instance)));
        tracing::info!(instance = %id, component = %name, "registered component");
        Ok(id)
    }

    pub async fn init(&self, id: &str) -> Result<()> {
        let slot = self.lookup(id)?;
        let mut instance = slot.lock().await;
        instance.require(id, "init", &[LifecycleState::Constructed])?;
        instance
            .transform
            .init()
            .map_err(|e| EngineError::from(e).with_context(&instance.component))?;
        instance.state = LifecycleState::Initialized;
        tracing::info!(instance = %id, component = %instance.component, "initialized component");
        Ok(())
    }

    pub async fn input_tags(&self, id: &str) -> Result<Vec<String>> {
        let slot = self.lookup(id)?;
        let instance = slot.lock().await;
        instance.require(id, "get input tags", CONSTRUCTED_OR_INITIALIZED)?;
        Ok(instance.transform.input_tags())
    }

    pub async fn output_tags(&self, id: &str) -> Result<Vec<String>> {
        let slot = self.lookup(id)?;
        let instance = slot.lock().await;
        instance.require(id, "get output tags", CONSTRUCTED_OR_INITIALIZED)?;
        Ok(instance.transform.output_tags())
    }

    /// Encoded columns the instance needs on `tag`; `None` means no constraint.
    pub async fn required_columns(&self, id: &str, tag: &str) -> Result<Option<ConfigDocument>> {
        let slot = self.lookup(id)?;
        let instance = slot.lock().await;
        instance.require(id, "get required columns", CONSTRUCTED_OR_INITIALIZED)?;
        Ok(instance
            .transform
            .required_columns(tag)
            .map(|schema| encode_schema(&schema)))
    }

    /// Negotiate output schemas from encoded input schemas.
    ///
    /// Touches neither the orchestrator nor the registry, so it may run
    /// before any data exists.
    pub async fn output_schema(
        &self,
        id: &str,
        input_schemas: &HashMap<String, ConfigDocument>,
    ) -> Result<HashMap<String, ConfigDocument>> {
        let slot = self.lookup(id)?;
        let instance = slot.lock().await;
        instance.require(id, "get output schema", CONSTRUCTED_OR_INITIALIZED)?;

        let mut decoded: HashMap<String, Schema> = HashMap::with_capacity(input_schemas.len());
        for (tag, descriptor) in input_schemas {
            let schema = decode_schema(descriptor).map_err(|e| e.with_context(tag))?;
            decoded.insert(tag.clone(), schema);
        }

        let outputs = instance
            .transform
            .calculate_output_schema(&decoded)
            .map_err(|e| EngineError::from(e).with_context(&instance.component))?;
        Ok(outputs
            .into_iter()
            .map(|(tag, schema)| {
                let encoded = encode_schema(&schema);
                (tag, encoded)
            })
            .collect())
    }

    /// Run the instance's transform over the orchestrator tuple `input` and
    /// return the handle of the output tuple.
    pub async fn expand(&self, id: &str, input: TupleRef) -> Result<TupleRef> {
        let slot = self.lookup(id)?;
        let instance = slot.lock().await;
        instance.require(id, "expand", &[LifecycleState::Initialized])?;

        tracing::debug!(
            instance = %id,
            component = %instance.component,
            shape = %instance.transform.shape(),
            tuple = %input,
            "expanding"
        );
        let tuple = RemoteCollectionTuple::fetch(self.client.clone(), input).await?;
        let output = instance
            .transform
            .expand(tuple)
            .await
            .map_err(|e| EngineError::from(e).with_context(&instance.component))?;
        let handle = output.publish(self.client.as_ref()).await?;
        tracing::debug!(instance = %id, tuple = %handle, "expand complete");
        Ok(handle)
    }

    /// Run the teardown hook and drop the instance.
    ///
    /// The entry leaves the map before the hook runs; a caller that looked it
    /// up earlier sees `TornDown` once it gets the lock. The entry is gone
    /// even if the hook fails.
    pub async fn teardown(&self, id: &str) -> Result<()> {
        let key = id.to_ascii_lowercase();
        let slot = self
            .write_instances()
            .remove(&key)
            .ok_or_else(|| EngineError::UnknownInstance(id.to_string()))?;

        let mut instance = slot.lock().await;
        instance.require(id, "teardown", CONSTRUCTED_OR_INITIALIZED)?;
        instance.state = LifecycleState::TornDown;
        let result = instance
            .transform
            .teardown()
            .map_err(|e| EngineError::from(e).with_context(&instance.component));
        tracing::info!(instance = %id, component = %instance.component, "tore down component");
        result
    }
}
