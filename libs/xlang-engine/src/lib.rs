//! Host side of the transform bridge: the declared-components table, the
//! component registry and dispatcher the orchestrator calls into, and the
//! per-record callback adapter.

pub mod callback;
pub mod config;
pub mod error;
pub mod host;
pub mod plan;
pub mod table;

pub use callback::RecordCallback;
pub use config::{HostConfig, PlanConfig};
pub use error::{EngineError, Result};
pub use host::{ComponentHost, LifecycleState};
pub use plan::{DetachedOrchestrator, PlanReport, plan};
pub use table::{ComponentDescriptor, ComponentTable, ComponentTableBuilder, FunctionDescriptor};
