use xlang_api::{FunctionId, XlangError};

use crate::host::LifecycleState;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Registration of a name missing from the declared-components table.
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// Operation against an id that was never issued or was torn down.
    #[error("unknown instance: {0}")]
    UnknownInstance(String),

    #[error("unknown function: {0}")]
    UnknownFunction(FunctionId),

    /// Lifecycle call out of order.
    #[error("instance {instance} is {state}, cannot {operation}")]
    InvalidState {
        instance: String,
        state: LifecycleState,
        operation: &'static str,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] XlangError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Api`, context is added to the inner `XlangError`.
    /// For `Config`, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Api(e) => EngineError::Api(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
