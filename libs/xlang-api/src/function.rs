use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::config::ConfigDocument;
use crate::error::Result;
use crate::value::Row;

/// Identifier of a declared per-record function.
///
/// Fixed at authoring time so that the orchestrator can ask for the same
/// function again in every worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(Uuid);

impl FunctionId {
    #[must_use]
    pub const fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn parse(s: &str) -> std::result::Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FunctionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Per-record callback, invoked by the orchestrator during execution.
///
/// The orchestrator drives the lifecycle: `init_from_driver` once, then
/// bundles of `apply` calls framed by `on_bundle_start`/`on_bundle_end`,
/// and finally `on_teardown`.
pub trait RowTransformFunction: Send {
    /// Receive the configuration given to [`crate::RemoteCollection::apply`].
    fn init_from_driver(&mut self, config: &ConfigDocument) -> Result<()>;

    fn on_bundle_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Transform one input row into zero or more output rows.
    fn apply(&mut self, row: Row) -> Result<Vec<Row>>;

    fn on_bundle_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_teardown(&mut self) -> Result<()> {
        Ok(())
    }
}
