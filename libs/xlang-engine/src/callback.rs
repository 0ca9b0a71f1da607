use xlang_api::codec::{row_from_str, row_to_string};
use xlang_api::{ConfigDocument, FunctionId, RowTransformFunction, XlangError};

use crate::error::Result;
use crate::table::ComponentTable;

/// Per-record entry point handed to the orchestrator.
///
/// Wraps one declared [`RowTransformFunction`] and speaks wire strings: JSON
/// configuration text in, row envelopes in and out.
pub struct RecordCallback {
    function_id: FunctionId,
    function: Box<dyn RowTransformFunction>,
    initialized: bool,
}

impl std::fmt::Debug for RecordCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCallback")
            .field("function_id", &self.function_id)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl RecordCallback {
    /// Instantiate the function declared under `function_id`.
    pub fn new(table: &ComponentTable, function_id: FunctionId) -> Result<Self> {
        let function = table.instantiate_function(function_id)?;
        Ok(Self {
            function_id,
            function,
            initialized: false,
        })
    }

    pub fn function_id(&self) -> FunctionId {
        self.function_id
    }

    /// Hand the configuration given at transform creation to the function.
    /// Blank text is an empty document.
    pub fn init_from_driver(&mut self, config: &str) -> Result<()> {
        let doc: ConfigDocument = if config.trim().is_empty() {
            ConfigDocument::Object(Default::default())
        } else {
            serde_json::from_str(config).map_err(|e| XlangError::from(e).with_context("config"))?
        };
        self.function.init_from_driver(&doc)?;
        self.initialized = true;
        tracing::debug!(function = %self.function_id, "function initialized from driver");
        Ok(())
    }

    pub fn on_bundle_start(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.function.on_bundle_start()?;
        Ok(())
    }

    /// Decode one row envelope, apply the function, encode every output row.
    pub fn apply(&mut self, row: &str) -> Result<Vec<String>> {
        self.ensure_initialized()?;
        let input = row_from_str(row)?;
        let outputs = self.function.apply(input)?;
        let encoded = outputs
            .iter()
            .map(row_to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(encoded)
    }

    pub fn on_bundle_end(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.function.on_bundle_end()?;
        Ok(())
    }

    pub fn on_teardown(&mut self) -> Result<()> {
        self.function.on_teardown()?;
        tracing::debug!(function = %self.function_id, "function torn down");
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(XlangError::component(format!(
                "function {} used before init_from_driver",
                self.function_id
            ))
            .into())
        }
    }
}
