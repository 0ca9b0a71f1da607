//! Offline schema negotiation.
//!
//! Drives a component through the metadata half of its lifecycle without an
//! orchestrator, so component authors can check tags and output schemas
//! from a config file.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use xlang_api::{
    BoxFuture, CollectionRef, ConfigDocument, OrchestratorClient, TransformRequest, TupleRef,
    XlangError,
};

use crate::config::PlanConfig;
use crate::error::Result;
use crate::host::ComponentHost;
use crate::table::ComponentTable;

/// Client for a host with no orchestrator attached. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedOrchestrator;

fn detached<T>(operation: &str) -> xlang_api::Result<T> {
    Err(XlangError::component(format!(
        "no orchestrator attached, cannot {operation}"
    )))
}

impl OrchestratorClient for DetachedOrchestrator {
    fn collection_schema(
        &self,
        _collection: CollectionRef,
    ) -> BoxFuture<'_, xlang_api::Result<ConfigDocument>> {
        Box::pin(async { detached("fetch a collection schema") })
    }

    fn apply_transform(
        &self,
        _collection: CollectionRef,
        _request: TransformRequest,
    ) -> BoxFuture<'_, xlang_api::Result<CollectionRef>> {
        Box::pin(async { detached("apply a transform") })
    }

    fn tuple_members(
        &self,
        _tuple: TupleRef,
    ) -> BoxFuture<'_, xlang_api::Result<Vec<(String, CollectionRef)>>> {
        Box::pin(async { detached("resolve a collection tuple") })
    }

    fn create_tuple(
        &self,
        _members: Vec<(String, CollectionRef)>,
    ) -> BoxFuture<'_, xlang_api::Result<TupleRef>> {
        Box::pin(async { detached("create a collection tuple") })
    }
}

impl ComponentHost {
    /// Host bound to [`DetachedOrchestrator`].
    pub fn detached(table: Arc<ComponentTable>) -> Self {
        Self::new(table, Arc::new(DetachedOrchestrator))
    }
}

/// Outcome of one offline negotiation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub component: String,
    pub shape: String,
    pub input_tags: Vec<String>,
    pub output_tags: Vec<String>,
    /// Input tag → encoded required columns, `null` for no constraint.
    pub required_columns: BTreeMap<String, Option<ConfigDocument>>,
    /// Output tag → encoded schema.
    pub output_schemas: BTreeMap<String, ConfigDocument>,
}

/// Register, init, query and tear down one component on `host`.
///
/// The instance is torn down even when a step fails; the first error wins.
pub async fn plan(host: &ComponentHost, plan: &PlanConfig) -> Result<PlanReport> {
    let config = plan.config_document();
    let id = host.register(&plan.component, config.as_ref())?;

    let report = negotiate(host, &id, plan).await;
    let teardown = host.teardown(&id).await;
    let report = report?;
    teardown?;
    Ok(report)
}

async fn negotiate(host: &ComponentHost, id: &str, plan: &PlanConfig) -> Result<PlanReport> {
    host.init(id).await?;
    let input_tags = host.input_tags(id).await?;
    let output_tags = host.output_tags(id).await?;

    let mut required_columns = BTreeMap::new();
    for tag in &input_tags {
        required_columns.insert(tag.clone(), host.required_columns(id, tag).await?);
    }

    let output_schemas = host
        .output_schema(id, &plan.input_descriptors())
        .await?
        .into_iter()
        .collect();

    let shape = host
        .table()
        .describe(&plan.component)
        .map(|d| d.shape.to_string())
        .unwrap_or_default();

    tracing::info!(
        component = %plan.component,
        outputs = output_tags.len(),
        "plan negotiated"
    );
    Ok(PlanReport {
        component: plan.component.clone(),
        shape,
        input_tags,
        output_tags,
        required_columns,
        output_schemas,
    })
}
