//! Shared test helpers: an in-memory orchestrator that records every call.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::json;
use xlang_api::codec::encode_schema;
use xlang_api::{
    BoxFuture, CollectionRef, ConfigDocument, OrchestratorClient, RemoteCollection,
    RemoteCollectionTuple, Result, Schema, TransformRequest, TupleRef, XlangError,
};

#[derive(Default)]
struct State {
    next_id: u64,
    schemas: HashMap<String, ConfigDocument>,
    tuples: HashMap<String, Vec<(String, CollectionRef)>>,
    requests: Vec<(CollectionRef, TransformRequest)>,
}

/// Orchestrator stand-in. Collections are only schema descriptors.
#[derive(Default)]
pub struct RecordingClient {
    state: Mutex<State>,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a source collection with `schema`.
    pub fn source(self: &Arc<Self>, schema: &Schema) -> RemoteCollection {
        let mut state = self.state.lock().unwrap();
        let handle = next_handle(&mut state, "pc");
        state.schemas.insert(handle.to_string(), encode_schema(schema));
        RemoteCollection::new(handle, self.clone())
    }

    pub fn requests(&self) -> Vec<(CollectionRef, TransformRequest)> {
        self.state.lock().unwrap().requests.clone()
    }
}

fn next_handle(state: &mut State, prefix: &str) -> CollectionRef {
    state.next_id += 1;
    CollectionRef::new(format!("{prefix}-{}", state.next_id))
}

impl OrchestratorClient for RecordingClient {
    fn collection_schema(&self, collection: CollectionRef) -> BoxFuture<'_, Result<ConfigDocument>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            state
                .schemas
                .get(collection.as_str())
                .cloned()
                .ok_or_else(|| XlangError::component(format!("no collection {collection}")))
        })
    }

    fn apply_transform(
        &self,
        collection: CollectionRef,
        request: TransformRequest,
    ) -> BoxFuture<'_, Result<CollectionRef>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let handle = next_handle(&mut state, "pc");
            state
                .schemas
                .insert(handle.to_string(), request.output_schema.clone());
            state.requests.push((collection, request));
            Ok(handle)
        })
    }

    fn tuple_members(&self, tuple: TupleRef) -> BoxFuture<'_, Result<Vec<(String, CollectionRef)>>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            state
                .tuples
                .get(tuple.as_str())
                .cloned()
                .ok_or_else(|| XlangError::component(format!("no tuple {tuple}")))
        })
    }

    fn create_tuple(&self, members: Vec<(String, CollectionRef)>) -> BoxFuture<'_, Result<TupleRef>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let tuple = TupleRef::new(format!("tuple-{}", state.next_id));
            state.tuples.insert(tuple.to_string(), members);
            Ok(tuple)
        })
    }
}

/// Tuple of fresh source collections, one per tag, all with `schema`.
pub fn tuple_of(client: &Arc<RecordingClient>, tags: &[&str], schema: &Schema) -> RemoteCollectionTuple {
    let mut tuple = RemoteCollectionTuple::new();
    for tag in tags {
        tuple.add(*tag, client.source(schema));
    }
    tuple
}

pub fn empty_config() -> ConfigDocument {
    json!({})
}
