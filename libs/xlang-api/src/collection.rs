//! Handles to collections that live in the orchestrator process.
//!
//! Nothing here holds row data. Every bulk operation is forwarded through
//! [`OrchestratorClient`] and its result wrapped in a new handle.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::codec;
use crate::config::ConfigDocument;
use crate::error::{Result, XlangError};
use crate::function::FunctionId;
use crate::schema::Schema;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque orchestrator-side reference to a row collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef(String);

impl CollectionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque orchestrator-side reference to a tagged collection tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleRef(String);

impl TupleRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TupleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the orchestrator needs to attach a per-record function to a
/// collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    /// Step name shown in the orchestrator's pipeline graph.
    pub description: String,
    pub function_id: FunctionId,
    /// Configuration handed to the function's `init_from_driver`, as JSON text.
    pub config: String,
    /// Encoded schema descriptor of the rows the function emits.
    pub output_schema: ConfigDocument,
}

/// Call-forwarding client for the orchestrator side of the bridge.
///
/// Implemented by the bridge; this layer never caches or mutates remote state.
pub trait OrchestratorClient: Send + Sync {
    /// Encoded schema descriptor of a collection.
    fn collection_schema(
        &self,
        collection: CollectionRef,
    ) -> BoxFuture<'_, Result<ConfigDocument>>;

    /// Apply a registered per-record function, returning the output collection.
    fn apply_transform(
        &self,
        collection: CollectionRef,
        request: TransformRequest,
    ) -> BoxFuture<'_, Result<CollectionRef>>;

    /// Members of a tuple, as (tag, collection) pairs.
    fn tuple_members(&self, tuple: TupleRef) -> BoxFuture<'_, Result<Vec<(String, CollectionRef)>>>;

    /// Build a new tuple from (tag, collection) pairs.
    fn create_tuple(&self, members: Vec<(String, CollectionRef)>) -> BoxFuture<'_, Result<TupleRef>>;
}

/// A collection handle bound to the connection it came from.
#[derive(Clone)]
pub struct RemoteCollection {
    handle: CollectionRef,
    client: Arc<dyn OrchestratorClient>,
}

impl fmt::Debug for RemoteCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCollection")
            .field("handle", &self.handle)
            .finish()
    }
}

impl RemoteCollection {
    pub fn new(handle: CollectionRef, client: Arc<dyn OrchestratorClient>) -> Self {
        Self { handle, client }
    }

    pub fn handle(&self) -> &CollectionRef {
        &self.handle
    }

    /// Fetch and decode the collection's schema.
    pub async fn schema(&self) -> Result<Schema> {
        let descriptor = self.client.collection_schema(self.handle.clone()).await?;
        codec::decode_schema(&descriptor)
    }

    /// Attach the per-record function `function_id` to this collection.
    ///
    /// `output_schema` describes the rows the function emits; `config` reaches
    /// the function through `init_from_driver`.
    pub async fn apply(
        &self,
        description: &str,
        function_id: FunctionId,
        output_schema: &Schema,
        config: &ConfigDocument,
    ) -> Result<RemoteCollection> {
        let request = TransformRequest {
            description: description.to_string(),
            function_id,
            config: config.to_string(),
            output_schema: codec::encode_schema(output_schema),
        };
        let handle = self
            .client
            .apply_transform(self.handle.clone(), request)
            .await?;
        Ok(RemoteCollection::new(handle, self.client.clone()))
    }
}

/// Tag-keyed set of remote collections at a transform boundary.
#[derive(Debug, Clone, Default)]
pub struct RemoteCollectionTuple {
    members: BTreeMap<String, RemoteCollection>,
}

impl RemoteCollectionTuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-member tuple.
    pub fn of(tag: impl Into<String>, collection: RemoteCollection) -> Self {
        let mut tuple = Self::new();
        tuple.add(tag, collection);
        tuple
    }

    /// Resolve a tuple handle into its members.
    pub async fn fetch(client: Arc<dyn OrchestratorClient>, tuple: TupleRef) -> Result<Self> {
        let members = client.tuple_members(tuple).await?;
        let mut out = Self::new();
        for (tag, handle) in members {
            out.add(tag, RemoteCollection::new(handle, client.clone()));
        }
        Ok(out)
    }

    /// Ask the orchestrator to build a tuple handle from these members.
    pub async fn publish(self, client: &dyn OrchestratorClient) -> Result<TupleRef> {
        let members = self
            .members
            .into_iter()
            .map(|(tag, collection)| (tag, collection.handle))
            .collect();
        client.create_tuple(members).await
    }

    /// Insert `collection` under `tag`, replacing any previous member.
    pub fn add(&mut self, tag: impl Into<String>, collection: RemoteCollection) -> Option<RemoteCollection> {
        self.members.insert(tag.into(), collection)
    }

    pub fn get(&self, tag: &str) -> Result<&RemoteCollection> {
        self.members
            .get(tag)
            .ok_or_else(|| XlangError::UnknownTag(tag.to_string()))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemoteCollection)> {
        self.members.iter().map(|(tag, c)| (tag.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The only member, or an arity error.
    pub fn into_single(self) -> Result<(String, RemoteCollection)> {
        let actual = self.members.len();
        let mut members = self.members.into_iter();
        match (members.next(), members.next()) {
            (Some(member), None) => Ok(member),
            _ => Err(XlangError::Arity { expected: 1, actual }),
        }
    }
}
