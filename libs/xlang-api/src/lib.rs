//! Component-side half of the cross-process transform bridge.
//!
//! Components are authored against [`TransformBase`] and one of the shape
//! traits, receive configuration through [`Configurable`] bindings and work
//! on [`RemoteCollection`] handles whose rows never enter this process.
//! Schemas and rows cross the boundary as JSON through [`codec`].

extern crate self as xlang_api;

pub mod codec;
pub mod collection;
pub mod config;
pub mod error;
pub mod function;
pub mod schema;
pub mod transform;
pub mod value;

pub use collection::{
    BoxFuture, CollectionRef, OrchestratorClient, RemoteCollection, RemoteCollectionTuple,
    TransformRequest, TupleRef,
};
pub use config::{
    ConfigDocument, ConfigProperty, ConfigType, ConfigTypeOf, Configurable, InputColumn,
    inject_config,
};
pub use error::{Result, XlangError};
pub use function::{FunctionId, RowTransformFunction};
pub use schema::{FieldType, Schema, SchemaBuilder, SchemaField, TypeName};
pub use transform::{
    GenericTransform, ManyToOneTransform, OneToManyTransform, OneToOneTransform, Transform,
    TransformBase, TransformShape,
};
pub use value::{Row, Value};
pub use xlang_api_derive::Configurable;
