//! Component contract and the four transform shapes.
//!
//! A component implements [`TransformBase`] plus exactly one shape trait and
//! is wrapped in the matching [`Transform`] variant. The variant owns the
//! arity rules: single-input shapes reject tuples that do not hold exactly
//! one collection, single-output shapes wrap their result under the declared
//! output tag.

use std::collections::HashMap;
use std::fmt;

use crate::collection::{BoxFuture, RemoteCollection, RemoteCollectionTuple};
use crate::config::{ConfigDocument, ConfigProperty, Configurable};
use crate::error::Result;
use crate::schema::Schema;

/// Lifecycle and schema negotiation shared by every shape.
pub trait TransformBase: Configurable + Send + Sync {
    /// Called once after registration and configuration.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once before the instance is dropped.
    fn teardown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Columns the component needs on `input_tag`. `None` means no
    /// constraint, which is not the same as an empty schema.
    fn required_columns(&self, input_tag: &str) -> Option<Schema> {
        let _ = input_tag;
        None
    }

    /// Output schema per output tag, from the input schema per input tag.
    ///
    /// Must be pure: the orchestrator calls it while building the pipeline
    /// graph, before any data flows.
    fn calculate_output_schema(
        &self,
        input_schemas: &HashMap<String, Schema>,
    ) -> Result<HashMap<String, Schema>>;
}

/// One input collection in, one output collection out.
pub trait OneToOneTransform: TransformBase {
    fn input_tag(&self) -> String;

    fn output_tag(&self) -> String;

    fn expand_collection(&self, input: RemoteCollection) -> BoxFuture<'_, Result<RemoteCollection>>;
}

/// One input collection in, a tagged tuple out.
pub trait OneToManyTransform: TransformBase {
    fn input_tag(&self) -> String;

    fn output_tags(&self) -> Vec<String>;

    fn expand_collection(
        &self,
        input: RemoteCollection,
    ) -> BoxFuture<'_, Result<RemoteCollectionTuple>>;
}

/// A tagged tuple reduced to one output collection.
pub trait ManyToOneTransform: TransformBase {
    fn input_tags(&self) -> Vec<String>;

    fn output_tag(&self) -> String;

    fn reduce(&self, input: RemoteCollectionTuple) -> BoxFuture<'_, Result<RemoteCollection>>;
}

/// Tuple in, tuple out, no arity constraint.
pub trait GenericTransform: TransformBase {
    fn input_tags(&self) -> Vec<String>;

    fn output_tags(&self) -> Vec<String>;

    fn expand(&self, input: RemoteCollectionTuple) -> BoxFuture<'_, Result<RemoteCollectionTuple>>;
}

/// Name of a transform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformShape {
    OneToOne,
    OneToMany,
    ManyToOne,
    Generic,
}

impl fmt::Display for TransformShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformShape::OneToOne => "one-to-one",
            TransformShape::OneToMany => "one-to-many",
            TransformShape::ManyToOne => "many-to-one",
            TransformShape::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// A live component instance, tagged with its shape.
pub enum Transform {
    OneToOne(Box<dyn OneToOneTransform>),
    OneToMany(Box<dyn OneToManyTransform>),
    ManyToOne(Box<dyn ManyToOneTransform>),
    Generic(Box<dyn GenericTransform>),
}

macro_rules! each_shape {
    ($self:expr, $t:ident => $body:expr) => {
        match $self {
            Transform::OneToOne($t) => $body,
            Transform::OneToMany($t) => $body,
            Transform::ManyToOne($t) => $body,
            Transform::Generic($t) => $body,
        }
    };
}

impl Transform {
    pub fn one_to_one(t: impl OneToOneTransform + 'static) -> Self {
        Transform::OneToOne(Box::new(t))
    }

    pub fn one_to_many(t: impl OneToManyTransform + 'static) -> Self {
        Transform::OneToMany(Box::new(t))
    }

    pub fn many_to_one(t: impl ManyToOneTransform + 'static) -> Self {
        Transform::ManyToOne(Box::new(t))
    }

    pub fn generic(t: impl GenericTransform + 'static) -> Self {
        Transform::Generic(Box::new(t))
    }

    pub fn shape(&self) -> TransformShape {
        match self {
            Transform::OneToOne(_) => TransformShape::OneToOne,
            Transform::OneToMany(_) => TransformShape::OneToMany,
            Transform::ManyToOne(_) => TransformShape::ManyToOne,
            Transform::Generic(_) => TransformShape::Generic,
        }
    }

    pub fn init(&mut self) -> Result<()> {
        each_shape!(self, t => t.init())
    }

    pub fn teardown(&mut self) -> Result<()> {
        each_shape!(self, t => t.teardown())
    }

    pub fn input_tags(&self) -> Vec<String> {
        match self {
            Transform::OneToOne(t) => vec![t.input_tag()],
            Transform::OneToMany(t) => vec![t.input_tag()],
            Transform::ManyToOne(t) => t.input_tags(),
            Transform::Generic(t) => t.input_tags(),
        }
    }

    pub fn output_tags(&self) -> Vec<String> {
        match self {
            Transform::OneToOne(t) => vec![t.output_tag()],
            Transform::OneToMany(t) => t.output_tags(),
            Transform::ManyToOne(t) => vec![t.output_tag()],
            Transform::Generic(t) => t.output_tags(),
        }
    }

    pub fn required_columns(&self, input_tag: &str) -> Option<Schema> {
        each_shape!(self, t => t.required_columns(input_tag))
    }

    pub fn calculate_output_schema(
        &self,
        input_schemas: &HashMap<String, Schema>,
    ) -> Result<HashMap<String, Schema>> {
        each_shape!(self, t => t.calculate_output_schema(input_schemas))
    }

    /// Run the component's transform over `input`, applying the shape's
    /// arity rules. Either the whole transform succeeds or an error is
    /// returned and no output tuple exists.
    pub async fn expand(&self, input: RemoteCollectionTuple) -> Result<RemoteCollectionTuple> {
        match self {
            Transform::OneToOne(t) => {
                let (_, collection) = input.into_single()?;
                let output = t.expand_collection(collection).await?;
                Ok(RemoteCollectionTuple::of(t.output_tag(), output))
            }
            Transform::OneToMany(t) => {
                let (_, collection) = input.into_single()?;
                t.expand_collection(collection).await
            }
            Transform::ManyToOne(t) => {
                let output = t.reduce(input).await?;
                Ok(RemoteCollectionTuple::of(t.output_tag(), output))
            }
            Transform::Generic(t) => t.expand(input).await,
        }
    }
}

impl Configurable for Transform {
    fn config_properties(&self) -> Vec<ConfigProperty> {
        each_shape!(self, t => t.config_properties())
    }

    fn has_config_field(&self, field: &str) -> bool {
        each_shape!(self, t => t.has_config_field(field))
    }

    fn set_config_field(&mut self, field: &str, value: &ConfigDocument) -> Result<()> {
        each_shape!(self, t => t.set_config_field(field, value))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("shape", &self.shape())
            .field("input_tags", &self.input_tags())
            .field("output_tags", &self.output_tags())
            .finish()
    }
}
