//! Shared test helpers: an in-memory orchestrator and a few small components.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use xlang_api::codec::encode_schema;
use xlang_api::{
    BoxFuture, CollectionRef, ConfigDocument, Configurable, FieldType, FunctionId,
    OneToManyTransform, OneToOneTransform, OrchestratorClient, RemoteCollection,
    RemoteCollectionTuple, Result, Row, RowTransformFunction, Schema, SchemaField, Transform,
    TransformBase, TransformRequest, TupleRef, Value, XlangError,
};
use xlang_engine::ComponentTable;

pub const MEASURE_FN: FunctionId = FunctionId::from_u128(0x3b8e_51c2_0f4d_4a61_b7e9_52d0_c4a1_9e07);

// ── Fake orchestrator ─────────────────────────────────────────────

#[derive(Default)]
struct State {
    next_id: u64,
    schemas: HashMap<String, ConfigDocument>,
    tuples: HashMap<String, Vec<(String, CollectionRef)>>,
    requests: Vec<TransformRequest>,
}

/// Orchestrator stand-in. Collections exist only as schema descriptors.
#[derive(Default)]
pub struct FakeOrchestrator {
    state: Mutex<State>,
}

impl FakeOrchestrator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a tuple of fresh collections, one per `(tag, schema)`.
    pub fn tuple(&self, members: &[(&str, &Schema)]) -> TupleRef {
        let mut state = self.state.lock().unwrap();
        let mut refs = Vec::with_capacity(members.len());
        for (tag, schema) in members {
            state.next_id += 1;
            let handle = CollectionRef::new(format!("pc-{}", state.next_id));
            state.schemas.insert(handle.to_string(), encode_schema(schema));
            refs.push((tag.to_string(), handle));
        }
        state.next_id += 1;
        let tuple = TupleRef::new(format!("tuple-{}", state.next_id));
        state.tuples.insert(tuple.to_string(), refs);
        tuple
    }

    pub fn members(&self, tuple: &TupleRef) -> Vec<(String, CollectionRef)> {
        self.state.lock().unwrap().tuples[tuple.as_str()].clone()
    }

    pub fn schema_of(&self, collection: &CollectionRef) -> ConfigDocument {
        self.state.lock().unwrap().schemas[collection.as_str()].clone()
    }

    pub fn requests(&self) -> Vec<TransformRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn tuple_count(&self) -> usize {
        self.state.lock().unwrap().tuples.len()
    }
}

impl OrchestratorClient for FakeOrchestrator {
    fn collection_schema(&self, collection: CollectionRef) -> BoxFuture<'_, Result<ConfigDocument>> {
        Box::pin(async move {
            self.state
                .lock()
                .unwrap()
                .schemas
                .get(collection.as_str())
                .cloned()
                .ok_or_else(|| XlangError::component(format!("no collection {collection}")))
        })
    }

    fn apply_transform(
        &self,
        _collection: CollectionRef,
        request: TransformRequest,
    ) -> BoxFuture<'_, Result<CollectionRef>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let handle = CollectionRef::new(format!("pc-{}", state.next_id));
            state
                .schemas
                .insert(handle.to_string(), request.output_schema.clone());
            state.requests.push(request);
            Ok(handle)
        })
    }

    fn tuple_members(&self, tuple: TupleRef) -> BoxFuture<'_, Result<Vec<(String, CollectionRef)>>> {
        Box::pin(async move {
            self.state
                .lock()
                .unwrap()
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

// ── Components ────────────────────────────────────────────────────

/// Lifecycle hook calls, shared between a test and the instances it creates.
pub type Events = Arc<Mutex<Vec<String>>>;

/// Appends the length of `input_col` as INT32 `output_col`.
#[derive(Default, Configurable)]
pub struct Measure {
    #[config(path = "input_col", description = "Column to measure")]
    pub input_col: String,

    #[config(path = "output.column", description = "Column receiving the length")]
    pub output_col: String,

    pub events: Events,
}

impl Measure {
    fn output_schema(&self, input: &Schema) -> Result<Schema> {
        input.with_field(SchemaField::new(self.output_col.clone(), FieldType::Int32))
    }
}

impl TransformBase for Measure {
    fn init(&mut self) -> Result<()> {
        self.events.lock().unwrap().push("init".into());
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.events.lock().unwrap().push("teardown".into());
        Ok(())
    }

    fn required_columns(&self, input_tag: &str) -> Option<Schema> {
        if input_tag != "*" {
            return None;
        }
        Schema::builder()
            .field(self.input_col.clone(), FieldType::String)
            .build()
            .ok()
    }

    fn calculate_output_schema(
        &self,
        input_schemas: &HashMap<String, Schema>,
    ) -> Result<HashMap<String, Schema>> {
        let input = input_schemas
            .get("*")
            .ok_or_else(|| XlangError::UnknownTag("*".into()))?;
        Ok(HashMap::from([("measured".to_string(), self.output_schema(input)?)]))
    }
}

impl OneToOneTransform for Measure {
    fn input_tag(&self) -> String {
        "*".into()
    }

    fn output_tag(&self) -> String {
        "measured".into()
    }

    fn expand_collection(&self, input: RemoteCollection) -> BoxFuture<'_, Result<RemoteCollection>> {
        Box::pin(async move {
            let schema = self.output_schema(&input.schema().await?)?;
            let config = serde_json::json!({
                "input_col": self.input_col,
                "output_col": self.output_col,
            });
            input.apply("Measure", MEASURE_FN, &schema, &config).await
        })
    }
}

/// Routes its input to two tags.
#[derive(Default, Configurable)]
pub struct Fanout;

impl TransformBase for Fanout {
    fn calculate_output_schema(
        &self,
        input_schemas: &HashMap<String, Schema>,
    ) -> Result<HashMap<String, Schema>> {
        let input = input_schemas.get("in").cloned().unwrap_or_default();
        Ok(HashMap::from([
            ("even".to_string(), input.clone()),
            ("odd".to_string(), input),
        ]))
    }
}

impl OneToManyTransform for Fanout {
    fn input_tag(&self) -> String {
        "in".into()
    }

    fn output_tags(&self) -> Vec<String> {
        vec!["even".into(), "odd".into()]
    }

    fn expand_collection(
        &self,
        input: RemoteCollection,
    ) -> BoxFuture<'_, Result<RemoteCollectionTuple>> {
        Box::pin(async move {
            let mut out = RemoteCollectionTuple::new();
            out.add("even", input.clone());
            out.add("odd", input);
            Ok(out)
        })
    }
}

/// Fails its init hook.
#[derive(Default, Configurable)]
pub struct Broken;

impl TransformBase for Broken {
    fn init(&mut self) -> Result<()> {
        Err(XlangError::component("model file missing"))
    }

    fn calculate_output_schema(
        &self,
        _input_schemas: &HashMap<String, Schema>,
    ) -> Result<HashMap<String, Schema>> {
        Ok(HashMap::new())
    }
}

impl OneToOneTransform for Broken {
    fn input_tag(&self) -> String {
        "in".into()
    }

    fn output_tag(&self) -> String {
        "out".into()
    }

    fn expand_collection(&self, input: RemoteCollection) -> BoxFuture<'_, Result<RemoteCollection>> {
        Box::pin(async move { Ok(input) })
    }
}

/// Per-record counterpart of [`Measure`].
#[derive(Default)]
pub struct MeasureFn {
    input_col: String,
    output_col: String,
    pub bundles: usize,
}

impl RowTransformFunction for MeasureFn {
    fn init_from_driver(&mut self, config: &ConfigDocument) -> Result<()> {
        self.input_col = xlang_api::config::from_config_value("input_col", &config["input_col"])?;
        self.output_col = xlang_api::config::from_config_value("output_col", &config["output_col"])?;
        Ok(())
    }

    fn on_bundle_start(&mut self) -> Result<()> {
        self.bundles += 1;
        Ok(())
    }

    fn apply(&mut self, row: Row) -> Result<Vec<Row>> {
        let len = match row.get(&self.input_col)? {
            Value::String(s) => Value::Int32(s.chars().count() as i32),
            _ => Value::Null,
        };
        let schema = row
            .schema()
            .with_field(SchemaField::new(self.output_col.clone(), FieldType::Int32))?;
        let mut values = row.into_values();
        values.push(len);
        Ok(vec![Row::new(Arc::new(schema), values)?])
    }
}

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

/// Table with `Measure`, `Fanout`, `Broken` and `MeasureFn` declared.
pub fn table(events: &Events) -> Arc<ComponentTable> {
    let events = events.clone();
    Arc::new(
        ComponentTable::builder()
            .component("Measure", "Column length", move || {
                Transform::one_to_one(Measure {
                    events: events.clone(),
                    ..Measure::default()
                })
            })
            .component("Fanout", "Two-way split", || Transform::one_to_many(Fanout))
            .component("Broken", "Init always fails", || Transform::one_to_one(Broken))
            .function(MEASURE_FN, "MeasureFn", MeasureFn::default)
            .build(),
    )
}

pub fn text_schema() -> Schema {
    Schema::builder().field("text", FieldType::String).build().unwrap()
}
