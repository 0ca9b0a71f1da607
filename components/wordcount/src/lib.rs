//! Word count: appends the character length of a text column.
//!
//! Declares the `Word Count` component and the per-record function it
//! attaches to its input collection.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use xlang_api::config::from_config_value;
use xlang_api::{
    BoxFuture, ConfigDocument, Configurable, FieldType, FunctionId, OneToOneTransform,
    RemoteCollection, Result, Row, RowTransformFunction, Schema, SchemaField, Transform,
    TransformBase, Value, XlangError,
};
use xlang_engine::ComponentTableBuilder;

pub const COMPONENT_NAME: &str = "Word Count";
pub const INPUT_TAG: &str = "*";
pub const OUTPUT_TAG: &str = "Word Counts";
pub const WORD_COUNT_FN: FunctionId = FunctionId::from_u128(0x9a4c_2e71_5b0d_4f38_a6c1_7e2f_d805_3b19);

/// Add this module's component and function to a table.
pub fn declare(builder: ComponentTableBuilder) -> ComponentTableBuilder {
    builder
        .component(
            COMPONENT_NAME,
            "Counts the characters of a text column",
            || Transform::one_to_one(WordCount::default()),
        )
        .function(WORD_COUNT_FN, "WordCountFn", WordCountFn::default)
}

#[derive(Debug, Default, Configurable)]
pub struct WordCount {
    #[config(path = "input_col", description = "Column holding the text to count")]
    pub input_col: String,

    #[config(path = "output_col", description = "INT32 column receiving the count")]
    pub output_col: String,
}

impl WordCount {
    fn widen(&self, input: &Schema) -> Result<Schema> {
        check_configured(&self.input_col, &self.output_col)?;
        Ok(count_schema(input, &self.output_col))
    }

    fn function_config(&self) -> ConfigDocument {
        json!({
            "input_col": self.input_col,
            "output_col": self.output_col,
        })
    }
}

impl TransformBase for WordCount {
    fn required_columns(&self, input_tag: &str) -> Option<Schema> {
        if input_tag != INPUT_TAG || self.input_col.is_empty() {
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
            .get(INPUT_TAG)
            .ok_or_else(|| XlangError::UnknownTag(INPUT_TAG.to_string()))?;
        Ok(HashMap::from([(OUTPUT_TAG.to_string(), self.widen(input)?)]))
    }
}

impl OneToOneTransform for WordCount {
    fn input_tag(&self) -> String {
        INPUT_TAG.to_string()
    }

    fn output_tag(&self) -> String {
        OUTPUT_TAG.to_string()
    }

    fn expand_collection(&self, input: RemoteCollection) -> BoxFuture<'_, Result<RemoteCollection>> {
        Box::pin(async move {
            let output_schema = self.widen(&input.schema().await?)?;
            input
                .apply(
                    COMPONENT_NAME,
                    WORD_COUNT_FN,
                    &output_schema,
                    &self.function_config(),
                )
                .await
        })
    }
}

/// `input` with `output_col` set to INT32; an existing column of that name is overwritten in place.
fn count_schema(input: &Schema, output_col: &str) -> Schema {
    input.replace_or_append(SchemaField::new(output_col, FieldType::Int32))
}

fn check_configured(input_col: &str, output_col: &str) -> Result<()> {
    for (key, value) in [("input_col", input_col), ("output_col", output_col)] {
        if value.is_empty() {
            return Err(XlangError::component(format!("{key} is not configured")));
        }
    }
    Ok(())
}

/// Per-record half of [`WordCount`].
#[derive(Debug, Default)]
pub struct WordCountFn {
    input_col: String,
    output_col: String,
    /// Output schema, cached per distinct input schema.
    widened: Option<(Arc<Schema>, Arc<Schema>)>,
}

impl WordCountFn {
    fn output_schema(&mut self, input: &Arc<Schema>) -> Arc<Schema> {
        if let Some((seen, out)) = &self.widened {
            if Arc::ptr_eq(seen, input) || seen == input {
                return out.clone();
            }
        }
        let out = Arc::new(count_schema(input, &self.output_col));
        self.widened = Some((input.clone(), out.clone()));
        out
    }
}

impl RowTransformFunction for WordCountFn {
    fn init_from_driver(&mut self, config: &ConfigDocument) -> Result<()> {
        self.input_col = from_config_value("input_col", &config["input_col"])?;
        self.output_col = from_config_value("output_col", &config["output_col"])?;
        check_configured(&self.input_col, &self.output_col)?;
        self.widened = None;
        tracing::debug!(input_col = %self.input_col, output_col = %self.output_col, "word count configured");
        Ok(())
    }

    fn apply(&mut self, row: Row) -> Result<Vec<Row>> {
        let count = match row.get(&self.input_col)? {
            Value::Null => Value::Null,
            Value::String(text) => {
                let chars = text.chars().count();
                let chars = i32::try_from(chars).map_err(|_| {
                    XlangError::component(format!("{chars} characters overflow INT32"))
                })?;
                Value::Int32(chars)
            }
            _ => {
                return Err(XlangError::ValueTypeMismatch {
                    field: self.input_col.clone(),
                    expected: FieldType::String.to_string(),
                });
            }
        };

        let schema = self.output_schema(row.schema());
        let slot = schema.index_of(&self.output_col)?;
        let mut values = row.into_values();
        if slot < values.len() {
            values[slot] = count;
        } else {
            values.push(count);
        }
        Ok(vec![Row::new(schema, values)?])
    }
}
