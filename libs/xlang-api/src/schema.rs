use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, XlangError};

/// Closed set of type names understood on both sides of the bridge.
///
/// `Row` and `Array` are composite; every other name is a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    String,
    Byte,
    Bytes,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Decimal,
    Boolean,
    DateTime,
    Row,
    Array,
}

impl TypeName {
    pub const ALL: [TypeName; 13] = [
        TypeName::String,
        TypeName::Byte,
        TypeName::Bytes,
        TypeName::Int16,
        TypeName::Int32,
        TypeName::Int64,
        TypeName::Float,
        TypeName::Double,
        TypeName::Decimal,
        TypeName::Boolean,
        TypeName::DateTime,
        TypeName::Row,
        TypeName::Array,
    ];

    /// Wire spelling (`"STRING"`, `"INT32"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeName::String => "STRING",
            TypeName::Byte => "BYTE",
            TypeName::Bytes => "BYTES",
            TypeName::Int16 => "INT16",
            TypeName::Int32 => "INT32",
            TypeName::Int64 => "INT64",
            TypeName::Float => "FLOAT",
            TypeName::Double => "DOUBLE",
            TypeName::Decimal => "DECIMAL",
            TypeName::Boolean => "BOOLEAN",
            TypeName::DateTime => "DATETIME",
            TypeName::Row => "ROW",
            TypeName::Array => "ARRAY",
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, TypeName::Row | TypeName::Array)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeName {
    type Err = XlangError;

    fn from_str(s: &str) -> Result<Self> {
        TypeName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| XlangError::codec("", format!("unknown type name '{s}'")))
    }
}

/// Recursive type descriptor.
///
/// Leaf variants carry nothing; `Array` carries its element type and `Row`
/// the nested schema, so a composite without a nested descriptor (or a leaf
/// with one) cannot be constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Byte,
    Bytes,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Decimal,
    Boolean,
    DateTime,
    Row(Arc<Schema>),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Leaf type for `name`, or `None` for the composite names.
    pub fn primitive(name: TypeName) -> Option<FieldType> {
        let ty = match name {
            TypeName::String => FieldType::String,
            TypeName::Byte => FieldType::Byte,
            TypeName::Bytes => FieldType::Bytes,
            TypeName::Int16 => FieldType::Int16,
            TypeName::Int32 => FieldType::Int32,
            TypeName::Int64 => FieldType::Int64,
            TypeName::Float => FieldType::Float,
            TypeName::Double => FieldType::Double,
            TypeName::Decimal => FieldType::Decimal,
            TypeName::Boolean => FieldType::Boolean,
            TypeName::DateTime => FieldType::DateTime,
            TypeName::Row | TypeName::Array => return None,
        };
        Some(ty)
    }

    pub fn array_of(element: FieldType) -> FieldType {
        FieldType::Array(Box::new(element))
    }

    pub fn row_of(schema: impl Into<Arc<Schema>>) -> FieldType {
        FieldType::Row(schema.into())
    }

    pub fn type_name(&self) -> TypeName {
        match self {
            FieldType::String => TypeName::String,
            FieldType::Byte => TypeName::Byte,
            FieldType::Bytes => TypeName::Bytes,
            FieldType::Int16 => TypeName::Int16,
            FieldType::Int32 => TypeName::Int32,
            FieldType::Int64 => TypeName::Int64,
            FieldType::Float => TypeName::Float,
            FieldType::Double => TypeName::Double,
            FieldType::Decimal => TypeName::Decimal,
            FieldType::Boolean => TypeName::Boolean,
            FieldType::DateTime => TypeName::DateTime,
            FieldType::Row(_) => TypeName::Row,
            FieldType::Array(_) => TypeName::Array,
        }
    }

    pub fn element_type(&self) -> Option<&FieldType> {
        match self {
            FieldType::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn row_schema(&self) -> Option<&Arc<Schema>> {
        match self {
            FieldType::Row(schema) => Some(schema),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Array(element) => write!(f, "ARRAY<{element}>"),
            FieldType::Row(schema) => {
                f.write_str("ROW<")?;
                for (i, field) in schema.fields().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.field_type)?;
                }
                f.write_str(">")
            }
            leaf => f.write_str(leaf.type_name().as_str()),
        }
    }
}

/// A named, typed slot in a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered field list of a record shape.
///
/// Field position determines the position of the value in [`crate::Row`].
/// Immutable once built; the name index is derived from `fields` at
/// construction and never diverges from it.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<SchemaField>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema, rejecting duplicate field names.
    pub fn new(fields: Vec<SchemaField>) -> Result<Self> {
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(XlangError::InvalidSchema(field.name.clone()));
            }
        }
        Ok(Self { fields, index })
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Result<&SchemaField> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| XlangError::UnknownField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// New schema with `field` appended.
    pub fn with_field(&self, field: SchemaField) -> Result<Schema> {
        let mut fields = self.fields.clone();
        fields.push(field);
        Schema::new(fields)
    }

    /// New schema with `field` in place of the same-named field, or appended
    /// when no field has that name.
    pub fn replace_or_append(&self, field: SchemaField) -> Schema {
        let mut fields = self.fields.clone();
        let mut index = self.index.clone();
        match self.index.get(&field.name) {
            Some(&i) => fields[i] = field,
            None => {
                index.insert(field.name.clone(), fields.len());
                fields.push(field);
            }
        }
        Self { fields, index }
    }

    pub fn into_fields(self) -> Vec<SchemaField> {
        self.fields
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

/// Incremental [`Schema`] construction; duplicates are reported by `build`.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<SchemaField>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(SchemaField::new(name, field_type));
        self
    }

    pub fn build(self) -> Result<Schema> {
        Schema::new(self.fields)
    }
}
