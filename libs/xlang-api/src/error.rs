use std::fmt;

/// Error returned by the data model, the wire codec and the transform shapes.
#[derive(Debug, thiserror::Error)]
pub enum XlangError {
    /// Two fields of one schema share a name.
    #[error("invalid schema: duplicate field '{0}'")]
    InvalidSchema(String),

    /// Value count does not match field count.
    #[error("row has {actual} values but schema has {expected} fields")]
    RowSchemaMismatch { expected: usize, actual: usize },

    /// A value does not fit the type of the field it is aligned with.
    #[error("value for field '{field}' does not match declared type {expected}")]
    ValueTypeMismatch { field: String, expected: String },

    #[error("unknown field: {0}")]
    UnknownField(String),

    /// No collection under this tag in a collection tuple.
    #[error("no collection tagged '{0}'")]
    UnknownTag(String),

    /// Malformed wire payload. `path` locates the offending field.
    #[error("codec error at '{path}': {message}")]
    Codec { path: String, message: String },

    /// Wrong input-tuple cardinality for a fixed-arity transform shape.
    #[error("expected {expected} input collection(s), got {actual}")]
    Arity { expected: usize, actual: usize },

    /// Failure raised by component logic or by the orchestrator bridge.
    #[error("component error: {0}")]
    Component(String),
}

impl XlangError {
    pub fn codec(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn component(msg: impl Into<String>) -> Self {
        Self::Component(msg.into())
    }

    /// Add context to the error, preserving the variant.
    ///
    /// For `Codec`, the context becomes the leading segment of the field path
    /// (`"meta"` + `"count"` → `"meta.count"`). Indexed segments (`"[2]"`)
    /// are joined without a dot.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            XlangError::Codec { path, message } => {
                let ctx = ctx.to_string();
                let path = if path.is_empty() {
                    ctx
                } else if path.starts_with('[') {
                    format!("{ctx}{path}")
                } else {
                    format!("{ctx}.{path}")
                };
                XlangError::Codec { path, message }
            }
            XlangError::Component(msg) => XlangError::Component(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}

impl From<serde_json::Error> for XlangError {
    fn from(e: serde_json::Error) -> Self {
        Self::codec("", e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, XlangError>;
