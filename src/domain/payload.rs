//! Opaque node payloads.
//!
//! The engine never inspects a payload. It only asks a payload to copy itself
//! (when a node is cloned or split) and to render its fields (when a graph is
//! serialized).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;

/// Payload carried by a specialized node kind
pub trait Payload: fmt::Debug {
    /// Short kind tag, e.g. `"operation"`
    fn kind(&self) -> &str;

    /// Value copy of this payload, used by clone and split.
    fn clone_payload(&self) -> Box<dyn Payload>;

    /// Fields merged into the node's serialized record.
    fn fields(&self) -> Map<String, Value>;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Payload> {
    fn clone(&self) -> Self {
        self.clone_payload()
    }
}

/// Computation-node payload: the operation tag and optional tensor metadata
/// recorded by a tracer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Operation {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl Payload for Operation {
    fn kind(&self) -> &str {
        "operation"
    }

    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "operation".to_string(),
            self.operation.clone().map(Value::String).unwrap_or(Value::Null),
        );
        if let Some(meta) = &self.meta {
            fields.insert("meta".to_string(), meta.clone());
        }
        fields
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
