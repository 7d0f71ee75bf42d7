//! Agent-facing queries over an [`OpenApiStore`](crate::OpenApiStore).
//!
//! Every entry point returns a [`ToolOutput`]: either the payload or an error
//! envelope. Nothing here returns `Err` to the caller.

pub mod envelope;
pub mod request_schema;
pub mod response_schema;
pub mod search;

use serde_json::{Map, Value};

pub use envelope::{ErrorBody, ErrorEnvelope, ToolOutput};
pub use request_schema::{
    ParamBuckets, ParamLocation, ParamObject, RequestBodySchema, RequestSchema, get_request_schema,
};
pub use response_schema::{ResponseBodySchema, ResponseSchema, get_response_schema};
pub use search::{DEFAULT_SEARCH_LIMIT, search_operations};

/// The document's `components`, only when some schema still holds a `$ref`.
fn components_for(document: &Value, kept_ref: bool) -> Option<Value> {
    if !kept_ref {
        return None;
    }
    Some(
        document
            .get("components")
            .filter(|c| c.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    )
}

/// `{}`, the schema placeholder when there is nothing to describe.
fn empty_schema() -> Value {
    Value::Object(Map::new())
}
