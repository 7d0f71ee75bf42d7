use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::config::DerefLimits;
use crate::content_type::choose_content_type;
use crate::deref::deref_schema;
use crate::error::{ErrorCode, ToolError};
use crate::index::HttpMethod;
use crate::lookup::find_operation;
use crate::store::OpenApiStore;

use super::envelope::ToolOutput;
use super::{components_for, empty_schema};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBodySchema {
    pub selected_content_type: Option<String>,
    pub schema: Value,
}

impl ResponseBodySchema {
    fn placeholder() -> Self {
        Self {
            selected_content_type: None,
            schema: empty_schema(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSchema {
    pub operation_id: String,
    pub method: HttpMethod,
    pub path: String,
    /// Keyed by status code, in document order.
    pub responses: IndexMap<String, ResponseBodySchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
}

/// Response body schema per status code of `operation_id`.
///
/// Malformed or body-less responses degrade to a placeholder entry, but a
/// selected media type without a schema fails the whole call.
pub fn get_response_schema(
    store: &mut OpenApiStore,
    operation_id: &str,
    limits: DerefLimits,
) -> ToolOutput<ResponseSchema> {
    try_get_response_schema(store, operation_id, limits).into()
}

fn try_get_response_schema(
    store: &mut OpenApiStore,
    operation_id: &str,
    limits: DerefLimits,
) -> Result<ResponseSchema, ToolError> {
    let document = &store.load()?.document;
    let op = find_operation(document, operation_id)?;

    let responses = op
        .operation
        .get("responses")
        .and_then(Value::as_object)
        .ok_or_else(|| ToolError::new(ErrorCode::ResponsesMissing, "responses missing or invalid"))?;

    let mut out = IndexMap::with_capacity(responses.len());
    let mut kept_ref = false;

    for (status_code, response) in responses {
        let selected = response
            .as_object()
            .and_then(|r| choose_content_type(r.get("content").and_then(Value::as_object)))
            .filter(|(_, media)| media.is_object());
        let Some((media_type, media)) = selected else {
            out.insert(status_code.clone(), ResponseBodySchema::placeholder());
            continue;
        };

        let schema = media.get("schema").filter(|s| s.is_object()).ok_or_else(|| {
            ToolError::new(
                ErrorCode::ResponseSchemaMissing,
                "response schema missing and cannot be inferred",
            )
            .with_detail("statusCode", status_code.as_str())
        })?;

        let res = deref_schema(schema, document, limits)?;
        kept_ref |= res.kept_ref;
        out.insert(
            status_code.clone(),
            ResponseBodySchema {
                selected_content_type: Some(media_type.to_string()),
                schema: res.schema,
            },
        );
    }

    Ok(ResponseSchema {
        operation_id: operation_id.to_string(),
        method: op.method,
        path: op.path.to_string(),
        responses: out,
        components: components_for(document, kept_ref),
    })
}
