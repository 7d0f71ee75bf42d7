use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::DerefLimits;
use crate::content_type::choose_content_type;
use crate::deref::deref_schema;
use crate::error::{ErrorCode, ToolError};
use crate::index::HttpMethod;
use crate::lookup::find_operation;
use crate::store::OpenApiStore;

use super::envelope::ToolOutput;
use super::{components_for, empty_schema};

/// Parameter location (`in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }
}

/// A JSON-Schema-like object grouping the parameters of one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamObject {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl Default for ParamObject {
    fn default() -> Self {
        Self {
            schema_type: "object",
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParamBuckets {
    pub path: ParamObject,
    pub query: ParamObject,
    pub header: ParamObject,
    pub cookie: ParamObject,
}

impl ParamBuckets {
    pub fn bucket(&self, location: ParamLocation) -> &ParamObject {
        match location {
            ParamLocation::Path => &self.path,
            ParamLocation::Query => &self.query,
            ParamLocation::Header => &self.header,
            ParamLocation::Cookie => &self.cookie,
        }
    }

    fn bucket_mut(&mut self, location: ParamLocation) -> &mut ParamObject {
        match location {
            ParamLocation::Path => &mut self.path,
            ParamLocation::Query => &mut self.query,
            ParamLocation::Header => &mut self.header,
            ParamLocation::Cookie => &mut self.cookie,
        }
    }

    /// Sort and de-duplicate every `required` list.
    fn finish(&mut self) {
        for bucket in [
            &mut self.path,
            &mut self.query,
            &mut self.header,
            &mut self.cookie,
        ] {
            bucket.required.sort();
            bucket.required.dedup();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodySchema {
    pub selected_content_type: Option<String>,
    pub required: bool,
    pub schema: Value,
}

impl Default for RequestBodySchema {
    fn default() -> Self {
        Self {
            selected_content_type: None,
            required: false,
            schema: empty_schema(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSchema {
    pub operation_id: String,
    pub method: HttpMethod,
    pub path: String,
    pub params: ParamBuckets,
    pub body: RequestBodySchema,
    /// Present only when some schema above kept an unresolved `$ref`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
}

/// Parameters (grouped by location) and request body of `operation_id`, with
/// local `$ref`s inlined.
///
/// Path-item and operation parameters are both included; when the same name
/// appears in one location twice, the later (operation-level) schema wins.
pub fn get_request_schema(
    store: &mut OpenApiStore,
    operation_id: &str,
    limits: DerefLimits,
) -> ToolOutput<RequestSchema> {
    try_get_request_schema(store, operation_id, limits).into()
}

fn try_get_request_schema(
    store: &mut OpenApiStore,
    operation_id: &str,
    limits: DerefLimits,
) -> Result<RequestSchema, ToolError> {
    let document = &store.load()?.document;
    let op = find_operation(document, operation_id)?;

    let mut params = ParamBuckets::default();
    let mut kept_ref = false;

    for param in parameters_of(op.path_item).chain(parameters_of(op.operation)) {
        let Some(param) = param.as_object() else {
            continue;
        };
        let Some(location) = param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParamLocation::parse)
        else {
            continue;
        };
        let Some(name) = param
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
        else {
            continue;
        };

        let schema = parameter_schema(param, name, location)?;
        let res = deref_schema(schema, document, limits)?;
        kept_ref |= res.kept_ref;

        let bucket = params.bucket_mut(location);
        bucket.properties.insert(name.to_string(), res.schema);
        // Path parameters are mandatory regardless of the flag.
        let required = param
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if required || location == ParamLocation::Path {
            bucket.required.push(name.to_string());
        }
    }
    params.finish();

    let body = match op.operation.get("requestBody") {
        None | Some(Value::Null) => RequestBodySchema::default(),
        Some(Value::Object(request_body)) => {
            let content = request_body
                .get("content")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    ToolError::new(
                        ErrorCode::RequestBodyMissing,
                        "requestBody.content missing or invalid",
                    )
                })?;
            let (media_type, media) = choose_content_type(Some(content))
                .filter(|(_, media)| media.is_object())
                .ok_or_else(|| {
                    ToolError::new(ErrorCode::RequestBodyMissing, "requestBody.content is empty")
                })?;
            let schema = media.get("schema").filter(|s| s.is_object()).ok_or_else(|| {
                ToolError::new(
                    ErrorCode::RequestBodySchemaMissing,
                    "requestBody schema missing and cannot be inferred",
                )
                .with_detail("contentType", media_type)
            })?;

            let res = deref_schema(schema, document, limits)?;
            kept_ref |= res.kept_ref;
            RequestBodySchema {
                selected_content_type: Some(media_type.to_string()),
                required: request_body
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                schema: res.schema,
            }
        }
        Some(_) => {
            return Err(ToolError::new(
                ErrorCode::RequestBodyInvalid,
                "requestBody must be an object when present",
            ));
        }
    };

    Ok(RequestSchema {
        operation_id: operation_id.to_string(),
        method: op.method,
        path: op.path.to_string(),
        params,
        body,
        components: components_for(document, kept_ref),
    })
}

fn parameters_of(item: &Map<String, Value>) -> impl Iterator<Item = &Value> {
    item.get("parameters")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// `schema`, else the schema of the preferred `content` entry.
fn parameter_schema<'a>(
    param: &'a Map<String, Value>,
    name: &str,
    location: ParamLocation,
) -> Result<&'a Value, ToolError> {
    if let Some(schema) = param.get("schema").filter(|s| s.is_object()) {
        return Ok(schema);
    }
    choose_content_type(param.get("content").and_then(Value::as_object))
        .and_then(|(_, media)| media.get("schema"))
        .filter(|s| s.is_object())
        .ok_or_else(|| {
            ToolError::new(
                ErrorCode::ParamSchemaMissing,
                "Parameter schema missing and cannot be inferred",
            )
            .with_detail("name", name)
            .with_detail("in", location.as_str())
        })
}
