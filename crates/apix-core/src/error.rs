use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::index::HttpMethod;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("response from {url} is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("OpenAPI document missing 'paths' or has invalid structure")]
    InvalidPaths,

    #[error("duplicate operationId: {0}")]
    DuplicateOperationId(String),
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("operationId not found: {0}")]
    NotFound(String),

    #[error("operationId is not unique: {operation_id}")]
    NotUnique {
        operation_id: String,
        /// Every `(method, path)` claiming the id, in document order.
        matches: Vec<(HttpMethod, String)>,
    },

    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("only local refs are supported, got: {0}")]
    NonLocalRef(String),

    #[error("unresolvable ref: {0}")]
    Unresolvable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing base URL (set OPENAPI_BASE_URL, `base_url` in the config file, or --base-url)")]
    MissingBaseUrl,

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

/// Machine-readable error codes returned to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    #[serde(rename = "OPENAPI_FETCH_FAILED")]
    OpenApiFetchFailed,
    #[serde(rename = "OPENAPI_INVALID")]
    OpenApiInvalid,
    OperationNotFound,
    OperationNotUnique,
    ParamSchemaMissing,
    RequestBodyMissing,
    RequestBodySchemaMissing,
    RequestBodyInvalid,
    ResponsesMissing,
    ResponseSchemaMissing,
    BadInput,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::OpenApiFetchFailed => "OPENAPI_FETCH_FAILED",
            ErrorCode::OpenApiInvalid => "OPENAPI_INVALID",
            ErrorCode::OperationNotFound => "OPERATION_NOT_FOUND",
            ErrorCode::OperationNotUnique => "OPERATION_NOT_UNIQUE",
            ErrorCode::ParamSchemaMissing => "PARAM_SCHEMA_MISSING",
            ErrorCode::RequestBodyMissing => "REQUEST_BODY_MISSING",
            ErrorCode::RequestBodySchemaMissing => "REQUEST_BODY_SCHEMA_MISSING",
            ErrorCode::RequestBodyInvalid => "REQUEST_BODY_INVALID",
            ErrorCode::ResponsesMissing => "RESPONSES_MISSING",
            ErrorCode::ResponseSchemaMissing => "RESPONSE_SCHEMA_MISSING",
            ErrorCode::BadInput => "BAD_INPUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error surfaced at the tool boundary, carrying a code and structured details.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Map<String, Value>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

impl From<IndexError> for ToolError {
    fn from(err: IndexError) -> Self {
        let message = err.to_string();
        match err {
            IndexError::InvalidPaths => ToolError::new(ErrorCode::OpenApiInvalid, message),
            IndexError::DuplicateOperationId(id) => {
                ToolError::new(ErrorCode::OpenApiInvalid, message).with_detail("operationId", id)
            }
        }
    }
}

impl From<LookupError> for ToolError {
    fn from(err: LookupError) -> Self {
        let message = err.to_string();
        match err {
            LookupError::NotFound(id) => {
                ToolError::new(ErrorCode::OperationNotFound, message).with_detail("operationId", id)
            }
            LookupError::NotUnique {
                operation_id,
                matches,
            } => {
                let matches: Vec<Value> = matches
                    .into_iter()
                    .map(|(method, path)| json!({ "method": method, "path": path }))
                    .collect();
                ToolError::new(ErrorCode::OperationNotUnique, message)
                    .with_detail("operationId", operation_id)
                    .with_detail("matches", matches)
            }
            LookupError::Index(e) => e.into(),
        }
    }
}

impl From<ResolveError> for ToolError {
    fn from(err: ResolveError) -> Self {
        let message = err.to_string();
        let reference = match err {
            ResolveError::NonLocalRef(r) | ResolveError::Unresolvable(r) => r,
        };
        ToolError::new(ErrorCode::InternalError, message).with_detail("ref", reference)
    }
}
