use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorCode, ToolError};

/// Wire shape for a failed tool call: `{"error": {"code", "message", "details"}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub details: Map<String, Value>,
}

impl From<ToolError> for ErrorEnvelope {
    fn from(err: ToolError) -> Self {
        Self {
            error: ErrorBody {
                code: err.code,
                message: err.message,
                details: err.details,
            },
        }
    }
}

/// Result of a tool call, serialized as either the payload or an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput<T> {
    Ok(T),
    Err(ErrorEnvelope),
}

impl<T> ToolOutput<T> {
    pub fn into_result(self) -> Result<T, ErrorEnvelope> {
        match self {
            ToolOutput::Ok(value) => Ok(value),
            ToolOutput::Err(envelope) => Err(envelope),
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ToolOutput::Ok(_) => None,
            ToolOutput::Err(envelope) => Some(envelope.error.code),
        }
    }
}

impl<T> From<Result<T, ToolError>> for ToolOutput<T> {
    fn from(result: Result<T, ToolError>) -> Self {
        match result {
            Ok(value) => ToolOutput::Ok(value),
            Err(err) => ToolOutput::Err(err.into()),
        }
    }
}
