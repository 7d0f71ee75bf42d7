use serde_json::{Map, Value};

use crate::error::LookupError;
use crate::index::{HttpMethod, raw_operations};

/// A uniquely identified operation inside the live document.
#[derive(Debug, Clone, Copy)]
pub struct OperationRef<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub operation: &'a Map<String, Value>,
    pub path_item: &'a Map<String, Value>,
}

/// Locate `operation_id` by scanning `document.paths` directly.
///
/// Every match is collected so that a document reusing an id fails loudly
/// instead of resolving to an arbitrary operation.
pub fn find_operation<'a>(
    document: &'a Value,
    operation_id: &str,
) -> Result<OperationRef<'a>, LookupError> {
    let mut found: Vec<OperationRef<'a>> = raw_operations(document)?
        .filter(|raw| {
            raw.operation.get("operationId").and_then(Value::as_str) == Some(operation_id)
        })
        .map(|raw| OperationRef {
            method: raw.method,
            path: raw.path,
            operation: raw.operation,
            path_item: raw.path_item,
        })
        .collect();

    match found.len() {
        0 => Err(LookupError::NotFound(operation_id.to_string())),
        1 => Ok(found.remove(0)),
        _ => Err(LookupError::NotUnique {
            operation_id: operation_id.to_string(),
            matches: found
                .iter()
                .map(|op| (op.method, op.path.to_string()))
                .collect(),
        }),
    }
}
