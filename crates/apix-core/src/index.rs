use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IndexError;

/// HTTP methods recognized as operation keys inside a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Case-insensitive parse of a path-item key.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed operation, as returned by search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: String,
    pub method: HttpMethod,
    pub path: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

/// Operations in document order, plus an id lookup.
#[derive(Debug, Clone, Default)]
pub struct OperationIndex {
    operations: Vec<Operation>,
    by_id: HashMap<String, usize>,
}

impl OperationIndex {
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn get(&self, operation_id: &str) -> Option<&Operation> {
        self.by_id.get(operation_id).map(|&i| &self.operations[i])
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A raw `(method, path, operation, path item)` entry from `document.paths`.
pub(crate) struct RawOperation<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub operation: &'a Map<String, Value>,
    pub path_item: &'a Map<String, Value>,
}

/// Walk every well-formed operation object under `paths`, in document order.
pub(crate) fn raw_operations(
    document: &Value,
) -> Result<impl Iterator<Item = RawOperation<'_>>, IndexError> {
    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or(IndexError::InvalidPaths)?;

    Ok(paths.iter().flat_map(|(path, item)| {
        item.as_object().into_iter().flat_map(move |path_item| {
            path_item.iter().filter_map(move |(key, op)| {
                let method = HttpMethod::parse(key)?;
                let operation = op.as_object()?;
                Some(RawOperation {
                    method,
                    path: path.as_str(),
                    operation,
                    path_item,
                })
            })
        })
    }))
}

/// Build the operation index from `document.paths`.
///
/// Operations without a non-empty string `operationId` are skipped. A second
/// operation claiming an already-seen id fails the whole build.
pub fn build_operations(document: &Value) -> Result<OperationIndex, IndexError> {
    let mut index = OperationIndex::default();

    for raw in raw_operations(document)? {
        let Some(operation_id) = raw
            .operation
            .get("operationId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        else {
            continue;
        };
        if index.by_id.contains_key(operation_id) {
            return Err(IndexError::DuplicateOperationId(operation_id.to_string()));
        }

        let operation = Operation {
            operation_id: operation_id.to_string(),
            method: raw.method,
            path: raw.path.to_string(),
            tags: tags_of(raw.operation),
            summary: string_field(raw.operation, "summary"),
            description: string_field(raw.operation, "description"),
        };
        index
            .by_id
            .insert(operation.operation_id.clone(), index.operations.len());
        index.operations.push(operation);
    }

    Ok(index)
}

fn tags_of(operation: &Map<String, Value>) -> Vec<String> {
    let Some(tags) = operation.get("tags").and_then(Value::as_array) else {
        return Vec::new();
    };
    tags.iter()
        .filter_map(|t| match t {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn string_field(operation: &Map<String, Value>, key: &str) -> Option<String> {
    operation.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Which fields participate in substring matching. Absent fields default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchFields {
    pub operation_id: bool,
    pub path: bool,
    pub tag: bool,
    pub summary: bool,
    pub description: bool,
}

impl Default for MatchFields {
    fn default() -> Self {
        Self {
            operation_id: true,
            path: true,
            tag: true,
            summary: true,
            description: true,
        }
    }
}

/// Filter `operations` by method and case-insensitive substring, keeping input order.
///
/// An empty (or all-whitespace) query matches everything; the method filter
/// still applies.
pub fn search(
    operations: &[Operation],
    query: &str,
    fields: &MatchFields,
    method: Option<&str>,
    limit: NonZeroUsize,
) -> Vec<Operation> {
    let query = query.trim().to_lowercase();
    let method = method
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_uppercase);

    operations
        .iter()
        .filter(|op| method.as_deref().is_none_or(|m| op.method.as_str() == m))
        .filter(|op| query.is_empty() || matches_query(op, &query, fields))
        .take(limit.get())
        .cloned()
        .collect()
}

fn matches_query(op: &Operation, query: &str, fields: &MatchFields) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(query);

    (fields.operation_id && contains(op.operation_id.as_str()))
        || (fields.path && contains(op.path.as_str()))
        || (fields.tag && op.tags.iter().any(|t| contains(t.as_str())))
        || (fields.summary && op.summary.as_deref().is_some_and(contains))
        || (fields.description && op.description.as_deref().is_some_and(contains))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("PaTcH"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("trace"), None);
        assert_eq!(HttpMethod::parse("parameters"), None);
    }

    #[test]
    fn test_match_fields_partial_map_defaults_to_true() {
        let fields: MatchFields = serde_json::from_str(r#"{"path": false}"#).unwrap();
        assert!(!fields.path);
        assert!(fields.operation_id);
        assert!(fields.tag);
        assert!(fields.summary);
        assert!(fields.description);
    }
}
