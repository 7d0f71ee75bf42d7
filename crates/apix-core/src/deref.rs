//! Local `$ref` inlining with cycle detection and traversal budgets.
//!
//! The walk copies the input tree, replacing every `{"$ref": "#/..."}` node
//! with the (recursively resolved) target it points to. Two things keep a
//! `$ref` in the output:
//!
//! - a cycle: the ref is already being expanded further up the current path,
//!   so it is emitted verbatim as `{"$ref": ...}`;
//! - a budget cutoff: once the node budget or the depth limit is exceeded, the
//!   remaining subtree is returned unmodified.
//!
//! Either way [`DerefResult::kept_ref`] is set, telling the caller it must ship
//! the document's `components` alongside the schema.

use std::borrow::Cow;

use log::debug;
use serde_json::{Map, Value, json};

use crate::config::DerefLimits;
use crate::error::ResolveError;

const REF_KEY: &str = "$ref";

#[derive(Debug, Clone, PartialEq)]
pub struct DerefResult {
    pub schema: Value,
    /// True iff some `$ref` survives anywhere in `schema`.
    pub kept_ref: bool,
}

impl DerefResult {
    fn plain(schema: Value) -> Self {
        Self {
            schema,
            kept_ref: false,
        }
    }
}

/// Node and depth accounting for one `deref_schema` call.
#[derive(Debug)]
struct Budget {
    limits: DerefLimits,
    visited: usize,
    exhausted: bool,
}

impl Budget {
    fn new(limits: DerefLimits) -> Self {
        Self {
            limits,
            visited: 0,
            exhausted: false,
        }
    }

    /// Count one node; false once either limit is exceeded.
    fn admit(&mut self, depth: usize) -> bool {
        self.visited += 1;
        let ok = self.visited <= self.limits.max_nodes && depth <= self.limits.max_depth;
        if !ok && !self.exhausted {
            self.exhausted = true;
            debug!(
                "deref budget exhausted (visited {}, depth {depth}, limits {:?})",
                self.visited, self.limits
            );
        }
        ok
    }
}

/// Inline local `$ref`s in `schema` against `document`.
///
/// Unresolvable or non-local refs are errors; budget exhaustion is not.
pub fn deref_schema(
    schema: &Value,
    document: &Value,
    limits: DerefLimits,
) -> Result<DerefResult, ResolveError> {
    let mut budget = Budget::new(limits);
    let mut ref_stack = Vec::new();
    walk(schema, document, 0, &mut ref_stack, &mut budget)
}

/// True if a `$ref` key appears anywhere inside `value`.
pub fn contains_ref(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(REF_KEY) || map.values().any(contains_ref),
        Value::Array(items) => items.iter().any(contains_ref),
        _ => false,
    }
}

fn walk(
    value: &Value,
    document: &Value,
    depth: usize,
    ref_stack: &mut Vec<String>,
    budget: &mut Budget,
) -> Result<DerefResult, ResolveError> {
    if !budget.admit(depth) {
        return Ok(DerefResult {
            schema: value.clone(),
            kept_ref: contains_ref(value),
        });
    }

    match value {
        Value::Array(items) => {
            let mut kept_ref = false;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let res = walk(item, document, depth + 1, ref_stack, budget)?;
                kept_ref |= res.kept_ref;
                out.push(res.schema);
            }
            Ok(DerefResult {
                schema: Value::Array(out),
                kept_ref,
            })
        }
        Value::Object(map) => match map.get(REF_KEY) {
            Some(Value::String(reference)) => {
                walk_ref(map, reference, document, depth, ref_stack, budget)
            }
            _ => {
                let (out, kept_ref) =
                    walk_entries(map, None, document, depth, ref_stack, budget)?;
                Ok(DerefResult {
                    schema: Value::Object(out),
                    kept_ref,
                })
            }
        },
        _ => Ok(DerefResult::plain(value.clone())),
    }
}

fn walk_ref(
    node: &Map<String, Value>,
    reference: &str,
    document: &Value,
    depth: usize,
    ref_stack: &mut Vec<String>,
    budget: &mut Budget,
) -> Result<DerefResult, ResolveError> {
    if ref_stack.iter().any(|r| r == reference) {
        return Ok(DerefResult {
            schema: json!({ "$ref": reference }),
            kept_ref: true,
        });
    }

    let target = resolve_pointer(document, reference)?;
    ref_stack.push(reference.to_string());
    let resolved = walk(target, document, depth + 1, ref_stack, budget);
    ref_stack.pop();
    let resolved = resolved?;

    let base = match resolved.schema {
        Value::Object(base) => base,
        scalar_or_array => {
            return Ok(DerefResult {
                schema: scalar_or_array,
                kept_ref: resolved.kept_ref,
            });
        }
    };

    // Siblings of `$ref` extend or override the target. They are not on the
    // path being expanded, so they see the outer ref stack.
    let (merged, siblings_kept) =
        walk_entries(node, Some(base), document, depth, ref_stack, budget)?;
    Ok(DerefResult {
        schema: Value::Object(merged),
        kept_ref: resolved.kept_ref || siblings_kept,
    })
}

/// Resolve every entry of `map` (minus `$ref` when overlaying onto `base`).
fn walk_entries(
    map: &Map<String, Value>,
    base: Option<Map<String, Value>>,
    document: &Value,
    depth: usize,
    ref_stack: &mut Vec<String>,
    budget: &mut Budget,
) -> Result<(Map<String, Value>, bool), ResolveError> {
    let skip_ref = base.is_some();
    let mut out = base.unwrap_or_default();
    let mut kept_ref = false;
    for (key, value) in map {
        if skip_ref && key == REF_KEY {
            continue;
        }
        let res = walk(value, document, depth + 1, ref_stack, budget)?;
        kept_ref |= res.kept_ref;
        out.insert(key.clone(), res.schema);
    }
    Ok((out, kept_ref))
}

/// Follow a `#/a/b/c` pointer through nested objects.
fn resolve_pointer<'a>(document: &'a Value, reference: &str) -> Result<&'a Value, ResolveError> {
    let pointer = reference
        .strip_prefix("#/")
        .ok_or_else(|| ResolveError::NonLocalRef(reference.to_string()))?;

    let mut current = document;
    for raw in pointer.split('/') {
        let segment = unescape_segment(raw);
        current = current
            .as_object()
            .and_then(|map| map.get(segment.as_ref()))
            .ok_or_else(|| ResolveError::Unresolvable(reference.to_string()))?;
    }
    Ok(current)
}

/// JSON pointer unescaping: `~1` is `/`, `~0` is `~`.
fn unescape_segment(raw: &str) -> Cow<'_, str> {
    if raw.contains('~') {
        Cow::Owned(raw.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_pointer_unescapes_segments() {
        let doc = json!({"paths": {"/pets/{id}": {"get": {"x": 1}}, "a~b": 2}});
        let v = resolve_pointer(&doc, "#/paths/~1pets~1{id}/get/x").unwrap();
        assert_eq!(v, &json!(1));
        let v = resolve_pointer(&doc, "#/paths/a~0b").unwrap();
        assert_eq!(v, &json!(2));
    }

    #[test]
    fn test_resolve_pointer_rejects_remote_refs() {
        let doc = json!({});
        let err = resolve_pointer(&doc, "other.yaml#/components/schemas/X").unwrap_err();
        assert!(matches!(err, ResolveError::NonLocalRef(_)));
    }

    #[test]
    fn test_resolve_pointer_through_scalar_fails() {
        let doc = json!({"components": {"schemas": 3}});
        let err = resolve_pointer(&doc, "#/components/schemas/User").unwrap_err();
        assert!(matches!(err, ResolveError::Unresolvable(_)));
    }

    #[test]
    fn test_contains_ref_scans_nested_arrays() {
        assert!(contains_ref(&json!({"allOf": [{"type": "object"}, {"$ref": "#/x"}]})));
        assert!(!contains_ref(&json!({"items": [{"type": "string"}], "ref": "#/x"})));
    }
}
