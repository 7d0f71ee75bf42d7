use std::num::NonZeroUsize;

use crate::error::{ErrorCode, ToolError};
use crate::index::{MatchFields, Operation, search};
use crate::store::OpenApiStore;

use super::envelope::ToolOutput;

pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

/// Search indexed operations by substring and optional method.
///
/// `match_fields` defaults to every field enabled. A non-positive `limit` is
/// rejected with `BAD_INPUT` before the document is loaded.
pub fn search_operations(
    store: &mut OpenApiStore,
    query: &str,
    match_fields: Option<MatchFields>,
    method: Option<&str>,
    limit: i64,
) -> ToolOutput<Vec<Operation>> {
    try_search(store, query, match_fields, method, limit).into()
}

fn try_search(
    store: &mut OpenApiStore,
    query: &str,
    match_fields: Option<MatchFields>,
    method: Option<&str>,
    limit: i64,
) -> Result<Vec<Operation>, ToolError> {
    let limit = usize::try_from(limit)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            ToolError::new(ErrorCode::BadInput, "limit must be > 0").with_detail("limit", limit)
        })?;
    let fields = match_fields.unwrap_or_default();

    let operations = store.operations()?;
    Ok(search(operations, query, &fields, method, limit))
}
