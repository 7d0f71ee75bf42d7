#![allow(dead_code)]

use std::fs;

use apix_core::OpenApiStore;
use apix_core::fetch::{FetchMetadata, META_FILE_NAME, SPEC_FILE_NAME, unix_now};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

pub const MINIMAL: &str = include_str!("../fixtures/openapi_minimal.json");
pub const CYCLE_REF: &str = include_str!("../fixtures/openapi_cycle_ref.json");
pub const EDGE_CASES: &str = include_str!("../fixtures/openapi_edge_cases.json");
pub const DUPLICATE: &str = include_str!("../fixtures/openapi_duplicate.json");

/// Nothing listens here; a store that reaches the network fails loudly.
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:9";

pub fn parse(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).expect("fixture should be valid JSON")
}

/// Seed `dir` with `raw` and fresh metadata, as if it had just been fetched.
pub fn seed_cache(dir: &std::path::Path, raw: &str) -> FetchMetadata {
    let meta = FetchMetadata {
        sha256: hex::encode(Sha256::digest(raw.as_bytes())),
        fetched_at: unix_now(),
        size_bytes: raw.len() as u64,
        url: format!("{UNREACHABLE_BASE_URL}/openapi.json"),
    };
    fs::write(dir.join(SPEC_FILE_NAME), raw).unwrap();
    fs::write(
        dir.join(META_FILE_NAME),
        serde_json::to_vec_pretty(&meta).unwrap(),
    )
    .unwrap();
    meta
}

/// A store served entirely from a warm cache.
pub fn cached_store(raw: &str) -> (TempDir, OpenApiStore) {
    let dir = TempDir::new().unwrap();
    seed_cache(dir.path(), raw);
    let store = OpenApiStore::new(UNREACHABLE_BASE_URL, dir.path()).with_cache_ttl(3600);
    (dir, store)
}
