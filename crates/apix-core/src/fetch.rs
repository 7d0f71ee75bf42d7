//! Fetch `/openapi.json`, hash it, and persist it next to its metadata.

use std::io::{self, Read};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::cache::{ensure_dir, read_json, write_bytes_atomic, write_json_atomic};
use crate::error::{CacheError, FetchError};

pub const SPEC_FILE_NAME: &str = "openapi.json";
pub const META_FILE_NAME: &str = "openapi.meta.json";

const CHUNK_SIZE: usize = 64 * 1024;

/// Metadata persisted alongside the raw document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchMetadata {
    /// Hex SHA-256 of the raw response bytes.
    pub sha256: String,
    /// Unix seconds.
    pub fetched_at: u64,
    pub size_bytes: u64,
    pub url: String,
}

/// Return the document for `base_url`, from cache when the TTL allows it.
///
/// A TTL of `0` always refetches. On any failure the existing cache files are
/// left untouched.
pub fn fetch_openapi(
    base_url: &str,
    cache_dir: &Path,
    cache_ttl_seconds: u64,
    timeout: Duration,
) -> Result<(Value, FetchMetadata), FetchError> {
    ensure_dir(cache_dir)?;
    let spec_path = cache_dir.join(SPEC_FILE_NAME);
    let meta_path = cache_dir.join(META_FILE_NAME);

    if cache_ttl_seconds > 0 && spec_path.exists() && meta_path.exists() {
        match read_fresh_cache(&spec_path, &meta_path, cache_ttl_seconds) {
            Ok(Some(hit)) => {
                debug!("Using cached OpenAPI document ({})", hit.1.sha256);
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable OpenAPI cache: {e}"),
        }
    }

    let url = openapi_url(base_url);
    info!("Fetching OpenAPI document from {url}");

    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;
    let mut response = client
        .get(&url)
        .send()
        .map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let (raw, sha256) = read_hashed(&mut response).map_err(|source| FetchError::Body {
        url: url.clone(),
        source,
    })?;

    // Parse before persisting so a bad body never replaces a good cache.
    let document: Value = serde_json::from_slice(&raw).map_err(|source| FetchError::Parse {
        url: url.clone(),
        source,
    })?;

    let meta = FetchMetadata {
        sha256,
        fetched_at: unix_now(),
        size_bytes: raw.len() as u64,
        url,
    };
    write_bytes_atomic(&spec_path, &raw)?;
    write_json_atomic(&meta_path, &meta)?;

    info!(
        "Fetched {} bytes (sha256 {}) from {}",
        meta.size_bytes, meta.sha256, meta.url
    );
    Ok((document, meta))
}

/// `http://host/` -> `http://host/openapi.json`.
pub fn openapi_url(base_url: &str) -> String {
    format!("{}/openapi.json", base_url.trim_end_matches('/'))
}

/// Current time in unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn read_fresh_cache(
    spec_path: &Path,
    meta_path: &Path,
    ttl_seconds: u64,
) -> Result<Option<(Value, FetchMetadata)>, CacheError> {
    let meta: FetchMetadata = read_json(meta_path)?;
    if meta.fetched_at == 0 || unix_now().saturating_sub(meta.fetched_at) >= ttl_seconds {
        return Ok(None);
    }
    let document: Value = read_json(spec_path)?;
    Ok(Some((document, meta)))
}

/// Drain `reader` in fixed-size chunks, hashing as we go.
fn read_hashed<R: Read>(reader: &mut R) -> io::Result<(Vec<u8>, String)> {
    let mut hasher = Sha256::new();
    let mut raw = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buf[..n]);
                raw.extend_from_slice(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((raw, hex::encode(hasher.finalize())))
}
