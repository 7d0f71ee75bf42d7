use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Runtime configuration, layered from defaults, `.apix.yaml`, and `OPENAPI_*` env vars.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApixConfig {
    /// Service base URL; the document is fetched from `{base_url}/openapi.json`.
    pub base_url: String,
    pub cache_dir: PathBuf,
    /// Skip refetching while the cached copy is younger than this. `0` always refetches.
    pub cache_ttl_seconds: u64,
    pub timeout_seconds: f64,
    pub deref_max_depth: usize,
    pub deref_max_nodes: usize,
}

impl Default for ApixConfig {
    fn default() -> Self {
        let limits = DerefLimits::default();
        Self {
            base_url: String::new(),
            cache_dir: PathBuf::from(".cache"),
            cache_ttl_seconds: 0,
            timeout_seconds: 10.0,
            deref_max_depth: limits.max_depth,
            deref_max_nodes: limits.max_nodes,
        }
    }
}

/// Traversal budgets for `$ref` inlining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerefLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for DerefLimits {
    fn default() -> Self {
        Self {
            max_depth: 20,
            max_nodes: 20_000,
        }
    }
}

pub const ENV_BASE_URL: &str = "OPENAPI_BASE_URL";
pub const ENV_CACHE_DIR: &str = "OPENAPI_CACHE_DIR";
pub const ENV_CACHE_TTL_SECONDS: &str = "OPENAPI_CACHE_TTL_SECONDS";
pub const ENV_REQUEST_TIMEOUT_SECONDS: &str = "OPENAPI_REQUEST_TIMEOUT_SECONDS";
pub const ENV_DEREF_MAX_DEPTH: &str = "OPENAPI_DEREF_MAX_DEPTH";
pub const ENV_DEREF_MAX_NODES: &str = "OPENAPI_DEREF_MAX_NODES";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".apix.yaml";

impl ApixConfig {
    pub fn deref_limits(&self) -> DerefLimits {
        DerefLimits {
            max_depth: self.deref_max_depth,
            max_nodes: self.deref_max_nodes,
        }
    }

    /// Overlay `OPENAPI_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| env::var(name).ok())
    }

    /// Overlay variables from an arbitrary lookup. Unset or blank values are ignored.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = url.trim().to_string();
        }
        if let Some(dir) = get(ENV_CACHE_DIR) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get(ENV_CACHE_TTL_SECONDS) {
            self.cache_ttl_seconds = parse_var(ENV_CACHE_TTL_SECONDS, &raw)?;
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_SECONDS) {
            self.timeout_seconds = parse_var(ENV_REQUEST_TIMEOUT_SECONDS, &raw)?;
        }
        if let Some(raw) = get(ENV_DEREF_MAX_DEPTH) {
            self.deref_max_depth = parse_var(ENV_DEREF_MAX_DEPTH, &raw)?;
        }
        if let Some(raw) = get(ENV_DEREF_MAX_NODES) {
            self.deref_max_nodes = parse_var(ENV_DEREF_MAX_NODES, &raw)?;
        }
        Ok(())
    }

    /// Check the settings that have no usable default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "timeout_seconds",
                value: self.timeout_seconds.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
    })
}

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ApixConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ApixConfig =
        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(config))
}
