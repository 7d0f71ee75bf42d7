use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde_json::Value;

use crate::config::ApixConfig;
use crate::error::{ConfigError, ErrorCode, ToolError};
use crate::fetch::{FetchMetadata, fetch_openapi};
use crate::index::{Operation, OperationIndex, build_operations};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A document together with the index built from it. Replaced as a unit.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub document: Value,
    pub metadata: FetchMetadata,
    pub index: OperationIndex,
}

/// Entry point for tools: fetches (or reads the cached) document and keeps the
/// operation index memoized by content hash.
#[derive(Debug)]
pub struct OpenApiStore {
    base_url: String,
    cache_dir: PathBuf,
    cache_ttl_seconds: u64,
    timeout: Duration,
    loaded: Option<LoadedSpec>,
}

impl OpenApiStore {
    pub fn new(base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            cache_dir: cache_dir.into(),
            cache_ttl_seconds: 0,
            timeout: DEFAULT_TIMEOUT,
            loaded: None,
        }
    }

    pub fn from_config(config: &ApixConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let timeout = Duration::try_from_secs_f64(config.timeout_seconds).map_err(|_| {
            ConfigError::InvalidValue {
                name: "timeout_seconds",
                value: config.timeout_seconds.to_string(),
            }
        })?;
        Ok(Self::new(config.base_url.clone(), config.cache_dir.clone())
            .with_cache_ttl(config.cache_ttl_seconds)
            .with_timeout(timeout))
    }

    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Fetch or read the document, rebuilding the index only when its hash changed.
    pub fn load(&mut self) -> Result<&LoadedSpec, ToolError> {
        let (document, metadata) = fetch_openapi(
            &self.base_url,
            &self.cache_dir,
            self.cache_ttl_seconds,
            self.timeout,
        )
        .map_err(|e| {
            ToolError::new(ErrorCode::OpenApiFetchFailed, e.to_string())
                .with_detail("baseUrl", self.base_url.clone())
        })?;

        let unchanged = matches!(
            &self.loaded,
            Some(loaded) if loaded.metadata.sha256 == metadata.sha256
        );
        if !unchanged {
            let index = build_operations(&document)?;
            info!(
                "Indexed {} operations (sha256 {})",
                index.len(),
                metadata.sha256
            );
            return Ok(self.loaded.insert(LoadedSpec {
                document,
                metadata,
                index,
            }));
        }

        debug!("OpenAPI document unchanged ({}), reusing index", metadata.sha256);
        self.loaded.as_ref().ok_or_else(|| {
            ToolError::new(ErrorCode::InternalError, "OpenAPI store lost its loaded document")
        })
    }

    pub fn operations(&mut self) -> Result<&[Operation], ToolError> {
        Ok(self.load()?.index.operations())
    }

    pub fn operation_by_id(&mut self, operation_id: &str) -> Result<Option<&Operation>, ToolError> {
        Ok(self.load()?.index.get(operation_id))
    }

    pub fn spec(&mut self) -> Result<&Value, ToolError> {
        Ok(&self.load()?.document)
    }
}
