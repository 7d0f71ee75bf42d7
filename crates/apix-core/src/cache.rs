//! On-disk cache primitives. Every write goes to `<name>.tmp` and is renamed
//! into place, so readers never observe a partially written file.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// Create `path` and any missing parents. No-op if it already exists.
pub fn ensure_dir(path: &Path) -> Result<(), CacheError> {
    fs::create_dir_all(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CacheError> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CacheError::NotFound(path.to_path_buf())
        } else {
            CacheError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CacheError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replace `path` with `data`.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let tmp = tmp_path(path);
    let io_err = |source| CacheError::Io {
        path: tmp.clone(),
        source,
    };

    let mut file = fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(data).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&tmp, path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replace `path` with the pretty-printed JSON form of `value`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CacheError> {
    let mut data = serde_json::to_vec_pretty(value).map_err(|source| CacheError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    data.push(b'\n');
    write_bytes_atomic(path, &data)
}

/// Sibling temp path: `openapi.json` -> `openapi.json.tmp`.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("cache"));
    name.push(".tmp");
    path.with_file_name(name)
}
