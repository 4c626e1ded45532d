//! Static JSON lookup file.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and parse `path`. The file is read on every call so edits show up
/// without a restart.
pub async fn read_json_file(path: &Path) -> Result<Value, LookupError> {
    let contents = tokio::fs::read(path).await.map_err(|source| LookupError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&contents).map_err(|source| LookupError::Parse {
        path: path.display().to_string(),
        source,
    })
}
