//! Landing zone: raw source batches persisted as JSON files before loading.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::models::observation::LandingBatch;

const FILE_PREFIX: &str = "crypto_prices_";
const FILE_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum LandingZoneError {
    #[error("landing zone I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("landing file {0} already exists")]
    AlreadyExists(PathBuf),
    #[error("malformed landing file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LandingZoneError + '_ {
    move |source| LandingZoneError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// File name for a batch ingested at `ingested_at`, e.g.
/// `crypto_prices_20251220_101500_042.json` (millisecond precision)
pub fn landing_file_name(ingested_at: DateTime<Utc>) -> String {
    format!(
        "{}{}.{}",
        FILE_PREFIX,
        ingested_at.format("%Y%m%d_%H%M%S_%3f"),
        FILE_EXTENSION
    )
}

/// Write `batch` to `dir` and return the path of the new file.
///
/// Never overwrites: an existing file with the same name is an
/// [`LandingZoneError::AlreadyExists`].
pub async fn write_landing_batch(dir: &Path, batch: &LandingBatch) -> Result<PathBuf, LandingZoneError> {
    tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;

    let path = dir.join(landing_file_name(batch.ingested_at));
    let body = serde_json::to_vec_pretty(batch).map_err(|source| LandingZoneError::Malformed {
        path: path.clone(),
        source,
    })?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(LandingZoneError::AlreadyExists(path));
        }
        Err(e) => return Err(io_error(&path)(e)),
    };
    file.write_all(&body).await.map_err(io_error(&path))?;
    file.flush().await.map_err(io_error(&path))?;

    tracing::info!(
        "Wrote {} records to landing file {}",
        batch.records.len(),
        path.display()
    );

    Ok(path)
}

pub async fn read_landing_batch(path: &Path) -> Result<LandingBatch, LandingZoneError> {
    let body = tokio::fs::read(path).await.map_err(io_error(path))?;

    serde_json::from_slice(&body).map_err(|source| LandingZoneError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Landing files in `dir`, oldest first (names sort by timestamp).
pub async fn list_landing_files(dir: &Path) -> Result<Vec<PathBuf>, LandingZoneError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error(dir))?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
        let path = entry.path();
        let is_landing_file = path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(FILE_PREFIX));

        if is_landing_file {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
