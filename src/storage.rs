//! On-disk storage for uploaded recordings

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Longest sanitized filename kept, in bytes
const MAX_FILE_NAME_LEN: usize = 200;

/// Attempts at a free name when uploads collide within one millisecond
const MAX_NAME_ATTEMPTS: i64 = 16;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create storage directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write upload {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free filename for {0}")]
    NameExhausted(String),
}

/// A file written by the store
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub file_name: String,
    pub size: usize,
    pub received_at: DateTime<Utc>,
}

/// Writes each upload to its own timestamp-prefixed file
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `bytes` as `<arrival-millis>-<sanitized original name>`
    ///
    /// The directory is created first if missing. Existing files are never
    /// overwritten; on a name clash the timestamp is bumped by a millisecond.
    pub async fn save(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, StorageError> {
        let received_at = Utc::now();
        let safe_name = sanitize_file_name(original_name);

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let timestamp = (received_at + Duration::milliseconds(attempt)).timestamp_millis();
            let file_name = format!("{}-{}", timestamp, safe_name);
            let path = self.dir.join(&file_name);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StorageError::Write { path, source }),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(source) = written {
                return Err(StorageError::Write { path, source });
            }

            info!("Stored upload {} ({} bytes)", path.display(), bytes.len());

            return Ok(StoredUpload {
                path,
                file_name,
                size: bytes.len(),
                received_at,
            });
        }

        Err(StorageError::NameExhausted(safe_name))
    }
}

/// Reduce a client-supplied filename to a safe single path component
///
/// Keeps the last component only, maps anything outside `[A-Za-z0-9._-]`
/// to `_`, strips leading dots and falls back to `recording`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let mapped: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut safe = mapped.trim_start_matches('.').to_string();
    safe.truncate(MAX_FILE_NAME_LEN);

    if safe.is_empty() {
        "recording".to_string()
    } else {
        safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_is_kept() {
        assert_eq!(sanitize_file_name("a.wav"), "a.wav");
        assert_eq!(sanitize_file_name("recording-01_final.wav"), "recording-01_final.wav");
    }

    #[test]
    fn test_path_components_are_dropped() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\voice.wav"), "voice.wav");
        assert_eq!(sanitize_file_name("dir/"), "recording");
    }

    #[test]
    fn test_unsafe_characters_are_replaced() {
        assert_eq!(sanitize_file_name("my voice?.wav"), "my_voice_.wav");
        assert_eq!(sanitize_file_name("запись.wav"), "______.wav");
    }

    #[test]
    fn test_hidden_and_empty_names() {
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(".."), "recording");
        assert_eq!(sanitize_file_name(""), "recording");
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_file_name(&long).len(), MAX_FILE_NAME_LEN);
    }
}
