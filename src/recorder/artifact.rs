use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::audio::{EncodedChunk, WAV_MIME_TYPE};

/// The finalized, immutable audio of one recording
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    bytes: Arc<[u8]>,
    mime_type: &'static str,
    chunk_count: usize,
    created_at: DateTime<Utc>,
}

impl AudioArtifact {
    /// Concatenate chunks in capture order
    pub fn from_chunks(chunks: Vec<EncodedChunk>) -> Self {
        let chunk_count = chunks.len();
        let bytes: Vec<u8> = chunks.concat();

        Self {
            bytes: bytes.into(),
            mime_type: WAV_MIME_TYPE,
            chunk_count,
            created_at: Utc::now(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Locally resolvable reference to an artifact's bytes, used for playback
#[derive(Debug)]
pub struct PlaybackHandle {
    path: PathBuf,
}

impl PlaybackHandle {
    /// Write the artifact under `dir` with a unique name
    pub async fn create(dir: &Path, artifact: &AudioArtifact) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!("recording-{}.wav", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, artifact.bytes()).await?;

        info!("Playback ready: {} ({} bytes)", path.display(), artifact.len());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Release the underlying file
    pub async fn revoke(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!("Failed to revoke playback {}: {}", self.path.display(), e);
        }
    }
}
