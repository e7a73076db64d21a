use crate::storage::UploadStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Default cap on upload request bodies (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Where uploads are persisted
    pub store: Arc<UploadStore>,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: Arc::new(UploadStore::new(storage_dir)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
