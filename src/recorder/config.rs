use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the recorder controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Upload endpoint of the receiver
    pub upload_url: String,

    /// Multipart field carrying the audio
    pub upload_field: String,

    /// Filename sent with the upload
    pub upload_file_name: String,

    /// Sound monitor tick, roughly one display frame
    pub frame_interval_ms: u64,

    /// Audio covered by each encoded chunk
    pub timeslice_ms: u64,

    /// Capacity of the bounded chunk channel between input and session
    pub chunk_channel_capacity: usize,

    /// Where playback files are written
    pub playback_dir: PathBuf,
}

impl RecorderConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            upload_url: "http://localhost:5000/upload".to_string(),
            upload_field: "audio".to_string(),
            upload_file_name: "recording.wav".to_string(),
            frame_interval_ms: 16, // ~60 fps
            timeslice_ms: 100,
            chunk_channel_capacity: 64,
            playback_dir: std::env::temp_dir().join("voice-recorder"),
        }
    }
}
