pub mod audio;
pub mod config;
pub mod http;
pub mod recorder;
pub mod storage;

pub use audio::{
    AudioFile, AudioInput, AudioInputConfig, CaptureError, CaptureStreams, FileInput,
    FrequencyAnalyser, FrequencySnapshot, InputFactory, InputSource, SharedAnalyser,
    WavChunkEncoder,
};
pub use config::Config;
pub use http::{create_router, AppState, UploadResponse};
pub use recorder::{
    AudioArtifact, PlaybackHandle, Recorder, RecorderConfig, RecorderError, SessionStats,
    UploadClient,
};
pub use storage::{StorageError, StoredUpload, UploadStore};
