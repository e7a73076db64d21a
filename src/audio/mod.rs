pub mod analyser;
pub mod backend;
pub mod encoder;
pub mod file;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use analyser::{FrequencyAnalyser, SharedAnalyser, FFT_SIZE, FREQUENCY_BIN_COUNT};
pub use backend::{
    AudioInput, AudioInputConfig, CaptureError, CaptureStreams, EncodedChunk, FrequencySnapshot,
    InputFactory, InputSource,
};
pub use encoder::{WavChunkEncoder, WAV_MIME_TYPE};
pub use file::{AudioFile, FileInput};
