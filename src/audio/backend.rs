use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

/// A discrete buffer of encoded audio bytes delivered during capture
pub type EncodedChunk = Vec<u8>;

/// Errors raised by capture inputs
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The input refused access (denied permission, stream could not be opened)
    #[error("audio input access denied: {0}")]
    PermissionDenied(String),

    /// No audio input device or source is available
    #[error("no audio input available: {0}")]
    NoInputDevice(String),

    #[error("audio input is already capturing")]
    AlreadyCapturing,

    #[error("audio stream failed: {0}")]
    Stream(String),

    #[error("failed to decode audio input: {0}")]
    Decode(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read access to the current frequency-magnitude snapshot of the input
pub trait FrequencySnapshot: Send + Sync {
    /// Number of bins in a snapshot (half the analysis window)
    fn frequency_bin_count(&self) -> usize;

    /// Fill `bins` with byte-valued magnitudes (0-255) of the current input
    fn byte_frequency_data(&self, bins: &mut [u8]);
}

/// Live streams handed out by an input once capture starts
pub struct CaptureStreams {
    /// Encoded chunks in capture order; closed once the input is stopped
    pub chunks: mpsc::Receiver<EncodedChunk>,
    /// Frequency analyser fed by the same stream
    pub analyser: Arc<dyn FrequencySnapshot>,
}

/// Configuration shared by capture inputs
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// How much audio each encoded chunk covers, in milliseconds
    pub timeslice_ms: u64,
    /// Capacity of the bounded chunk channel
    pub chunk_channel_capacity: usize,
}

impl Default for AudioInputConfig {
    fn default() -> Self {
        Self {
            timeslice_ms: 100,
            chunk_channel_capacity: 64,
        }
    }
}

/// Audio capture input trait
///
/// Implementations:
/// - File: plays back a WAV file in real time (headless use, testing)
/// - Microphone: default input device via cpal (`microphone` feature)
#[async_trait::async_trait]
pub trait AudioInput: Send {
    /// Acquire the input and begin capturing
    async fn start(&mut self) -> Result<CaptureStreams, CaptureError>;

    /// Finalize the encoder, release the input and close the chunk stream
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if the input is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get input name for logging
    fn name(&self) -> &str;
}

/// Audio input source type
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Default microphone (requires the `microphone` feature)
    Microphone,
    /// WAV file played back as if it were live input
    File(PathBuf),
}

/// Audio input factory
pub struct InputFactory;

impl InputFactory {
    /// Create an input for the given source
    pub fn create(
        source: InputSource,
        config: AudioInputConfig,
    ) -> Result<Box<dyn AudioInput>, CaptureError> {
        match source {
            InputSource::File(path) => Ok(Box::new(super::file::FileInput::new(path, config))),

            InputSource::Microphone => {
                #[cfg(feature = "microphone")]
                {
                    Ok(Box::new(super::microphone::MicrophoneInput::new(config)))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    let _ = config;
                    Err(CaptureError::NoInputDevice(
                        "built without microphone support (enable the `microphone` feature)"
                            .to_string(),
                    ))
                }
            }
        }
    }
}
