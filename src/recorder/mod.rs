//! Client-side recorder
//!
//! This module provides the `Recorder` controller that manages:
//! - Capture start/stop over an `AudioInput`
//! - Chunk collection into an immutable `AudioArtifact`
//! - The sound-presence signal driven by the per-frame monitor
//! - Playback handles and uploads to the receiver

mod artifact;
mod config;
mod error;
pub mod monitor;
#[allow(clippy::module_inception)]
mod recorder;
mod session;
mod stats;
mod upload;

pub use artifact::{AudioArtifact, PlaybackHandle};
pub use config::RecorderConfig;
pub use error::RecorderError;
pub use monitor::{is_sound_present, mean_magnitude, SoundMonitor, SOUND_THRESHOLD};
pub use recorder::Recorder;
pub use session::RecordingSession;
pub use stats::SessionStats;
pub use upload::UploadClient;
