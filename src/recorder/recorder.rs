use tokio::sync::watch;
use tracing::{error, info, warn};

use super::artifact::{AudioArtifact, PlaybackHandle};
use super::config::RecorderConfig;
use super::error::RecorderError;
use super::session::RecordingSession;
use super::stats::SessionStats;
use super::upload::UploadClient;
use crate::audio::AudioInput;
use crate::http::UploadResponse;

/// Recorder controller: drives capture sessions, keeps the latest artifact
/// and uploads it on request
///
/// At most one session is active. `start` while recording is rejected with
/// `AlreadyRecording`; the running session is left untouched.
pub struct Recorder {
    config: RecorderConfig,
    input: Box<dyn AudioInput>,
    uploader: UploadClient,
    session: Option<RecordingSession>,
    artifact: Option<AudioArtifact>,
    playback: Option<PlaybackHandle>,
    sound_signal: watch::Sender<bool>,
}

impl Recorder {
    pub fn new(config: RecorderConfig, input: Box<dyn AudioInput>) -> Self {
        let uploader = UploadClient::from_config(&config);
        Self::with_uploader(config, input, uploader)
    }

    pub fn with_uploader(
        config: RecorderConfig,
        input: Box<dyn AudioInput>,
        uploader: UploadClient,
    ) -> Self {
        let (sound_signal, _) = watch::channel(false);

        Self {
            config,
            input,
            uploader,
            session: None,
            artifact: None,
            playback: None,
            sound_signal,
        }
    }

    /// Acquire the input and start a new session
    pub async fn start(&mut self) -> Result<(), RecorderError> {
        if self.session.is_some() {
            warn!("Recording already in progress");
            return Err(RecorderError::AlreadyRecording);
        }

        info!("Starting recording from {}", self.input.name());

        let streams = match self.input.start().await {
            Ok(streams) => streams,
            Err(e) => {
                error!("Error accessing audio input: {}", e);
                return Err(e.into());
            }
        };

        self.session = Some(RecordingSession::begin(
            streams,
            self.sound_signal.clone(),
            self.config.frame_interval(),
        ));

        Ok(())
    }

    /// Stop the active session and finalize its artifact
    ///
    /// Returns `None` when nothing was recording.
    pub async fn stop(&mut self) -> Result<Option<SessionStats>, RecorderError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        let result = session.finish(self.input.as_mut()).await;
        self.sound_signal.send_replace(false);
        let (chunks, stats) = result?;

        let artifact = AudioArtifact::from_chunks(chunks);

        if let Some(previous) = self.playback.take() {
            previous.revoke().await;
        }
        match PlaybackHandle::create(&self.config.playback_dir, &artifact).await {
            Ok(handle) => self.playback = Some(handle),
            Err(e) => warn!("Failed to prepare playback: {}", e),
        }

        self.artifact = Some(artifact);

        Ok(Some(stats))
    }

    /// Upload the latest artifact
    ///
    /// Sends nothing when no artifact exists. The artifact is kept after a
    /// failed upload so it can be retried.
    pub async fn upload_artifact(&self) -> Result<UploadResponse, RecorderError> {
        let Some(artifact) = &self.artifact else {
            warn!("Upload requested with no recorded audio");
            return Err(RecorderError::NoArtifact);
        };

        self.uploader.upload(artifact).await.map_err(|e| {
            error!("Error uploading audio: {}", e);
            e
        })
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Current sound-presence signal; always false while not recording
    pub fn sound_present(&self) -> bool {
        self.is_recording() && *self.sound_signal.borrow()
    }

    /// Watch the sound-presence signal for UI feedback
    pub fn subscribe_sound(&self) -> watch::Receiver<bool> {
        self.sound_signal.subscribe()
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.session.as_ref().map(RecordingSession::stats)
    }

    pub fn artifact(&self) -> Option<&AudioArtifact> {
        self.artifact.as_ref()
    }

    pub fn playback(&self) -> Option<&PlaybackHandle> {
        self.playback.as_ref()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }
}
