use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::analyser::SharedAnalyser;
use super::backend::{AudioInput, AudioInputConfig, CaptureError, CaptureStreams};
use super::encoder::WavChunkEncoder;

/// A decoded WAV file
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved 16-bit samples
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, _) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<_, _>>()?,
            (SampleFormat::Int, bits) if bits <= 16 => {
                // Widen low bit depths (8-bit is -128..127) to full 16-bit scale
                let shift = 16 - bits;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| (v << shift) as i16))
                    .collect::<Result<_, _>>()?
            }
            (SampleFormat::Int, bits) => {
                let shift = bits - 16;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<Result<_, _>>()?
            }
        };

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Plays a WAV file back in real time as if it were a live input
///
/// Every `timeslice_ms` the next slice of the file is fed to the analyser,
/// encoded and delivered as a chunk. Once the file runs out the analyser
/// sees silence until the input is stopped. Stopping flushes the partial
/// slice captured since the last tick.
pub struct FileInput {
    path: PathBuf,
    config: AudioInputConfig,
    stop_token: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl FileInput {
    pub fn new(path: impl Into<PathBuf>, config: AudioInputConfig) -> Self {
        Self {
            path: path.into(),
            config,
            stop_token: None,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioInput for FileInput {
    async fn start(&mut self) -> Result<CaptureStreams, CaptureError> {
        if self.task.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        if !self.path.is_file() {
            return Err(CaptureError::NoInputDevice(format!(
                "{} is not a readable file",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| CaptureError::Stream(format!("decode task failed: {}", e)))??;

        let (chunk_tx, chunk_rx) = mpsc::channel(self.config.chunk_channel_capacity.max(1));
        let analyser = SharedAnalyser::new();
        let token = CancellationToken::new();

        let task = tokio::spawn(play(
            audio,
            Duration::from_millis(self.config.timeslice_ms.max(1)),
            chunk_tx,
            analyser.clone(),
            token.clone(),
        ));

        self.stop_token = Some(token);
        self.task = Some(task);

        info!("File input started: {}", self.path.display());

        Ok(CaptureStreams {
            chunks: chunk_rx,
            analyser: Arc::new(analyser),
        })
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(token) = self.stop_token.take() {
            token.cancel();
        }

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| CaptureError::Stream(format!("playback task failed: {}", e)))?;
            info!("File input stopped: {}", self.path.display());
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}

impl Drop for FileInput {
    fn drop(&mut self) {
        if let Some(token) = self.stop_token.take() {
            token.cancel();
        }
    }
}

async fn play(
    audio: AudioFile,
    timeslice: Duration,
    chunk_tx: mpsc::Sender<Vec<u8>>,
    analyser: SharedAnalyser,
    token: CancellationToken,
) {
    let channels = audio.channels.max(1) as usize;
    let frames_per_slice =
        ((audio.sample_rate as u128 * timeslice.as_millis()) / 1000).max(1) as usize;
    let silence = vec![0.0f32; frames_per_slice];

    let mut encoder = WavChunkEncoder::new(audio.sample_rate, audio.channels);
    let mut position = 0usize;
    let mut last_tick = Instant::now();
    let mut ticker = interval_at(last_tick + timeslice, timeslice);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frames = tokio::select! {
            biased;
            _ = token.cancelled() => {
                // Flush whatever was captured since the last tick
                let elapsed = last_tick.elapsed().min(timeslice);
                (audio.sample_rate as u128 * elapsed.as_millis() / 1000) as usize
            }
            tick = ticker.tick() => {
                last_tick = tick;
                frames_per_slice
            }
        };

        let end = (position + frames * channels).min(audio.samples.len());
        let slice = &audio.samples[position..end];
        position = end;

        if slice.is_empty() {
            analyser.push_samples(&silence);
        } else {
            analyser.push_pcm(slice, audio.channels);

            match encoder.encode(slice) {
                Ok(chunk) => {
                    if chunk_tx.send(chunk).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to encode audio slice: {}", e);
                    break;
                }
            }
        }

        if token.is_cancelled() {
            break;
        }
    }
    // Dropping the sender closes the chunk stream
}
