// Microphone input using cpal (default input device)

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::analyser::SharedAnalyser;
use super::backend::{AudioInput, AudioInputConfig, CaptureError, CaptureStreams};
use super::encoder::WavChunkEncoder;

/// Samples captured by the device callback, waiting for the next timeslice
type PendingSamples = Arc<Mutex<Vec<i16>>>;

/// Captures the default microphone
///
/// The cpal stream lives on a dedicated thread (streams are not `Send` on
/// every platform). The device callback feeds the analyser directly and
/// parks samples for the encoder task, which emits one chunk per timeslice.
pub struct MicrophoneInput {
    config: AudioInputConfig,
    stop_token: Option<CancellationToken>,
    release_tx: Option<std::sync::mpsc::Sender<()>>,
    capture_thread: Option<thread::JoinHandle<()>>,
    encoder_task: Option<JoinHandle<()>>,
}

impl MicrophoneInput {
    pub fn new(config: AudioInputConfig) -> Self {
        Self {
            config,
            stop_token: None,
            release_tx: None,
            capture_thread: None,
            encoder_task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioInput for MicrophoneInput {
    async fn start(&mut self) -> Result<CaptureStreams, CaptureError> {
        if self.capture_thread.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        info!("Requesting microphone access");

        let pending: PendingSamples = Arc::new(Mutex::new(Vec::new()));
        let analyser = SharedAnalyser::new();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let thread_pending = Arc::clone(&pending);
        let thread_analyser = analyser.clone();
        let capture_thread = thread::Builder::new()
            .name("microphone-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(thread_pending, thread_analyser) {
                    Ok((stream, sample_rate, channels)) => {
                        let _ = ready_tx.send(Ok((sample_rate, channels)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Hold the stream until released; a dropped sender also releases
                let _ = release_rx.recv();
                drop(stream);
            })?;

        let (sample_rate, channels) = match ready_rx.await {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = capture_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = capture_thread.join();
                return Err(CaptureError::Stream(
                    "capture thread exited before the stream opened".to_string(),
                ));
            }
        };

        info!("Microphone opened: {}Hz, {} channels", sample_rate, channels);

        let (chunk_tx, chunk_rx) = mpsc::channel(self.config.chunk_channel_capacity.max(1));
        let token = CancellationToken::new();
        let encoder_task = tokio::spawn(encode_timeslices(
            pending,
            WavChunkEncoder::new(sample_rate, channels),
            Duration::from_millis(self.config.timeslice_ms.max(1)),
            chunk_tx,
            token.clone(),
        ));

        self.stop_token = Some(token);
        self.release_tx = Some(release_tx);
        self.capture_thread = Some(capture_thread);
        self.encoder_task = Some(encoder_task);

        Ok(CaptureStreams {
            chunks: chunk_rx,
            analyser: Arc::new(analyser),
        })
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        // Release the device first so no more samples arrive
        self.release_tx.take();
        if let Some(handle) = self.capture_thread.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| CaptureError::Stream(e.to_string()))?
                .map_err(|_| CaptureError::Stream("capture thread panicked".to_string()))?;
        }

        if let Some(token) = self.stop_token.take() {
            token.cancel();
        }
        if let Some(task) = self.encoder_task.take() {
            task.await
                .map_err(|e| CaptureError::Stream(format!("encoder task failed: {}", e)))?;
        }

        info!("Microphone released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capture_thread.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for MicrophoneInput {
    fn drop(&mut self) {
        self.release_tx.take();
        if let Some(token) = self.stop_token.take() {
            token.cancel();
        }
    }
}

fn open_stream(
    pending: PendingSamples,
    analyser: SharedAnalyser,
) -> Result<(cpal::Stream, u32, u16), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::NoInputDevice("no default input device".to_string()))?;

    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.config();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    let on_error = |e: cpal::StreamError| error!("Microphone stream error: {}", e);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let pcm: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                deliver(&pending, &analyser, &pcm, channels);
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                deliver(&pending, &analyser, data, channels);
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::Stream(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

    Ok((stream, sample_rate, channels))
}

fn deliver(pending: &PendingSamples, analyser: &SharedAnalyser, pcm: &[i16], channels: u16) {
    analyser.push_pcm(pcm, channels);
    pending.lock().extend_from_slice(pcm);
}

async fn encode_timeslices(
    pending: PendingSamples,
    mut encoder: WavChunkEncoder,
    timeslice: Duration,
    chunk_tx: mpsc::Sender<Vec<u8>>,
    token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + timeslice, timeslice);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let finished = tokio::select! {
            biased;
            _ = token.cancelled() => true,
            _ = ticker.tick() => false,
        };

        let samples = std::mem::take(&mut *pending.lock());
        match encoder.encode(&samples) {
            Ok(chunk) if !chunk.is_empty() => {
                if chunk_tx.send(chunk).await.is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to encode microphone slice: {}", e);
                break;
            }
        }

        if finished {
            break;
        }
    }
}
