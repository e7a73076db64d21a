use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::RecorderError;
use super::monitor::SoundMonitor;
use super::stats::SessionStats;
use crate::audio::{AudioInput, CaptureError, CaptureStreams, EncodedChunk};

/// One start/stop cycle of capture
///
/// Owns the chunk collector and the sound monitor spawned for the capture.
/// A session is consumed by `finish`; a later session never shares state
/// with an earlier one.
pub struct RecordingSession {
    id: Uuid,

    /// When the session started
    started_at: DateTime<Utc>,

    /// Chunks appended so far
    chunks_received: Arc<AtomicUsize>,

    /// Per-frame sound monitor
    monitor: SoundMonitor,

    /// Forces the collector to drain and exit if the input fails to close its stream
    collector_token: CancellationToken,

    /// Task appending incoming chunks to the session buffer
    collector: JoinHandle<Vec<EncodedChunk>>,
}

impl RecordingSession {
    /// Begin collecting and monitoring an input that has just started
    pub(crate) fn begin(
        streams: CaptureStreams,
        sound_signal: watch::Sender<bool>,
        frame_interval: Duration,
    ) -> Self {
        let id = Uuid::new_v4();
        info!("Recording session started: {}", id);

        // Stale until the first tick
        sound_signal.send_replace(false);

        let chunks_received = Arc::new(AtomicUsize::new(0));
        let collector_token = CancellationToken::new();
        let collector = tokio::spawn(collect_chunks(
            streams.chunks,
            Arc::clone(&chunks_received),
            collector_token.clone(),
        ));
        let monitor = SoundMonitor::spawn(streams.analyser, sound_signal, frame_interval);

        Self {
            id,
            started_at: Utc::now(),
            chunks_received,
            monitor,
            collector_token,
            collector,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::new(
            self.id,
            true,
            self.started_at,
            self.chunks_received.load(Ordering::SeqCst),
            None,
        )
    }

    /// Stop capture and drain every chunk delivered during the session
    ///
    /// The monitor is halted before the input is torn down, so the analyser
    /// is never read after release.
    pub(crate) async fn finish(
        self,
        input: &mut dyn AudioInput,
    ) -> Result<(Vec<EncodedChunk>, SessionStats), RecorderError> {
        info!("Stopping recording session: {}", self.id);

        self.monitor.cancel();
        self.monitor.shutdown().await;

        if let Err(e) = input.stop().await {
            error!("Failed to stop {} input: {}", input.name(), e);
            self.collector_token.cancel();
        }

        let chunks = self.collector.await.map_err(|e| {
            RecorderError::Capture(CaptureError::Stream(format!("chunk collector failed: {}", e)))
        })?;

        let bytes = chunks.iter().map(Vec::len).sum();
        let stats = SessionStats::new(self.id, false, self.started_at, chunks.len(), Some(bytes));

        info!(
            "Recording session {} stopped: {} chunks, {} bytes",
            self.id,
            chunks.len(),
            bytes
        );

        Ok((chunks, stats))
    }
}

async fn collect_chunks(
    mut chunk_rx: mpsc::Receiver<EncodedChunk>,
    chunks_received: Arc<AtomicUsize>,
    token: CancellationToken,
) -> Vec<EncodedChunk> {
    let mut chunks = Vec::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!("Input did not close its chunk stream; draining what was delivered");
                chunk_rx.close();
                while let Some(chunk) = chunk_rx.recv().await {
                    if !chunk.is_empty() {
                        chunks.push(chunk);
                        chunks_received.fetch_add(1, Ordering::SeqCst);
                    }
                }
                break;
            }
            chunk = chunk_rx.recv() => chunk,
        };

        match chunk {
            Some(chunk) if !chunk.is_empty() => {
                chunks.push(chunk);
                chunks_received.fetch_add(1, Ordering::SeqCst);
            }
            Some(_) => {}
            None => break,
        }
    }

    chunks
}
