//! Sound-presence monitor
//!
//! Once per frame the monitor reads the analyser's byte frequency snapshot
//! and sets the sound-presence signal to `mean > SOUND_THRESHOLD`. The
//! threshold is fixed: no calibration to ambient noise, no hysteresis. The
//! signal is UI feedback only and never gates recording.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::audio::FrequencySnapshot;

/// Mean bin magnitude above which sound is considered present
pub const SOUND_THRESHOLD: f64 = 10.0;

/// Arithmetic mean of the bin magnitudes; 0 for an empty snapshot
pub fn mean_magnitude(bins: &[u8]) -> f64 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|&b| b as u64).sum();
    sum as f64 / bins.len() as f64
}

pub fn is_sound_present(bins: &[u8]) -> bool {
    mean_magnitude(bins) > SOUND_THRESHOLD
}

/// Cancellable per-frame polling task
pub struct SoundMonitor {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SoundMonitor {
    /// Spawn the loop; the first tick fires immediately
    pub fn spawn(
        analyser: Arc<dyn FrequencySnapshot>,
        signal: watch::Sender<bool>,
        frame_interval: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(analyser, signal, frame_interval, token.clone()));

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Invalidate the token; the loop performs no further analyser reads
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the loop to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Sound monitor task panicked: {}", e);
            }
        }
    }
}

impl Drop for SoundMonitor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(
    analyser: Arc<dyn FrequencySnapshot>,
    signal: watch::Sender<bool>,
    frame_interval: Duration,
    token: CancellationToken,
) {
    let mut bins = vec![0u8; analyser.frequency_bin_count()];
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        analyser.byte_frequency_data(&mut bins);
        let present = is_sound_present(&bins);

        signal.send_if_modified(|current| {
            if *current == present {
                return false;
            }
            debug!(
                "Sound {} (mean magnitude {:.1})",
                if present { "detected" } else { "gone" },
                mean_magnitude(&bins)
            );
            *current = present;
            true
        });
    }
}
