// Shared fixtures for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use voice_recorder::audio::{
    AudioInput, CaptureError, CaptureStreams, FrequencySnapshot, FREQUENCY_BIN_COUNT,
};

/// Frequency snapshot with settable bins that counts its reads
#[derive(Default)]
pub struct FixedSnapshot {
    bins: Mutex<Vec<u8>>,
    reads: AtomicUsize,
}

impl FixedSnapshot {
    pub fn new(level: u8) -> Arc<Self> {
        Arc::new(Self {
            bins: Mutex::new(vec![level; FREQUENCY_BIN_COUNT]),
            reads: AtomicUsize::new(0),
        })
    }

    pub fn set_level(&self, level: u8) {
        *self.bins.lock().unwrap() = vec![level; FREQUENCY_BIN_COUNT];
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FrequencySnapshot for FixedSnapshot {
    fn frequency_bin_count(&self) -> usize {
        FREQUENCY_BIN_COUNT
    }

    fn byte_frequency_data(&self, bins: &mut [u8]) {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let current = self.bins.lock().unwrap();
        for (out, value) in bins.iter_mut().zip(current.iter()) {
            *out = *value;
        }
    }
}

/// Input that delivers a fixed list of chunks and keeps the stream open until stopped
pub struct ScriptedInput {
    chunks: Vec<Vec<u8>>,
    snapshot: Arc<FixedSnapshot>,
    deny: bool,
    sender: Option<mpsc::Sender<Vec<u8>>>,
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn new(chunks: Vec<Vec<u8>>, snapshot: Arc<FixedSnapshot>) -> Self {
        Self {
            chunks,
            snapshot,
            deny: false,
            sender: None,
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn denied() -> Self {
        let mut input = Self::new(Vec::new(), FixedSnapshot::new(0));
        input.deny = true;
        input
    }
}

#[async_trait::async_trait]
impl AudioInput for ScriptedInput {
    async fn start(&mut self) -> Result<CaptureStreams, CaptureError> {
        if self.deny {
            return Err(CaptureError::PermissionDenied(
                "permission denied by test".to_string(),
            ));
        }
        if self.sender.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        self.starts.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(self.chunks.len() + 1);
        for chunk in &self.chunks {
            tx.try_send(chunk.clone())
                .map_err(|e| CaptureError::Stream(e.to_string()))?;
        }
        self.sender = Some(tx);

        Ok(CaptureStreams {
            chunks: rx,
            analyser: self.snapshot.clone(),
        })
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if self.sender.take().is_some() {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.sender.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub const BOUNDARY: &str = "voice-recorder-test-boundary";

/// A multipart/form-data body; each field is (name, filename, bytes)
pub fn multipart_body(fields: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, file_name, bytes) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Names of the files in `dir`, sorted
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
