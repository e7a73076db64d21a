use std::io::Cursor;

use super::backend::{CaptureError, EncodedChunk};

/// MIME type of the encoded stream
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Encodes live PCM into a streaming WAV byte sequence
///
/// The first chunk carries the WAV header with RIFF and data sizes marked as
/// unknown (`0xFFFFFFFF`); every chunk after that is raw little-endian PCM.
/// Concatenating all chunks in order yields a playable WAV stream.
pub struct WavChunkEncoder {
    spec: hound::WavSpec,
    header_sent: bool,
}

impl WavChunkEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            spec: hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            header_sent: false,
        }
    }

    pub fn spec(&self) -> hound::WavSpec {
        self.spec
    }

    /// Encode one slice of interleaved samples
    ///
    /// Returns an empty chunk when there is nothing to emit.
    pub fn encode(&mut self, samples: &[i16]) -> Result<EncodedChunk, CaptureError> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let mut chunk = if self.header_sent {
            Vec::with_capacity(samples.len() * 2)
        } else {
            self.header_sent = true;
            streaming_header(self.spec)?
        };

        chunk.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
        Ok(chunk)
    }
}

/// WAV header for a stream whose length is not known up front
fn streaming_header(spec: hound::WavSpec) -> Result<Vec<u8>, CaptureError> {
    let mut cursor = Cursor::new(Vec::new());
    hound::WavWriter::new(&mut cursor, spec)?.finalize()?;

    let mut header = cursor.into_inner();
    let len = header.len();
    // RIFF chunk size, then the data chunk size closing the header
    header[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
    header[len - 4..].copy_from_slice(&u32::MAX.to_le_bytes());

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_chunk_carries_header() {
        let mut encoder = WavChunkEncoder::new(16000, 1);
        let chunk = encoder.encode(&[1, 2, 3]).unwrap();

        assert_eq!(&chunk[0..4], b"RIFF");
        assert_eq!(&chunk[8..12], b"WAVE");
        assert_eq!(chunk.len(), 44 + 6);
        assert_eq!(&chunk[36..40], b"data");
        assert_eq!(&chunk[40..44], &u32::MAX.to_le_bytes());
        assert_eq!(&chunk[44..], &[1, 0, 2, 0, 3, 0]);
    }

    #[test]
    fn test_later_chunks_are_raw_pcm() {
        let mut encoder = WavChunkEncoder::new(16000, 1);
        encoder.encode(&[0; 10]).unwrap();

        let chunk = encoder.encode(&[-1, 256]).unwrap();
        assert_eq!(chunk, vec![0xFF, 0xFF, 0x00, 0x01]);
    }

    #[test]
    fn test_empty_slice_emits_nothing() {
        let mut encoder = WavChunkEncoder::new(16000, 1);
        assert!(encoder.encode(&[]).unwrap().is_empty());

        // Header still goes out with the first real slice
        let chunk = encoder.encode(&[5]).unwrap();
        assert_eq!(&chunk[0..4], b"RIFF");
    }
}
