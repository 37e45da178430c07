use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::info;

use crate::error::PipelineError;

/// One fragment of recorded audio, delivered incrementally during capture.
///
/// The payload is an opaque slice of a container blob; chunks from one
/// session concatenate into a single decodable recording.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Container bytes for this fragment
    pub data: Vec<u8>,
    /// Delivery order within the session (0-indexed)
    pub seq: u32,
}

/// Configuration for audio recorders
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Preferred capture sample rate (the device may impose its own)
    pub target_sample_rate: u32,
    /// Preferred channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Maximum payload size per delivered chunk
    pub max_chunk_bytes: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // nominal speech capture rate
            target_channels: 1,        // mono
            max_chunk_bytes: 64 * 1024,
        }
    }
}

/// Audio capture source trait
///
/// Implementations:
/// - Microphone: cpal default input device
/// - File: replay a pre-recorded container (CLI and tests)
#[async_trait::async_trait]
pub trait Recorder: Send + Sync {
    /// Begin capturing. Returns a channel receiver that delivers chunks;
    /// the channel closes once the final chunk has been sent.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, PipelineError>;

    /// Signal the recorder to finalize and release its device.
    async fn stop(&mut self) -> Result<(), PipelineError>;

    /// Whether a capture is currently active
    fn is_capturing(&self) -> bool;

    /// Recorder name for logging
    fn name(&self) -> &str;
}

/// Audio capture source type
#[derive(Debug, Clone)]
pub enum RecorderSource {
    /// Default microphone input device
    Microphone,
    /// Pre-recorded audio file
    File(PathBuf),
}

/// Recorder factory
pub struct RecorderFactory;

impl RecorderFactory {
    pub fn create(
        source: RecorderSource,
        config: RecorderConfig,
    ) -> Result<Box<dyn Recorder>, PipelineError> {
        match source {
            RecorderSource::Microphone => {
                use super::microphone::MicrophoneRecorder;
                Ok(Box::new(MicrophoneRecorder::new(config)))
            }
            RecorderSource::File(path) => Ok(Box::new(FileRecorder::new(path, config))),
        }
    }
}

/// Replays an audio file through the chunk channel, as if it had been
/// captured live.
pub struct FileRecorder {
    path: PathBuf,
    config: RecorderConfig,
    capturing: bool,
}

impl FileRecorder {
    pub fn new(path: PathBuf, config: RecorderConfig) -> Self {
        Self {
            path,
            config,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl Recorder for FileRecorder {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, PipelineError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            PipelineError::PermissionDenied(format!(
                "cannot read audio file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        info!(
            "Replaying audio file: {} ({} bytes)",
            self.path.display(),
            bytes.len()
        );

        let (tx, rx) = mpsc::channel(16);
        let max_chunk_bytes = self.config.max_chunk_bytes.max(1);

        tokio::spawn(async move {
            for (seq, piece) in bytes.chunks(max_chunk_bytes).enumerate() {
                let chunk = AudioChunk {
                    data: piece.to_vec(),
                    seq: seq as u32,
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
            // Dropping the sender closes the channel and marks the final chunk
        });

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), PipelineError> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}
