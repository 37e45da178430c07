use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::stats::SessionStats;
use super::status::PipelineStatus;
use crate::audio::{encode_wav, AudioChunk, AudioDecoder, Recorder};
use crate::error::PipelineError;
use crate::transcribe::{Transcriber, Transcription};

/// A voice input session: capture, decode, WAV-encode, upload.
///
/// The session owns its capture/decode/transcribe collaborators, so tests
/// can run the whole pipeline against fake providers without a live
/// microphone or endpoint. One session drives at most one capture at a
/// time; the pipeline stages run strictly in order with no overlap.
pub struct RecordingSession {
    /// Session configuration
    config: SessionConfig,

    /// Capture source (microphone, file replay, or a test fake)
    recorder: Box<dyn Recorder>,

    /// Decodes the recorded container into planar float PCM
    decoder: Arc<dyn AudioDecoder>,

    /// Uploads the encoded WAV and relays the server result
    transcriber: Arc<dyn Transcriber>,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether recording is currently active
    is_recording: Arc<AtomicBool>,

    /// Number of capture chunks received
    chunks_received: Arc<AtomicUsize>,

    /// Status surface; receivers observe stage transitions
    status_tx: watch::Sender<PipelineStatus>,

    /// Handle for the chunk collector task
    collector_handle: Mutex<Option<JoinHandle<Vec<AudioChunk>>>>,
}

impl RecordingSession {
    pub fn new(
        config: SessionConfig,
        recorder: Box<dyn Recorder>,
        decoder: Arc<dyn AudioDecoder>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        info!("Creating voice session: {}", config.session_id);

        let (status_tx, _) = watch::channel(PipelineStatus::Ready);

        Self {
            config,
            recorder,
            decoder,
            transcriber,
            started_at: Utc::now(),
            is_recording: Arc::new(AtomicBool::new(false)),
            chunks_received: Arc::new(AtomicUsize::new(0)),
            status_tx,
            collector_handle: Mutex::new(None),
        }
    }

    /// Subscribe to status transitions.
    pub fn status(&self) -> watch::Receiver<PipelineStatus> {
        self.status_tx.subscribe()
    }

    /// Current status line.
    pub fn status_text(&self) -> String {
        self.status_tx.borrow().to_string()
    }

    /// Start capturing audio.
    pub async fn start(&mut self) -> Result<(), PipelineError> {
        if self.is_recording.load(Ordering::SeqCst) {
            warn!("Recording already started");
            return Ok(());
        }

        info!(
            "Starting capture for session {} via {}",
            self.config.session_id,
            self.recorder.name()
        );

        let mut chunk_rx = match self.recorder.start().await {
            Ok(rx) => rx,
            Err(e) => return Err(self.fail(e)),
        };

        self.is_recording.store(true, Ordering::SeqCst);
        self.chunks_received.store(0, Ordering::SeqCst);
        let _ = self.status_tx.send_replace(PipelineStatus::Recording);

        // Single consumer of the chunk channel; holds the buffer until stop
        let chunks_received = Arc::clone(&self.chunks_received);
        let collector = tokio::spawn(async move {
            let mut chunks = Vec::new();
            while let Some(chunk) = chunk_rx.recv().await {
                chunks_received.fetch_add(1, Ordering::SeqCst);
                chunks.push(chunk);
            }
            chunks
        });

        {
            let mut handle = self.collector_handle.lock().await;
            *handle = Some(collector);
        }

        Ok(())
    }

    /// Stop capturing and run the pipeline to completion: finalize the
    /// recording, release the device, then decode -> encode -> upload.
    pub async fn stop(&mut self) -> Result<Transcription, PipelineError> {
        if !self.is_recording.load(Ordering::SeqCst) {
            warn!("Stop requested but no capture is active");
            return Err(self.fail(PipelineError::EmptySession));
        }

        info!("Stopping capture for session {}", self.config.session_id);
        self.is_recording.store(false, Ordering::SeqCst);

        // Finalizing the recorder releases the device and closes the chunk
        // channel, which lets the collector drain the final chunk
        let stop_result = self.recorder.stop().await;

        let chunks = {
            let mut handle = self.collector_handle.lock().await;
            match handle.take() {
                Some(task) => match task.await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        error!("Chunk collector task panicked: {}", e);
                        Vec::new()
                    }
                },
                None => Vec::new(),
            }
        };

        // Device failures surface only after the collector has been reaped,
        // so session state is clean either way
        if let Err(e) = stop_result {
            return Err(self.fail(e));
        }

        let _ = self.status_tx.send_replace(PipelineStatus::Processing);

        let recording: Vec<u8> = chunks.into_iter().flat_map(|c| c.data).collect();
        if recording.is_empty() {
            return Err(self.fail(PipelineError::EmptySession));
        }

        info!("Capture complete: {} container bytes", recording.len());

        // Strict pipeline: each stage runs to completion before the next
        let decoded = match self.decoder.decode(&recording) {
            Ok(decoded) => decoded,
            Err(e) => return Err(self.fail(e)),
        };

        info!(
            "Decoded {:.2}s of audio ({} Hz, {} channels); encoding WAV",
            decoded.duration_seconds(),
            decoded.sample_rate,
            decoded.num_channels()
        );

        let wav = encode_wav(&decoded);

        let transcription = match self.transcriber.transcribe(wav).await {
            Ok(t) => t,
            Err(e) => return Err(self.fail(e)),
        };

        let _ = self.status_tx.send_replace(PipelineStatus::Done {
            transcribed_text: transcription.transcribed_text.clone(),
            audio_path: transcription.audio_path.clone(),
        });

        info!("Session {} complete", self.config.session_id);

        Ok(transcription)
    }

    /// Get current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            is_recording: self.is_recording.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_count: self.chunks_received.load(Ordering::SeqCst),
        }
    }

    /// Record a stage failure on the status surface and hand the error back.
    fn fail(&self, e: PipelineError) -> PipelineError {
        error!("Pipeline stage failed: {}", e);
        let _ = self.status_tx.send_replace(PipelineStatus::Error(e.to_string()));
        e
    }
}
