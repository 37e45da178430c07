// Integration tests for the full voice session pipeline
//
// These tests drive RecordingSession end to end against fake capture and
// transcription providers, with the real decoder and WAV encoder in the
// middle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use paperlytic_voice::audio::{AudioChunk, Recorder, SymphoniaDecoder};
use paperlytic_voice::{
    PipelineError, PipelineStatus, RecordingSession, SessionConfig, Transcriber, Transcription,
};
use tokio::sync::mpsc;

/// Capture fake: delivers a pre-baked container split into chunks, and
/// records whether its "device" was released.
struct FakeRecorder {
    recording: Vec<u8>,
    chunk_size: usize,
    capturing: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl FakeRecorder {
    fn new(recording: Vec<u8>, chunk_size: usize) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let recorder = Self {
            recording,
            chunk_size,
            capturing: Arc::new(AtomicBool::new(false)),
            released: Arc::clone(&released),
        };
        (recorder, released)
    }
}

#[async_trait::async_trait]
impl Recorder for FakeRecorder {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, PipelineError> {
        let (tx, rx) = mpsc::channel(16);
        let recording = self.recording.clone();
        let chunk_size = self.chunk_size.max(1);

        tokio::spawn(async move {
            for (seq, piece) in recording.chunks(chunk_size).enumerate() {
                let chunk = AudioChunk {
                    data: piece.to_vec(),
                    seq: seq as u32,
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });

        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), PipelineError> {
        self.capturing.store(false, Ordering::SeqCst);
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Recorder whose device acquisition always fails.
struct DeniedRecorder;

#[async_trait::async_trait]
impl Recorder for DeniedRecorder {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, PipelineError> {
        Err(PipelineError::PermissionDenied(
            "no audio input device found".to_string(),
        ))
    }

    async fn stop(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "denied"
    }
}

/// Transcriber fake: captures the uploaded WAV and returns a scripted reply.
struct FakeTranscriber {
    reply: Result<Transcription, String>,
    uploads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeTranscriber {
    fn succeeding(text: &str, path: &str) -> (Self, Arc<Mutex<Vec<Vec<u8>>>>) {
        let uploads = Arc::new(Mutex::new(Vec::new()));
        let fake = Self {
            reply: Ok(Transcription {
                transcribed_text: text.to_string(),
                audio_path: path.to_string(),
            }),
            uploads: Arc::clone(&uploads),
        };
        (fake, uploads)
    }

    fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcription, PipelineError> {
        self.uploads.lock().unwrap().push(wav);
        match &self.reply {
            Ok(t) => Ok(t.clone()),
            Err(e) => Err(PipelineError::ServerReported(e.clone())),
        }
    }
}

/// Build a small mono WAV container with hound, as the capture subsystem
/// would produce.
fn fake_recording(num_samples: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..num_samples {
            writer.write_sample(((i % 200) as i16 - 100) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn session_with(
    recorder: Box<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
) -> RecordingSession {
    RecordingSession::new(
        SessionConfig::default(),
        recorder,
        Arc::new(SymphoniaDecoder::new()),
        transcriber,
    )
}

#[tokio::test]
async fn test_full_pipeline_produces_transcript() {
    let recording = fake_recording(1600);
    let (recorder, released) = FakeRecorder::new(recording, 256);
    let (transcriber, uploads) = FakeTranscriber::succeeding("hello there", "recordings/a.wav");

    let mut session = session_with(Box::new(recorder), Arc::new(transcriber));
    let mut status_rx = session.status();

    session.start().await.unwrap();
    assert_eq!(*status_rx.borrow_and_update(), PipelineStatus::Recording);

    let transcription = session.stop().await.unwrap();
    assert_eq!(transcription.transcribed_text, "hello there");
    assert_eq!(transcription.audio_path, "recordings/a.wav");
    assert!(released.load(Ordering::SeqCst), "device must be released");

    // The uploaded blob must be a canonical WAV of the decoded recording
    let uploads = uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    let wav = &uploads[0];
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(wav.len(), 44 + 1600 * 2);

    assert!(matches!(*session.status().borrow(), PipelineStatus::Done { .. }));
    assert_eq!(
        session.status_text(),
        "Audio processed. Saved at: recordings/a.wav"
    );
}

#[tokio::test]
async fn test_server_error_surfaces_in_status_without_transcript() {
    let recording = fake_recording(320);
    let (recorder, _) = FakeRecorder::new(recording, 64);
    let transcriber = FakeTranscriber::failing("x");

    let mut session = session_with(Box::new(recorder), Arc::new(transcriber));

    session.start().await.unwrap();
    let result = session.stop().await;

    match result {
        Err(PipelineError::ServerReported(msg)) => assert!(msg.contains('x')),
        other => panic!("expected ServerReported, got {:?}", other.err()),
    }
    assert!(session.status_text().contains('x'));
    assert!(session.status_text().starts_with("Error:"));
}

#[tokio::test]
async fn test_undecodable_recording_releases_device() {
    let (recorder, released) = FakeRecorder::new(b"not an audio container".to_vec(), 8);
    let (transcriber, uploads) = FakeTranscriber::succeeding("unused", "unused");

    let mut session = session_with(Box::new(recorder), Arc::new(transcriber));

    session.start().await.unwrap();
    let result = session.stop().await;

    assert!(matches!(result, Err(PipelineError::DecodeFailure(_))));
    assert!(
        released.load(Ordering::SeqCst),
        "device must be released even when decode fails"
    );
    assert!(
        uploads.lock().unwrap().is_empty(),
        "nothing may be uploaded after a decode failure"
    );
    assert!(session.status_text().starts_with("Error:"));
}

#[tokio::test]
async fn test_empty_capture_is_an_explicit_error() {
    let (recorder, released) = FakeRecorder::new(Vec::new(), 64);
    let (transcriber, uploads) = FakeTranscriber::succeeding("unused", "unused");

    let mut session = session_with(Box::new(recorder), Arc::new(transcriber));

    session.start().await.unwrap();
    let result = session.stop().await;

    assert!(matches!(result, Err(PipelineError::EmptySession)));
    assert!(released.load(Ordering::SeqCst));
    assert!(uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_permission_denied_sets_error_status() {
    let (transcriber, _) = FakeTranscriber::succeeding("unused", "unused");
    let mut session = session_with(Box::new(DeniedRecorder), Arc::new(transcriber));

    let result = session.start().await;

    assert!(matches!(result, Err(PipelineError::PermissionDenied(_))));
    assert!(session.status_text().contains("no audio input device"));
}

#[tokio::test]
async fn test_double_start_is_rejected_quietly() {
    let recording = fake_recording(160);
    let (recorder, _) = FakeRecorder::new(recording, 64);
    let (transcriber, _) = FakeTranscriber::succeeding("once", "recordings/b.wav");

    let mut session = session_with(Box::new(recorder), Arc::new(transcriber));

    session.start().await.unwrap();
    // Second start while active is a no-op, not an error
    session.start().await.unwrap();

    let transcription = session.stop().await.unwrap();
    assert_eq!(transcription.transcribed_text, "once");
}

#[tokio::test]
async fn test_stop_without_start_is_empty_session() {
    let (recorder, _) = FakeRecorder::new(fake_recording(160), 64);
    let (transcriber, uploads) = FakeTranscriber::succeeding("unused", "unused");

    let mut session = session_with(Box::new(recorder), Arc::new(transcriber));

    let result = session.stop().await;
    assert!(matches!(result, Err(PipelineError::EmptySession)));
    assert!(uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stats_track_chunks() {
    let recording = fake_recording(1600); // ~3.2 KB container
    let (recorder, _) = FakeRecorder::new(recording.clone(), 512);
    let (transcriber, _) = FakeTranscriber::succeeding("ok", "recordings/c.wav");

    let mut session = session_with(Box::new(recorder), Arc::new(transcriber));

    session.start().await.unwrap();
    session.stop().await.unwrap();

    let stats = session.stats();
    assert!(!stats.is_recording);
    let expected_chunks = recording.len().div_ceil(512);
    assert_eq!(stats.chunks_count, expected_chunks);
    assert!(stats.duration_secs >= 0.0);
}
