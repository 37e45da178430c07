pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod transcribe;

pub use audio::{
    encode_wav, AudioChunk, AudioDecoder, DecodedAudio, FileRecorder, MicrophoneRecorder,
    Recorder, RecorderConfig, RecorderFactory, RecorderSource, SymphoniaDecoder, WAV_HEADER_LEN,
};
pub use config::Config;
pub use error::PipelineError;
pub use session::{PipelineStatus, RecordingSession, SessionConfig, SessionStats};
pub use transcribe::{HttpTranscriptionClient, Transcriber, Transcription};
