use thiserror::Error;

/// Errors produced by the voice pipeline.
///
/// Every variant is recovered at the session boundary: it is turned into a
/// status message and the session's resources (device handle, chunk buffer)
/// are released regardless of which stage failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Microphone access was refused or no usable input device exists.
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    /// The recorded container could not be decoded into PCM.
    #[error("failed to decode recorded audio: {0}")]
    DecodeFailure(String),

    /// The transcription request failed at the transport level or returned
    /// a malformed body.
    #[error("transcription request failed: {0}")]
    NetworkFailure(String),

    /// The transcription server responded with an explicit error field.
    #[error("{0}")]
    ServerReported(String),

    /// The session was stopped before any audio data was captured.
    #[error("recording produced no audio data")]
    EmptySession,
}
