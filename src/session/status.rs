use std::fmt;

/// Pipeline stage surfaced to the caller as a human-readable status line.
///
/// This is the only externally observable side channel besides the final
/// transcript itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    /// No capture active, ready to start
    Ready,
    /// Microphone acquired, chunks accumulating
    Recording,
    /// Capture finished; decode/encode/upload in progress
    Processing,
    /// Pipeline completed successfully
    Done {
        transcribed_text: String,
        audio_path: String,
    },
    /// A stage failed; the message describes which and why
    Error(String),
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStatus::Ready => write!(f, "Ready to record."),
            PipelineStatus::Recording => write!(f, "Recording..."),
            PipelineStatus::Processing => write!(f, "Processing audio..."),
            PipelineStatus::Done { audio_path, .. } => {
                write!(f, "Audio processed. Saved at: {}", audio_path)
            }
            PipelineStatus::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}
