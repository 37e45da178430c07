//! Voice session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Microphone capture and chunk accumulation
//! - The decode -> WAV-encode -> upload pipeline on stop
//! - The human-readable status surface
//! - Session statistics and state management

mod config;
mod session;
mod stats;
mod status;

pub use config::SessionConfig;
pub use session::RecordingSession;
pub use stats::SessionStats;
pub use status::PipelineStatus;
