use serde::{Deserialize, Serialize};

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Preferred capture sample rate (speech endpoints expect 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Maximum payload size per delivered capture chunk
    pub max_chunk_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000, // nominal speech capture rate
            channels: 1,        // mono
            max_chunk_bytes: 64 * 1024,
        }
    }
}

impl SessionConfig {
    /// Derive the recorder-facing configuration.
    pub fn recorder_config(&self) -> crate::audio::RecorderConfig {
        crate::audio::RecorderConfig {
            target_sample_rate: self.sample_rate,
            target_channels: self.channels,
            max_chunk_bytes: self.max_chunk_bytes,
        }
    }
}
