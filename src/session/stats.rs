use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds since creation
    pub duration_secs: f64,

    /// Number of capture chunks received so far
    pub chunks_count: usize,
}
