/// Decoded audio held as planar (per-channel) 32-bit float samples.
///
/// Samples are nominally in [-1.0, 1.0] but decoder artifacts may push
/// individual values slightly outside that range; the WAV encoder clamps
/// them at quantization time.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// One sample vector per channel, all of equal length
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channel vectors must have equal length"
        );
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frame count (one sample per channel per frame).
    pub fn frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}
