use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of the PaperLytic backend hosting /process_audio
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PAPERLYTIC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
