use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use paperlytic_voice::{
    encode_wav, Config, HttpTranscriptionClient, RecorderFactory, RecorderSource,
    RecordingSession, SessionConfig, SymphoniaDecoder,
};

#[derive(Parser)]
#[command(name = "paperlytic-voice", version, about = "Voice input pipeline for PaperLytic")]
struct Cli {
    /// Config file path, without extension
    #[arg(long, default_value = "config/paperlytic-voice")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the microphone, then transcribe
    Record {
        /// Seconds to record before stopping
        #[arg(long, default_value_t = 5)]
        duration: u64,
    },
    /// Run an existing audio file through the pipeline
    Transcribe {
        /// Audio file in any decodable container (WAV, MP3, OGG, FLAC, M4A)
        file: PathBuf,
    },
    /// Decode an audio file and write the canonical 16-bit PCM WAV locally
    Encode { input: PathBuf, output: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} starting", cfg.service.name);

    match cli.command {
        Command::Record { duration } => {
            let mut session = build_session(&cfg, RecorderSource::Microphone)?;
            watch_status(&session);

            session.start().await?;
            tokio::time::sleep(Duration::from_secs(duration)).await;
            let transcription = session.stop().await?;

            println!("{}", transcription.transcribed_text);
        }

        Command::Transcribe { file } => {
            let mut session = build_session(&cfg, RecorderSource::File(file))?;
            watch_status(&session);

            session.start().await?;
            let transcription = session.stop().await?;

            println!("{}", transcription.transcribed_text);
        }

        Command::Encode { input, output } => {
            use paperlytic_voice::AudioDecoder;

            let bytes = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let decoded = SymphoniaDecoder::new().decode(&bytes)?;
            let wav = encode_wav(&decoded);
            std::fs::write(&output, &wav)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            info!(
                "Wrote {} ({} bytes, {:.2}s, {} Hz, {} channels)",
                output.display(),
                wav.len(),
                decoded.duration_seconds(),
                decoded.sample_rate,
                decoded.num_channels()
            );
        }
    }

    Ok(())
}

fn build_session(cfg: &Config, source: RecorderSource) -> Result<RecordingSession> {
    let session_config = SessionConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        ..SessionConfig::default()
    };

    let recorder = RecorderFactory::create(source, session_config.recorder_config())?;
    let decoder = Arc::new(SymphoniaDecoder::new());
    let transcriber = Arc::new(HttpTranscriptionClient::new(
        cfg.transcription.endpoint.clone(),
        Duration::from_secs(cfg.transcription.timeout_secs),
    )?);

    Ok(RecordingSession::new(
        session_config,
        recorder,
        decoder,
        transcriber,
    ))
}

/// Print each status transition as the pipeline advances.
fn watch_status(session: &RecordingSession) {
    let mut status_rx = session.status();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let line = status_rx.borrow().to_string();
            println!("{}", line);
        }
    });
}
