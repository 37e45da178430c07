use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::PipelineError;

/// Result of a successful transcription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    /// Text recognized by the server
    pub transcribed_text: String,
    /// Server-assigned storage path for the uploaded recording
    pub audio_path: String,
}

/// Transcription boundary: accepts an encoded WAV blob, returns the
/// server's transcription. Injected into the session so tests can supply
/// a fake implementation without a live endpoint.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcription, PipelineError>;
}

/// Wire shape of the `/process_audio` response. The server sends either
/// `transcribed_text` + `audio_path` or a bare `error` field.
#[derive(Debug, Deserialize)]
struct ProcessAudioResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    transcribed_text: Option<String>,
    #[serde(default)]
    audio_path: Option<String>,
}

/// HTTP client for the `/process_audio` transcription endpoint.
pub struct HttpTranscriptionClient {
    client: Client,
    endpoint: String,
}

impl HttpTranscriptionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn url(&self) -> String {
        format!("{}/process_audio", self.endpoint.trim_end_matches('/'))
    }
}

/// Interpret a `/process_audio` response body.
///
/// The server reports failures in-band through an `error` field, so the body
/// is parsed the same way regardless of HTTP status; a body that is not the
/// expected JSON shape is a transport-level failure.
pub(crate) fn parse_response(body: &str) -> Result<Transcription, PipelineError> {
    let parsed: ProcessAudioResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::NetworkFailure(format!("malformed server response: {}", e)))?;

    if let Some(error) = parsed.error {
        return Err(PipelineError::ServerReported(error));
    }

    match parsed.transcribed_text {
        Some(transcribed_text) => Ok(Transcription {
            transcribed_text,
            audio_path: parsed.audio_path.unwrap_or_default(),
        }),
        None => Err(PipelineError::NetworkFailure(
            "server response had neither transcribed_text nor error".to_string(),
        )),
    }
}

#[async_trait::async_trait]
impl Transcriber for HttpTranscriptionClient {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcription, PipelineError> {
        info!("Uploading recording: {} WAV bytes", wav.len());

        let part = Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| PipelineError::NetworkFailure(e.to_string()))?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(self.url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::NetworkFailure(e.to_string()))?;

        debug!("Transcription endpoint returned {}", status);

        let transcription = parse_response(&body)?;
        info!(
            "Transcription received: {} chars, stored at {}",
            transcription.transcribed_text.len(),
            transcription.audio_path
        );

        Ok(transcription)
    }
}
