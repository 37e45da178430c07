//! Transcription endpoint client
//!
//! Packages an encoded WAV recording into a multipart request against the
//! PaperLytic `/process_audio` endpoint and relays the server's result.

mod client;

pub use client::{HttpTranscriptionClient, Transcriber, Transcription};
