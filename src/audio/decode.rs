use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::buffer::DecodedAudio;
use crate::error::PipelineError;

/// Decode boundary: turns a recorded container blob into planar f32 PCM.
///
/// Injected into the session so tests can supply a fake implementation
/// without real audio data.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedAudio, PipelineError>;
}

/// Decoder backed by symphonia. Accepts any container/codec the probe
/// recognizes (WAV, MP3, FLAC, OGG, M4A).
#[derive(Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedAudio, PipelineError> {
        if data.is_empty() {
            return Err(PipelineError::DecodeFailure(
                "no audio data to decode".to_string(),
            ));
        }

        let mss = MediaSourceStream::new(
            Box::new(Cursor::new(data.to_vec())),
            Default::default(),
        );

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                PipelineError::DecodeFailure(format!("unrecognized audio container: {}", e))
            })?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                PipelineError::DecodeFailure("no decodable audio track found".to_string())
            })?;
        let track_id = track.id;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                PipelineError::DecodeFailure(format!("unsupported audio codec: {}", e))
            })?;

        let mut sample_rate = 0u32;
        let mut channels: Vec<Vec<f32>> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(PipelineError::DecodeFailure(format!(
                        "error reading audio packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet, skip and keep going
                    warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(PipelineError::DecodeFailure(format!(
                        "error decoding audio packet: {}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            if sample_rate == 0 {
                sample_rate = spec.rate;
                channels = vec![Vec::new(); spec.channels.count()];
            }

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            let num_channels = channels.len();
            for frame in sample_buf.samples().chunks_exact(num_channels) {
                for (channel, &sample) in channels.iter_mut().zip(frame) {
                    channel.push(sample);
                }
            }
        }

        if sample_rate == 0 {
            return Err(PipelineError::DecodeFailure(
                "container held no audio frames".to_string(),
            ));
        }

        let audio = DecodedAudio::new(sample_rate, channels);
        debug!(
            "Decoded {:.2}s of audio: {} Hz, {} channels, {} frames",
            audio.duration_seconds(),
            audio.sample_rate,
            audio.num_channels(),
            audio.frames()
        );

        Ok(audio)
    }
}
