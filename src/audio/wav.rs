use super::buffer::DecodedAudio;

/// Size of the canonical RIFF/WAVE header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// Bytes per sample for 16-bit PCM.
const BYTES_PER_SAMPLE: usize = 2;

/// Encode decoded audio as a canonical 16-bit PCM little-endian WAV blob.
///
/// The output is always exactly `44 + frames * channels * 2` bytes: a 44-byte
/// RIFF header followed by interleaved samples. Multi-channel input is
/// interleaved frame by frame (standard PCM interleaving); mono input is
/// written straight through. A zero-frame buffer still produces a well-formed
/// header with a zero-length data chunk.
///
/// Pure function: encoding the same buffer twice yields byte-identical output.
pub fn encode_wav(audio: &DecodedAudio) -> Vec<u8> {
    let num_channels = audio.num_channels().max(1) as u16;
    let frames = audio.frames();
    let data_size = frames * num_channels as usize * BYTES_PER_SAMPLE;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_size);
    write_header(&mut out, audio.sample_rate, num_channels, data_size as u32);

    if audio.num_channels() == 1 {
        for &sample in &audio.channels[0] {
            out.extend_from_slice(&quantize(sample).to_le_bytes());
        }
    } else {
        // Interleave: output index i*n + c holds channel c's sample at frame i
        for i in 0..frames {
            for channel in &audio.channels {
                out.extend_from_slice(&quantize(channel[i]).to_le_bytes());
            }
        }
    }

    out
}

/// Write the 44-byte RIFF/WAVE header for 16-bit PCM.
fn write_header(out: &mut Vec<u8>, sample_rate: u32, num_channels: u16, data_size: u32) {
    let byte_rate = sample_rate * num_channels as u32 * BYTES_PER_SAMPLE as u32;
    let block_align = num_channels * BYTES_PER_SAMPLE as u16;

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // audio format: PCM
    out.extend_from_slice(&num_channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
}

/// Clamp a float sample to [-1, 1] and map it to a signed 16-bit value.
///
/// Negative values scale by 32768 so that -1.0 maps to i16::MIN; non-negative
/// values scale by 32767 so that 1.0 maps to i16::MAX. The cast truncates
/// toward zero, with no additional rounding.
fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}
