pub mod buffer;
pub mod decode;
pub mod microphone;
pub mod recorder;
pub mod wav;

pub use buffer::DecodedAudio;
pub use decode::{AudioDecoder, SymphoniaDecoder};
pub use microphone::MicrophoneRecorder;
pub use recorder::{
    AudioChunk, FileRecorder, Recorder, RecorderConfig, RecorderFactory, RecorderSource,
};
pub use wav::{encode_wav, WAV_HEADER_LEN};
