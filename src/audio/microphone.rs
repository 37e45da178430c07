use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use hound::{WavSpec, WavWriter};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::recorder::{AudioChunk, Recorder, RecorderConfig};
use crate::error::PipelineError;

type SharedWriter = Arc<Mutex<Option<WavWriter<std::io::BufWriter<fs::File>>>>>;

/// Captures from the default input device via cpal.
///
/// cpal streams are not `Send`, so all device work happens on a dedicated
/// worker thread that owns the stream for the duration of the capture.
/// Samples are written into a WAV container in a scratch file; when the
/// capture stops the container is finalized, read back, and delivered
/// through the chunk channel in bounded pieces.
pub struct MicrophoneRecorder {
    config: RecorderConfig,
    stop_flag: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("paperlytic-capture-{}.wav", uuid::Uuid::new_v4()))
    }

    fn open_device() -> Result<(Device, StreamConfig, SampleFormat), PipelineError> {
        let host = cpal::default_host();

        let device = host.default_input_device().ok_or_else(|| {
            PipelineError::PermissionDenied("no audio input device found".to_string())
        })?;

        let supported = device.default_input_config().map_err(|e| {
            PipelineError::PermissionDenied(format!("no supported input configuration: {}", e))
        })?;

        info!(
            "Using input device {:?}: {} Hz, {} channels, {:?}",
            device.name(),
            supported.sample_rate().0,
            supported.channels(),
            supported.sample_format()
        );

        let sample_format = supported.sample_format();
        Ok((device, supported.into(), sample_format))
    }

    fn build_stream(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        writer: SharedWriter,
        stop_flag: Arc<AtomicBool>,
    ) -> Result<cpal::Stream, PipelineError> {
        match sample_format {
            SampleFormat::I16 => Self::build_stream_typed::<i16>(device, config, writer, stop_flag),
            SampleFormat::U16 => Self::build_stream_typed::<u16>(device, config, writer, stop_flag),
            SampleFormat::F32 => Self::build_stream_typed::<f32>(device, config, writer, stop_flag),
            other => Err(PipelineError::PermissionDenied(format!(
                "unsupported input sample format: {:?}",
                other
            ))),
        }
    }

    fn build_stream_typed<T>(
        device: &Device,
        config: &StreamConfig,
        writer: SharedWriter,
        stop_flag: Arc<AtomicBool>,
    ) -> Result<cpal::Stream, PipelineError>
    where
        T: cpal::SizedSample + Send + 'static,
        f32: cpal::FromSample<T>,
    {
        let err_fn = |err| error!("Audio stream error: {}", err);

        let stream = device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if stop_flag.load(Ordering::SeqCst) {
                        return;
                    }

                    let mut guard = match writer.lock() {
                        Ok(guard) => guard,
                        Err(_) => return, // poisoned, capture is over
                    };
                    if let Some(ref mut w) = *guard {
                        for &sample in data {
                            let value: f32 = cpal::Sample::from_sample(sample);
                            let quantized = (value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                            if w.write_sample(quantized).is_err() {
                                error!("Failed to buffer captured sample");
                                break;
                            }
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                PipelineError::PermissionDenied(format!("failed to open input stream: {}", e))
            })?;

        Ok(stream)
    }

    /// Worker thread body: owns the device and stream, polls the stop flag,
    /// then finalizes the container and ships it through the chunk channel.
    fn run_capture(
        stop_flag: Arc<AtomicBool>,
        capturing: Arc<AtomicBool>,
        ready_tx: oneshot::Sender<Result<(), PipelineError>>,
        chunk_tx: mpsc::Sender<AudioChunk>,
        max_chunk_bytes: usize,
    ) {
        let (device, stream_config, sample_format) = match Self::open_device() {
            Ok(parts) => parts,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        let spec = WavSpec {
            channels: stream_config.channels,
            sample_rate: stream_config.sample_rate.0,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let scratch = Self::scratch_path();
        let writer: SharedWriter = match WavWriter::create(&scratch, spec) {
            Ok(w) => Arc::new(Mutex::new(Some(w))),
            Err(e) => {
                let _ = ready_tx.send(Err(PipelineError::PermissionDenied(format!(
                    "failed to create capture buffer: {}",
                    e
                ))));
                return;
            }
        };

        let stream = match Self::build_stream(
            &device,
            &stream_config,
            sample_format,
            Arc::clone(&writer),
            Arc::clone(&stop_flag),
        ) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(PipelineError::PermissionDenied(format!(
                "failed to start input stream: {}",
                e
            ))));
            return;
        }

        capturing.store(true, Ordering::SeqCst);
        if ready_tx.send(Ok(())).is_err() {
            // Caller went away before capture began
            capturing.store(false, Ordering::SeqCst);
            let _ = fs::remove_file(&scratch);
            return;
        }

        while !stop_flag.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(25));
        }

        // Release the device before handing off the recording
        drop(stream);
        capturing.store(false, Ordering::SeqCst);

        let finalized = {
            let mut guard = match writer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.take() {
                Some(w) => w.finalize(),
                None => return,
            }
        };

        if let Err(e) = finalized {
            error!("Failed to finalize capture container: {}", e);
            let _ = fs::remove_file(&scratch);
            return;
        }

        let bytes = match fs::read(&scratch) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read back capture container: {}", e);
                let _ = fs::remove_file(&scratch);
                return;
            }
        };
        let _ = fs::remove_file(&scratch);

        info!("Capture finalized: {} container bytes", bytes.len());

        for (seq, piece) in bytes.chunks(max_chunk_bytes.max(1)).enumerate() {
            let chunk = AudioChunk {
                data: piece.to_vec(),
                seq: seq as u32,
            };
            if chunk_tx.blocking_send(chunk).is_err() {
                warn!("Chunk receiver dropped before capture was delivered");
                break;
            }
        }
        // Dropping chunk_tx closes the channel: final chunk delivered
    }
}

#[async_trait::async_trait]
impl Recorder for MicrophoneRecorder {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>, PipelineError> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(PipelineError::PermissionDenied(
                "microphone is already in use by an active session".to_string(),
            ));
        }

        self.stop_flag.store(false, Ordering::SeqCst);

        let (chunk_tx, chunk_rx) = mpsc::channel(16);
        let (ready_tx, ready_rx) = oneshot::channel();

        let stop_flag = Arc::clone(&self.stop_flag);
        let capturing = Arc::clone(&self.capturing);
        let max_chunk_bytes = self.config.max_chunk_bytes;

        let worker = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                Self::run_capture(stop_flag, capturing, ready_tx, chunk_tx, max_chunk_bytes);
            })
            .map_err(|e| {
                PipelineError::PermissionDenied(format!("failed to spawn capture thread: {}", e))
            })?;

        self.worker = Some(worker);

        // Surface device acquisition errors from the worker thread
        match ready_rx.await {
            Ok(Ok(())) => Ok(chunk_rx),
            Ok(Err(e)) => {
                self.join_worker().await;
                Err(e)
            }
            Err(_) => {
                self.join_worker().await;
                Err(PipelineError::PermissionDenied(
                    "capture thread exited before the device was ready".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), PipelineError> {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.join_worker().await;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl MicrophoneRecorder {
    async fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let join = tokio::task::spawn_blocking(move || worker.join());
            match join.await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => error!("Capture thread panicked"),
                Err(e) => error!("Failed to join capture thread: {}", e),
            }
        }
    }
}

impl Drop for MicrophoneRecorder {
    fn drop(&mut self) {
        // Make sure a dangling worker thread winds down and frees the device
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}
