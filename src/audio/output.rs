//! Device output through cpal.
//!
//! Each started cue becomes a voice in a small mixer; the output callback sums
//! all live voices, so cues from overlapping sequences sound together.

use super::decode::decode_file;
use super::resample::{remix, resample};
use super::{AudioSink, SinkError};
use crate::error::{KioskError, Result};
use crate::kernel::registry::AudioAsset;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

struct Voice {
    samples: Vec<f32>,
    pos: usize,
}

/// Sums interleaved voices into an output buffer.
pub struct VoiceMixer {
    voices: Vec<Voice>,
    volume: f32,
}

impl VoiceMixer {
    pub fn new(volume: f32) -> Self {
        Self {
            voices: Vec::new(),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    /// Queues interleaved samples already in the output format.
    pub fn add(&mut self, samples: Vec<f32>) {
        if !samples.is_empty() {
            self.voices.push(Voice { samples, pos: 0 });
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Fills `out` with the mix and drops finished voices. Silence when idle.
    pub fn fill<T>(&mut self, out: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        for slot in out.iter_mut() {
            let mut acc = 0.0f32;
            for voice in &mut self.voices {
                if let Some(sample) = voice.samples.get(voice.pos) {
                    acc += sample;
                    voice.pos += 1;
                }
            }
            *slot = T::from_sample((acc * self.volume).clamp(-1.0, 1.0));
        }
        self.voices.retain(|v| v.pos < v.samples.len());
    }
}

/// Plays cues on a cpal output device.
///
/// The cpal stream lives on its own thread (streams are not `Send` on every
/// host); dropping the sink ends that thread and closes the device.
pub struct CpalSink {
    mixer: Arc<Mutex<VoiceMixer>>,
    format: OutputFormat,
    _shutdown: mpsc::Sender<()>,
}

impl CpalSink {
    /// Opens `device_name`, falling back to the host default when it is absent.
    pub fn open(device_name: Option<&str>, volume: f32) -> Result<Self> {
        let mixer = Arc::new(Mutex::new(VoiceMixer::new(volume)));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_mixer = Arc::clone(&mixer);
        let device_name = device_name.map(str::to_string);
        std::thread::Builder::new()
            .name("cue-output".to_string())
            .spawn(move || match build_stream(device_name.as_deref(), thread_mixer) {
                Ok((stream, format)) => {
                    let _ = ready_tx.send(Ok(format));
                    // Returns once the sink (the only sender) is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    debug!("Cue output stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let format = ready_rx
            .recv()
            .map_err(|_| KioskError::AudioOutput("output thread exited during setup".to_string()))??;

        info!(
            "Cue output ready: {}Hz, {} channel(s)",
            format.sample_rate, format.channels
        );

        Ok(Self {
            mixer,
            format,
            _shutdown: shutdown_tx,
        })
    }

    fn mixer(&self) -> MutexGuard<'_, VoiceMixer> {
        self.mixer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AudioSink for CpalSink {
    fn start(&self, asset: &AudioAsset) -> std::result::Result<(), SinkError> {
        let decoded = decode_file(&asset.path).map_err(|e| SinkError::Decode(e.to_string()))?;

        let mixed = remix(&decoded.samples, decoded.channels, self.format.channels);
        let samples = resample(
            &mixed,
            decoded.sample_rate,
            self.format.sample_rate,
            self.format.channels,
        )
        .map_err(|e| SinkError::Decode(e.to_string()))?;

        debug!("Voice added for {} ({} samples)", asset.key, samples.len());
        self.mixer().add(samples);
        Ok(())
    }
}

fn build_stream(
    device_name: Option<&str>,
    mixer: Arc<Mutex<VoiceMixer>>,
) -> Result<(cpal::Stream, OutputFormat)> {
    let host = cpal::default_host();

    let named = match device_name {
        Some(name) => {
            let found = host
                .output_devices()
                .map_err(|e| KioskError::AudioOutput(format!("enumerate devices: {}", e)))?
                .find(|d| d.name().ok().as_deref() == Some(name));
            if found.is_none() {
                warn!("Output device '{}' not found, using default", name);
            }
            found
        }
        None => None,
    };
    let device = match named {
        Some(device) => device,
        None => host
            .default_output_device()
            .ok_or_else(|| KioskError::AudioOutput("no output device available".to_string()))?,
    };
    info!("Cue output device: {}", device.name().unwrap_or_default());

    let supported = device
        .default_output_config()
        .map_err(|e| KioskError::AudioOutput(format!("device config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let format = OutputFormat {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => stream_for::<f32>(&device, &config, mixer)?,
        cpal::SampleFormat::I16 => stream_for::<i16>(&device, &config, mixer)?,
        cpal::SampleFormat::U16 => stream_for::<u16>(&device, &config, mixer)?,
        other => {
            return Err(KioskError::AudioOutput(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };

    stream
        .play()
        .map_err(|e| KioskError::AudioOutput(format!("start stream: {}", e)))?;

    Ok((stream, format))
}

fn stream_for<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<Mutex<VoiceMixer>>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let err_fn = |err| error!("Cue output stream error: {}", err);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| match mixer.try_lock() {
                Ok(mut mixer) => mixer.fill(data),
                // Never block the audio thread; a contended buffer plays silence.
                Err(_) => data.iter_mut().for_each(|s| *s = T::EQUILIBRIUM),
            },
            err_fn,
            None,
        )
        .map_err(|e| KioskError::AudioOutput(format!("build stream: {}", e)))
}
