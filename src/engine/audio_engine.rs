//! Audio Engine
//!
//! Manages the cpal streams and interfaces with system audio hardware. The
//! output callback owns the live unit graph; the control side mutates it by
//! sending [`EngineCommand`]s over a lock-free queue, never by touching the
//! graph directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleRate, Stream, StreamConfig};
use log::{error, warn};
use rtrb::{Consumer, Producer};

use crate::dsp::convolver::synthetic_impulse;
use crate::dsp::mic::MicSource;
use crate::dsp::{self, UnitUpdate};
use crate::graph::{Module, ModuleBrand, ModuleKind};

use super::commands::{command_channel, EngineCommand};
use super::context::{
    AudioContext, CaptureHandle, Endpoint, OneShot, UnitError, UnitId, UnitMeta, UnitTable,
};
use super::unit_graph::UnitGraph;

/// Samples rendered per sweep of the unit graph.
const ENGINE_BLOCK_SIZE: usize = 128;

/// Capacity of each microphone's capture ring, in samples.
const MIC_RING_CAPACITY: usize = 16384;

/// Errors that can occur during audio engine operation.
#[derive(Debug, Clone)]
pub enum AudioError {
    /// No audio output device was found.
    NoOutputDevice,
    /// Failed to get device configuration.
    ConfigurationFailed(String),
    /// Failed to create the audio stream.
    StreamCreationFailed(String),
    /// Failed to start playback.
    StreamPlaybackFailed(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoOutputDevice => write!(f, "No audio output device found"),
            AudioError::ConfigurationFailed(msg) => {
                write!(f, "Failed to get device configuration: {}", msg)
            }
            AudioError::StreamCreationFailed(msg) => {
                write!(f, "Failed to create audio stream: {}", msg)
            }
            AudioError::StreamPlaybackFailed(msg) => {
                write!(f, "Failed to control audio playback: {}", msg)
            }
        }
    }
}

impl std::error::Error for AudioError {}

/// Owns the default output device until [`AudioEngine::start`] turns it into
/// a running [`EngineContext`].
pub struct AudioEngine {
    host: Host,
    device: Device,
    config: StreamConfig,
}

impl AudioEngine {
    /// Creates an engine on the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::ConfigurationFailed(e.to_string()))?;

        let sample_rate = supported_config.sample_rate().0;
        let config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            host,
            device,
            config,
        })
    }

    /// Sample rate of the output device in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Starts the output stream and returns the live audio context. The unit
    /// graph moves into the audio callback; `impulse_path` optionally names a
    /// WAV file used as the convolver impulse response.
    pub fn start(self, impulse_path: Option<PathBuf>) -> Result<EngineContext, AudioError> {
        let sample_rate = self.sample_rate();
        let channels = self.config.channels as usize;
        let (producer, consumer) = command_channel();

        let mut state = CallbackState {
            graph: UnitGraph::new(ENGINE_BLOCK_SIZE),
            commands: consumer,
            carry: Vec::with_capacity(ENGINE_BLOCK_SIZE),
            carry_pos: 0,
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    state.fill(data, channels);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamCreationFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlaybackFailed(e.to_string()))?;

        let impulse_response = load_impulse_response(impulse_path.as_deref(), sample_rate);

        Ok(EngineContext {
            commands: producer,
            units: UnitTable::new(),
            host: self.host,
            input_streams: HashMap::new(),
            impulse_response,
            sample_rate,
            _output_stream: stream,
        })
    }
}

/// State moved into the output callback.
struct CallbackState {
    graph: UnitGraph,
    commands: Consumer<EngineCommand>,
    /// Leftover samples from the last rendered block, when the hardware
    /// buffer size is not a multiple of the block size.
    carry: Vec<f32>,
    carry_pos: usize,
}

impl CallbackState {
    fn fill(&mut self, data: &mut [f32], channels: usize) {
        while let Ok(command) = self.commands.pop() {
            self.graph.apply(command);
        }

        for frame in data.chunks_mut(channels) {
            if self.carry_pos >= self.carry.len() {
                let block = self.graph.process();
                self.carry.clear();
                self.carry.extend_from_slice(block);
                self.carry_pos = 0;
            }
            let sample = self.carry[self.carry_pos];
            self.carry_pos += 1;
            for out in frame.iter_mut() {
                *out = sample;
            }
        }
    }
}

/// Live audio context backed by cpal. Lives on the control thread; the
/// input streams it opens for microphone modules are not `Send` and stay
/// here, feeding the audio thread through per-unit rings.
pub struct EngineContext {
    commands: Producer<EngineCommand>,
    units: UnitTable,
    host: Host,
    input_streams: HashMap<UnitId, Stream>,
    impulse_response: Vec<f32>,
    sample_rate: u32,
    _output_stream: Stream,
}

impl EngineContext {
    fn push(&mut self, command: EngineCommand) -> Result<(), UnitError> {
        self.commands
            .push(command)
            .map_err(|_| UnitError::QueueFull)
    }

    /// Opens a capture stream on the named input device (or the default
    /// device when the name is empty or unknown to match by equality).
    fn open_input_stream(&self, device_name: &str) -> Result<(Stream, Consumer<f32>), UnitError> {
        let device = self.find_input_device(device_name)?;
        let supported_config = device
            .default_input_config()
            .map_err(|e| UnitError::DeviceAccessDenied(e.to_string()))?;
        let config: StreamConfig = supported_config.into();
        let in_channels = config.channels as usize;

        let (mut producer, consumer) = rtrb::RingBuffer::new(MIC_RING_CAPACITY);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(in_channels) {
                        let mono = frame.iter().sum::<f32>() / in_channels as f32;
                        // Drop samples on overrun rather than block.
                        let _ = producer.push(mono);
                    }
                },
                move |err| {
                    error!("Audio input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| UnitError::DeviceAccessDenied(e.to_string()))?;

        stream
            .play()
            .map_err(|e| UnitError::DeviceAccessDenied(e.to_string()))?;

        Ok((stream, consumer))
    }

    fn find_input_device(&self, device_name: &str) -> Result<Device, UnitError> {
        if !device_name.is_empty() {
            let devices = self
                .host
                .input_devices()
                .map_err(|e| UnitError::DeviceAccessDenied(e.to_string()))?;
            for device in devices {
                if device.name().map(|n| n == device_name).unwrap_or(false) {
                    return Ok(device);
                }
            }
            warn!(
                "Input device '{}' not found, falling back to default",
                device_name
            );
        }
        self.host
            .default_input_device()
            .ok_or_else(|| UnitError::DeviceAccessDenied("no input device available".to_string()))
    }
}

impl AudioContext for EngineContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn create_unit(&mut self, module: &Module) -> Result<UnitId, UnitError> {
        let (node, capture, input_stream) = match &module.kind {
            ModuleKind::MicIn(param) => {
                let (stream, consumer) = self.open_input_stream(&param.mic)?;
                let node: Box<dyn dsp::Unit> = Box::new(MicSource::new(consumer));
                (node, None, Some(stream))
            }
            _ => {
                let (node, capture) =
                    dsp::build_unit(module, self.sample_rate, &self.impulse_response)?;
                (node, capture, None)
            }
        };

        let one_shot = match module.brand() {
            ModuleBrand::Oscillator => Some(OneShot::Armed),
            _ => None,
        };
        let id = self.units.register(UnitMeta {
            mod_targets: node.mod_targets(),
            one_shot,
            capture,
        });
        if let Some(stream) = input_stream {
            self.input_streams.insert(id, stream);
        }
        self.push(EngineCommand::InsertUnit { unit: id, node })?;
        Ok(id)
    }

    fn drop_unit(&mut self, unit: UnitId) -> Result<(), UnitError> {
        self.units.remove(unit)?;
        self.input_streams.remove(&unit);
        self.push(EngineCommand::RemoveUnit(unit))
    }

    fn connect(&mut self, source: UnitId, destination: Endpoint) -> Result<(), UnitError> {
        self.units.ensure_known(source)?;
        self.units.validate_endpoint(&destination)?;
        self.push(EngineCommand::Connect {
            source,
            destination,
        })
    }

    fn disconnect(&mut self, source: UnitId, destination: Endpoint) -> Result<(), UnitError> {
        self.units.ensure_known(source)?;
        self.units.validate_endpoint(&destination)?;
        self.push(EngineCommand::Disconnect {
            source,
            destination,
        })
    }

    fn start(&mut self, unit: UnitId) -> Result<(), UnitError> {
        self.units.begin_start(unit)?;
        self.push(EngineCommand::Start(unit))
    }

    fn stop(&mut self, unit: UnitId) -> Result<(), UnitError> {
        self.units.begin_stop(unit)?;
        self.push(EngineCommand::Stop(unit))
    }

    fn update(&mut self, unit: UnitId, update: UnitUpdate) -> Result<(), UnitError> {
        self.units.ensure_known(unit)?;
        self.push(EngineCommand::Update { unit, update })
    }

    fn capture(&mut self, unit: UnitId) -> Result<CaptureHandle, UnitError> {
        let buffer = self.units.capture(unit)?;
        Ok(CaptureHandle {
            buffer,
            sample_rate: self.sample_rate,
        })
    }
}

/// Loads the convolver impulse response from a WAV file, mixing to mono.
/// Falls back to a synthesized decay when no file is configured or the file
/// cannot be read.
fn load_impulse_response(path: Option<&Path>, sample_rate: u32) -> Vec<f32> {
    let Some(path) = path else {
        return synthetic_impulse(sample_rate);
    };
    match read_wav_mono(path) {
        Ok(samples) if !samples.is_empty() => samples,
        Ok(_) => {
            warn!("Impulse response {} is empty, using synthetic", path.display());
            synthetic_impulse(sample_rate)
        }
        Err(e) => {
            warn!(
                "Failed to read impulse response {}: {}, using synthetic",
                path.display(),
                e
            );
            synthetic_impulse(sample_rate)
        }
    }
}

fn read_wav_mono(path: &Path) -> Result<Vec<f32>, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::NoOutputDevice;
        assert_eq!(err.to_string(), "No audio output device found");

        let err = AudioError::StreamCreationFailed("test error".to_string());
        assert!(err.to_string().contains("test error"));
    }

    #[test]
    fn test_missing_impulse_file_falls_back() {
        let ir = load_impulse_response(Some(Path::new("/nonexistent/ir.wav")), 44100);
        assert_eq!(ir, synthetic_impulse(44100));
    }

    #[test]
    fn test_callback_fill_renders_silence_without_units() {
        let (_, consumer) = command_channel();
        let mut state = CallbackState {
            graph: UnitGraph::new(ENGINE_BLOCK_SIZE),
            commands: consumer,
            carry: Vec::new(),
            carry_pos: 0,
        };
        // An awkward buffer size that is not a multiple of the block size.
        let mut data = vec![1.0; 300];
        state.fill(&mut data, 2);
        assert!(data.iter().all(|&s| s == 0.0));
    }

    // Hardware-dependent paths (engine creation, input streams) need real
    // devices and are not exercised here.
}
