//! Engine module
//!
//! Live audio backends behind the [`AudioContext`] boundary. Handles cpal
//! integration, the unit graph processed in the audio callback, offline
//! rendering, and the WAV recording sink.

pub mod audio_engine;
pub mod commands;
pub mod context;
pub mod offline;
pub mod recorder;
pub mod unit_graph;

pub use audio_engine::{AudioEngine, AudioError, EngineContext};
pub use commands::{command_channel, EngineCommand, COMMAND_QUEUE_CAPACITY};
pub use context::{AudioContext, CaptureHandle, Endpoint, UnitError, UnitId};
pub use offline::OfflineContext;
pub use recorder::WavRecorder;
pub use unit_graph::{UnitGraph, Wire};
