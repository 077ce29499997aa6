//! Recording sink boundary.
//!
//! The update dispatcher starts and stops recording sessions through this
//! trait; the engine provides a WAV-writing implementation and tests use
//! in-memory stand-ins.

use std::error::Error;
use std::fmt;

use crate::engine::context::CaptureHandle;

/// Errors raised by a recording sink.
#[derive(Debug)]
pub enum RecordError {
    /// Stop was requested for a module with no running session.
    NotRecording(String),
    /// The recorded audio could not be written out.
    Io(std::io::Error),
    /// The WAV encoder failed.
    Encode(hound::Error),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NotRecording(id) => {
                write!(f, "module '{}' has no recording in progress", id)
            }
            RecordError::Io(e) => write!(f, "failed to write recording: {}", e),
            RecordError::Encode(e) => write!(f, "failed to encode recording: {}", e),
        }
    }
}

impl Error for RecordError {}

impl From<std::io::Error> for RecordError {
    fn from(e: std::io::Error) -> Self {
        RecordError::Io(e)
    }
}

impl From<hound::Error> for RecordError {
    fn from(e: hound::Error) -> Self {
        RecordError::Encode(e)
    }
}

/// Consumes captured audio when recording modules are toggled.
pub trait Recorder {
    /// Begins a session for a recording module, arming its capture buffer.
    fn start(&mut self, module_id: &str, capture: CaptureHandle) -> Result<(), RecordError>;

    /// Ends the session for a recording module and persists what was
    /// captured.
    fn stop(&mut self, module_id: &str) -> Result<(), RecordError>;
}
