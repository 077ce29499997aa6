//! Runtime error type.

use std::error::Error;
use std::fmt;

use crate::engine::context::UnitError;

use super::recorder::RecordError;

/// Errors raised by the node lifecycle and connection managers.
#[derive(Debug)]
pub enum RuntimeError {
    /// The referenced module is not in the rack.
    MissingModule(String),
    /// The module exists but has no live unit (its creation failed earlier).
    MissingLiveUnit(String),
    /// No destination entry exists for the module pair.
    MissingDestination {
        source_id: String,
        destination_id: String,
    },
    /// The capture device could not be opened.
    DeviceAccessDenied(String),
    /// The audio context rejected an operation.
    Engine(UnitError),
    /// The recording sink failed.
    Record(RecordError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::MissingModule(id) => write!(f, "no module '{}' in the rack", id),
            RuntimeError::MissingLiveUnit(id) => {
                write!(f, "module '{}' has no live unit", id)
            }
            RuntimeError::MissingDestination {
                source_id,
                destination_id,
            } => write!(
                f,
                "module '{}' has no destination entry for '{}'",
                source_id, destination_id
            ),
            RuntimeError::DeviceAccessDenied(msg) => {
                write!(f, "audio input device unavailable: {}", msg)
            }
            RuntimeError::Engine(e) => write!(f, "audio context error: {}", e),
            RuntimeError::Record(e) => write!(f, "recording error: {}", e),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::Engine(e) => Some(e),
            RuntimeError::Record(e) => Some(e),
            _ => None,
        }
    }
}

impl From<UnitError> for RuntimeError {
    fn from(e: UnitError) -> Self {
        match e {
            UnitError::DeviceAccessDenied(msg) => RuntimeError::DeviceAccessDenied(msg),
            other => RuntimeError::Engine(other),
        }
    }
}

impl From<RecordError> for RuntimeError {
    fn from(e: RecordError) -> Self {
        RuntimeError::Record(e)
    }
}
