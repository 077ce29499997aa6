//! The audio context boundary.
//!
//! The runtime layer talks to audio hardware (or an offline renderer)
//! exclusively through the [`AudioContext`] trait. Live units are referred
//! to by opaque [`UnitId`] handles; cables attach to an [`Endpoint`], which
//! is either a unit's main input, one of its modulation parameters, or the
//! master output.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use crate::dsp::tap::CaptureBuffer;
use crate::dsp::UnitUpdate;
use crate::graph::{Module, ModuleBrand};

/// Opaque handle to a live unit.
pub type UnitId = u64;

/// Where a cable lands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The main audio input of a unit.
    Node(UnitId),
    /// A modulation parameter of a unit, by parameter key.
    Param(UnitId, String),
    /// The context's master output.
    MasterOut,
}

/// Errors raised at the audio context boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitError {
    /// The brand has no live unit representation in this context.
    UnsupportedBrand(ModuleBrand),
    /// The capture device could not be opened.
    DeviceAccessDenied(String),
    /// The parameter key is not a modulation target of the unit.
    UnknownParam { unit: UnitId, key: String },
    /// No live unit with this handle.
    UnknownUnit(UnitId),
    /// A one-shot source was started after it already ran.
    Finished(UnitId),
    /// A one-shot source was stopped before it was started.
    NotStarted(UnitId),
    /// The unit has no capture buffer (not a recording tap).
    NoCapture(UnitId),
    /// The impulse response file could not be read or decoded.
    ImpulseResponse(String),
    /// The command queue to the audio thread is full.
    QueueFull,
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::UnsupportedBrand(brand) => {
                write!(f, "brand '{}' has no live unit in this context", brand)
            }
            UnitError::DeviceAccessDenied(msg) => {
                write!(f, "audio input device unavailable: {}", msg)
            }
            UnitError::UnknownParam { unit, key } => {
                write!(f, "unit {} has no modulation parameter '{}'", unit, key)
            }
            UnitError::UnknownUnit(unit) => write!(f, "no live unit {}", unit),
            UnitError::Finished(unit) => {
                write!(f, "one-shot unit {} already ran and cannot restart", unit)
            }
            UnitError::NotStarted(unit) => {
                write!(f, "one-shot unit {} was never started", unit)
            }
            UnitError::NoCapture(unit) => {
                write!(f, "unit {} has no capture buffer", unit)
            }
            UnitError::ImpulseResponse(msg) => {
                write!(f, "failed to load impulse response: {}", msg)
            }
            UnitError::QueueFull => write!(f, "audio command queue is full"),
        }
    }
}

impl Error for UnitError {}

/// Handle to a recording module's capture buffer, used by the recorder to
/// arm the tap and drain captured audio.
#[derive(Clone)]
pub struct CaptureHandle {
    pub buffer: CaptureBuffer,
    pub sample_rate: u32,
}

/// The boundary between the runtime layer and live audio.
pub trait AudioContext {
    fn sample_rate(&self) -> u32;

    /// Materializes a live unit for the module's brand and current
    /// parameters. Fails for `speaker_out` (which has no unit) and for a
    /// microphone whose device cannot be opened.
    fn create_unit(&mut self, module: &Module) -> Result<UnitId, UnitError>;

    /// Tears down a live unit and every cable touching it.
    fn drop_unit(&mut self, unit: UnitId) -> Result<(), UnitError>;

    /// Patches a unit's output into an endpoint. Connecting the same pair
    /// twice is a no-op.
    fn connect(&mut self, source: UnitId, destination: Endpoint) -> Result<(), UnitError>;

    /// Removes the cable between a unit's output and an endpoint.
    fn disconnect(&mut self, source: UnitId, destination: Endpoint) -> Result<(), UnitError>;

    /// Starts a one-shot source. Legal exactly once per unit.
    fn start(&mut self, unit: UnitId) -> Result<(), UnitError>;

    /// Stops a one-shot source. Legal only after it was started.
    fn stop(&mut self, unit: UnitId) -> Result<(), UnitError>;

    /// Pushes new parameters into a live unit in place.
    fn update(&mut self, unit: UnitId, update: UnitUpdate) -> Result<(), UnitError>;

    /// The capture handle of a recording unit.
    fn capture(&mut self, unit: UnitId) -> Result<CaptureHandle, UnitError>;
}

/// One-shot lifecycle of an oscillator unit, tracked control-side so illegal
/// start/stop sequences are rejected before they reach the audio thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OneShot {
    Armed,
    Started,
    Finished,
}

pub(crate) struct UnitMeta {
    pub mod_targets: &'static [&'static str],
    pub one_shot: Option<OneShot>,
    pub capture: Option<CaptureBuffer>,
}

/// Control-side registry of live units. Both context implementations share
/// it so endpoint validation and one-shot enforcement behave identically
/// with and without hardware.
pub(crate) struct UnitTable {
    next: UnitId,
    units: HashMap<UnitId, UnitMeta>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self {
            next: 1,
            units: HashMap::new(),
        }
    }

    pub fn register(&mut self, meta: UnitMeta) -> UnitId {
        let id = self.next;
        self.next += 1;
        self.units.insert(id, meta);
        id
    }

    pub fn remove(&mut self, unit: UnitId) -> Result<(), UnitError> {
        self.units
            .remove(&unit)
            .map(|_| ())
            .ok_or(UnitError::UnknownUnit(unit))
    }

    pub fn ensure_known(&self, unit: UnitId) -> Result<(), UnitError> {
        if self.units.contains_key(&unit) {
            Ok(())
        } else {
            Err(UnitError::UnknownUnit(unit))
        }
    }

    pub fn validate_endpoint(&self, endpoint: &Endpoint) -> Result<(), UnitError> {
        match endpoint {
            Endpoint::MasterOut => Ok(()),
            Endpoint::Node(unit) => self.ensure_known(*unit),
            Endpoint::Param(unit, key) => {
                let meta = self
                    .units
                    .get(unit)
                    .ok_or(UnitError::UnknownUnit(*unit))?;
                if meta.mod_targets.contains(&key.as_str()) {
                    Ok(())
                } else {
                    Err(UnitError::UnknownParam {
                        unit: *unit,
                        key: key.clone(),
                    })
                }
            }
        }
    }

    /// Checks and advances one-shot state for a start. Units without
    /// one-shot semantics accept start as a no-op.
    pub fn begin_start(&mut self, unit: UnitId) -> Result<(), UnitError> {
        let meta = self
            .units
            .get_mut(&unit)
            .ok_or(UnitError::UnknownUnit(unit))?;
        match meta.one_shot {
            None => Ok(()),
            Some(OneShot::Armed) => {
                meta.one_shot = Some(OneShot::Started);
                Ok(())
            }
            Some(OneShot::Started) | Some(OneShot::Finished) => Err(UnitError::Finished(unit)),
        }
    }

    /// Checks and advances one-shot state for a stop. Stopping an already
    /// finished unit is tolerated.
    pub fn begin_stop(&mut self, unit: UnitId) -> Result<(), UnitError> {
        let meta = self
            .units
            .get_mut(&unit)
            .ok_or(UnitError::UnknownUnit(unit))?;
        match meta.one_shot {
            None | Some(OneShot::Started) | Some(OneShot::Finished) => {
                if meta.one_shot.is_some() {
                    meta.one_shot = Some(OneShot::Finished);
                }
                Ok(())
            }
            Some(OneShot::Armed) => Err(UnitError::NotStarted(unit)),
        }
    }

    pub fn capture(&self, unit: UnitId) -> Result<CaptureBuffer, UnitError> {
        let meta = self.units.get(&unit).ok_or(UnitError::UnknownUnit(unit))?;
        meta.capture.clone().ok_or(UnitError::NoCapture(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_meta() -> UnitMeta {
        UnitMeta {
            mod_targets: &["gain"],
            one_shot: None,
            capture: None,
        }
    }

    #[test]
    fn test_register_and_remove() {
        let mut table = UnitTable::new();
        let a = table.register(plain_meta());
        let b = table.register(plain_meta());
        assert_ne!(a, b);
        assert!(table.remove(a).is_ok());
        assert_eq!(table.remove(a), Err(UnitError::UnknownUnit(a)));
    }

    #[test]
    fn test_endpoint_validation() {
        let mut table = UnitTable::new();
        let id = table.register(plain_meta());

        assert!(table.validate_endpoint(&Endpoint::MasterOut).is_ok());
        assert!(table.validate_endpoint(&Endpoint::Node(id)).is_ok());
        assert!(table
            .validate_endpoint(&Endpoint::Param(id, "gain".to_string()))
            .is_ok());
        assert_eq!(
            table.validate_endpoint(&Endpoint::Param(id, "frequency".to_string())),
            Err(UnitError::UnknownParam {
                unit: id,
                key: "frequency".to_string()
            })
        );
        assert!(table.validate_endpoint(&Endpoint::Node(999)).is_err());
    }

    #[test]
    fn test_one_shot_runs_exactly_once() {
        let mut table = UnitTable::new();
        let id = table.register(UnitMeta {
            mod_targets: &[],
            one_shot: Some(OneShot::Armed),
            capture: None,
        });

        assert_eq!(table.begin_stop(id), Err(UnitError::NotStarted(id)));
        assert!(table.begin_start(id).is_ok());
        assert_eq!(table.begin_start(id), Err(UnitError::Finished(id)));
        assert!(table.begin_stop(id).is_ok());
        assert_eq!(table.begin_start(id), Err(UnitError::Finished(id)));
        assert!(table.begin_stop(id).is_ok());
    }

    #[test]
    fn test_start_is_noop_for_continuous_units() {
        let mut table = UnitTable::new();
        let id = table.register(plain_meta());
        assert!(table.begin_start(id).is_ok());
        assert!(table.begin_start(id).is_ok());
        assert!(table.begin_stop(id).is_ok());
    }
}
