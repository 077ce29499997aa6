//! Logical graph data model.
//!
//! Pure value types describing the patch: modules with brand-specific
//! parameters, destination records, and the derived link map. Nothing in
//! here owns a live audio resource; the live side is managed by
//! [`crate::runtime::NodeManager`].

pub mod curves;
pub mod link;
pub mod module;
pub mod rack;

pub use link::{link_id, Link, LinkMap};
pub use module::{
    BiquadFilterParam, ConvolverParam, CurveType, DelayParam, DestinationInfo, FilterType,
    GainParam, MicInParam, Module, ModuleBrand, ModuleKind, OscillatorParam, Oversample, Position,
    RangeParam, RecordingParam, WaveShaperParam, Waveform,
};
pub use rack::Rack;
