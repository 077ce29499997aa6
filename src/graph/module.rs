//! Module data model.
//!
//! One tagged variant per module brand, plus the brand-specific parameter
//! records. Range-bound numeric parameters carry their UI range alongside the
//! value so editors can render them without a separate catalog.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::curves;

/// 2D canvas position of a module. Carried through the core untouched;
/// only the rendering layer interprets it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Creates a new position.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A numeric parameter together with its valid range and UI step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeParam {
    pub value: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl RangeParam {
    /// Creates a new range-bound parameter.
    pub fn new(value: f32, min: f32, max: f32, step: f32) -> Self {
        Self {
            value,
            min,
            max,
            step,
        }
    }

    /// Sets the value, clamped to the parameter's range.
    pub fn set(&mut self, value: f32) {
        self.value = value.clamp(self.min, self.max);
    }
}

/// Filter response shape of a biquad filter module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Lowshelf,
    Highshelf,
    Peaking,
    Notch,
    Allpass,
}

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Shaping curve family of a wave-shaper module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    None,
    Distortion,
    Fuzz,
    Overdrive,
    Sawtooth,
}

/// Oversampling setting of a wave-shaper module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Oversample {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "4x")]
    X4,
}

/// Microphone input parameters. The capture stream itself lives with the
/// module's live unit; the model only remembers which devices were chosen.
/// An empty device name selects the system default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MicInParam {
    pub mic: String,
    pub speaker: String,
}

/// Biquad filter parameters, mirroring the knobs of the live unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiquadFilterParam {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub frequency: RangeParam,
    #[serde(rename = "Q")]
    pub q: RangeParam,
    pub gain: RangeParam,
    pub detune: RangeParam,
}

/// Delay parameters. `max_delay_time` sizes the live unit's buffer and
/// cannot exceed it afterwards without recreating the unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelayParam {
    pub delay_time: RangeParam,
    pub max_delay_time: RangeParam,
}

/// Gain parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GainParam {
    pub gain: RangeParam,
}

/// Oscillator parameters. `is_playing` drives the one-shot state machine of
/// the live unit; see the update dispatcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorParam {
    #[serde(rename = "type")]
    pub waveform: Waveform,
    pub frequency: RangeParam,
    pub detune: RangeParam,
    pub is_playing: bool,
}

/// Wave-shaper parameters. `curve` is derived data: it is always regenerated
/// from `curve_type` and `amount`, never edited directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveShaperParam {
    pub curve_type: CurveType,
    pub curve: Vec<f32>,
    pub amount: RangeParam,
    pub oversample: Oversample,
}

/// Convolver parameters. The impulse response is an engine concern; there is
/// nothing user-tunable yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvolverParam {}

/// Recording module parameters. The stop handle for an active session is
/// tracked by the recorder, not the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingParam {
    pub is_recording: bool,
}

/// Where a cable from a source module lands on its destination: the
/// destination's main input, or one of the destination unit's named
/// control-rate parameters (enabling audio-rate modulation of a knob).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "lowercase")]
pub enum DestinationInfo {
    Node {
        id: String,
    },
    Param {
        id: String,
        #[serde(rename = "paramKey")]
        param_key: String,
    },
}

impl DestinationInfo {
    /// Creates a main-input destination.
    pub fn node(id: impl Into<String>) -> Self {
        Self::Node { id: id.into() }
    }

    /// Creates a named-parameter destination.
    pub fn param(id: impl Into<String>, param_key: impl Into<String>) -> Self {
        Self::Param {
            id: id.into(),
            param_key: param_key.into(),
        }
    }

    /// The destination module's id.
    pub fn module_id(&self) -> &str {
        match self {
            Self::Node { id } => id,
            Self::Param { id, .. } => id,
        }
    }
}

/// Module brand discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleBrand {
    MicIn,
    BiquadFilter,
    Delay,
    Gain,
    Oscillator,
    WaveShaper,
    Convolver,
    Recording,
    SpeakerOut,
}

impl std::fmt::Display for ModuleBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModuleBrand::MicIn => "mic_in",
            ModuleBrand::BiquadFilter => "biquad_filter",
            ModuleBrand::Delay => "delay",
            ModuleBrand::Gain => "gain",
            ModuleBrand::Oscillator => "oscillator",
            ModuleBrand::WaveShaper => "wave_shaper",
            ModuleBrand::Convolver => "convolver",
            ModuleBrand::Recording => "recording",
            ModuleBrand::SpeakerOut => "speaker_out",
        };
        write!(f, "{}", name)
    }
}

/// Brand-specific payload of a module.
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleKind {
    MicIn(MicInParam),
    BiquadFilter(BiquadFilterParam),
    Delay(DelayParam),
    Gain(GainParam),
    Oscillator(OscillatorParam),
    WaveShaper(WaveShaperParam),
    Convolver(ConvolverParam),
    Recording(RecordingParam),
    SpeakerOut,
}

/// One node in the logical audio graph.
///
/// `destinations` is the single source of truth for which live connections
/// should exist; the link map mirrors it and the engine wiring mirrors the
/// link map.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub id: String,
    pub position: Position,
    pub destinations: Vec<DestinationInfo>,
    pub kind: ModuleKind,
}

impl Module {
    /// Creates a module with an explicit id. Used by the persistence codec.
    pub fn new(id: impl Into<String>, position: Position, kind: ModuleKind) -> Self {
        Self {
            id: id.into(),
            position,
            destinations: Vec::new(),
            kind,
        }
    }

    /// Creates a fresh module of the given brand at a canvas position, with
    /// the brand's default parameters and a generated id.
    pub fn create(brand: ModuleBrand, position: Position) -> Self {
        let kind = match brand {
            ModuleBrand::MicIn => ModuleKind::MicIn(MicInParam::default()),
            ModuleBrand::BiquadFilter => ModuleKind::BiquadFilter(BiquadFilterParam {
                filter_type: FilterType::Lowpass,
                frequency: RangeParam::new(700.0, 10.0, 20_000.0, 1.0),
                q: RangeParam::new(1.0, 0.1, 20.0, 0.1),
                gain: RangeParam::new(0.0, -40.0, 40.0, 0.1),
                detune: RangeParam::new(0.0, -1200.0, 1200.0, 1.0),
            }),
            ModuleBrand::Delay => ModuleKind::Delay(DelayParam {
                delay_time: RangeParam::new(1.0, 0.0, 10.0, 0.01),
                max_delay_time: RangeParam::new(10.0, 1.0, 30.0, 1.0),
            }),
            ModuleBrand::Gain => ModuleKind::Gain(GainParam {
                gain: RangeParam::new(1.0, 0.0, 2.0, 0.01),
            }),
            ModuleBrand::Oscillator => ModuleKind::Oscillator(OscillatorParam {
                waveform: Waveform::Sine,
                frequency: RangeParam::new(440.0, 20.0, 20_000.0, 1.0),
                detune: RangeParam::new(0.0, -1200.0, 1200.0, 1.0),
                is_playing: false,
            }),
            ModuleBrand::WaveShaper => {
                let amount = RangeParam::new(50.0, 0.0, 100.0, 1.0);
                ModuleKind::WaveShaper(WaveShaperParam {
                    curve_type: CurveType::None,
                    curve: curves::generate_curve(CurveType::None, amount.value),
                    amount,
                    oversample: Oversample::None,
                })
            }
            ModuleBrand::Convolver => ModuleKind::Convolver(ConvolverParam::default()),
            ModuleBrand::Recording => ModuleKind::Recording(RecordingParam::default()),
            ModuleBrand::SpeakerOut => ModuleKind::SpeakerOut,
        };

        Self {
            id: Uuid::new_v4().to_string(),
            position,
            destinations: Vec::new(),
            kind,
        }
    }

    /// The module's brand discriminant.
    pub fn brand(&self) -> ModuleBrand {
        match self.kind {
            ModuleKind::MicIn(_) => ModuleBrand::MicIn,
            ModuleKind::BiquadFilter(_) => ModuleBrand::BiquadFilter,
            ModuleKind::Delay(_) => ModuleBrand::Delay,
            ModuleKind::Gain(_) => ModuleBrand::Gain,
            ModuleKind::Oscillator(_) => ModuleBrand::Oscillator,
            ModuleKind::WaveShaper(_) => ModuleBrand::WaveShaper,
            ModuleKind::Convolver(_) => ModuleBrand::Convolver,
            ModuleKind::Recording(_) => ModuleBrand::Recording,
            ModuleKind::SpeakerOut => ModuleBrand::SpeakerOut,
        }
    }

    /// Whether this module may act as the source end of a cable.
    /// Output-only brands (speaker, recording) are pure sinks.
    pub fn is_connectable(&self) -> bool {
        !matches!(
            self.brand(),
            ModuleBrand::SpeakerOut | ModuleBrand::Recording
        )
    }

    /// Finds the destination entry pointing at the given module, if any.
    pub fn destination_for(&self, module_id: &str) -> Option<&DestinationInfo> {
        self.destinations
            .iter()
            .find(|d| d.module_id() == module_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_assigns_unique_ids() {
        let a = Module::create(ModuleBrand::Gain, Position::default());
        let b = Module::create(ModuleBrand::Gain, Position::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_connectable_brands() {
        for brand in [
            ModuleBrand::MicIn,
            ModuleBrand::BiquadFilter,
            ModuleBrand::Delay,
            ModuleBrand::Gain,
            ModuleBrand::Oscillator,
            ModuleBrand::WaveShaper,
            ModuleBrand::Convolver,
        ] {
            assert!(Module::create(brand, Position::default()).is_connectable());
        }
        assert!(!Module::create(ModuleBrand::SpeakerOut, Position::default()).is_connectable());
        assert!(!Module::create(ModuleBrand::Recording, Position::default()).is_connectable());
    }

    #[test]
    fn test_default_oscillator_is_stopped() {
        let module = Module::create(ModuleBrand::Oscillator, Position::default());
        match module.kind {
            ModuleKind::Oscillator(ref p) => assert!(!p.is_playing),
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn test_destination_info_serde_shape() {
        let node = DestinationInfo::node("abc");
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"target":"node","id":"abc"}"#);

        let param = DestinationInfo::param("abc", "gain");
        let json = serde_json::to_string(&param).unwrap();
        assert_eq!(json, r#"{"target":"param","id":"abc","paramKey":"gain"}"#);
    }

    #[test]
    fn test_range_param_set_clamps() {
        let mut p = RangeParam::new(1.0, 0.0, 2.0, 0.01);
        p.set(5.0);
        assert_eq!(p.value, 2.0);
        p.set(-1.0);
        assert_eq!(p.value, 0.0);
    }
}
