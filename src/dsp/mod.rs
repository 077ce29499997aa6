//! Live processing units.
//!
//! One unit type per module brand. Units are the engine-side objects the
//! node lifecycle manager materializes for each module; they process mono
//! blocks and accept in-place parameter pushes via [`UnitUpdate`].

pub mod biquad;
pub mod convolver;
pub mod delay;
pub mod gain;
pub mod mic;
pub mod oscillator;
pub mod tap;
pub mod unit;
pub mod wave_shaper;

pub use unit::{ModInputs, Unit, UnitUpdate};

use crate::engine::context::UnitError;
use crate::graph::{Module, ModuleKind};

/// Constructs the live unit for a module from its current parameters.
///
/// Covers every brand whose unit needs no host resources beyond the decoded
/// impulse response. Microphone inputs are built by the audio context, which
/// owns the capture stream, and `speaker_out` has no unit at all — it stands
/// for the context's master output.
pub fn build_unit(
    module: &Module,
    sample_rate: u32,
    impulse_response: &[f32],
) -> Result<(Box<dyn Unit>, Option<tap::CaptureBuffer>), UnitError> {
    match &module.kind {
        ModuleKind::Delay(p) => Ok((
            Box::new(delay::DelayUnit::new(
                p.delay_time.value,
                p.max_delay_time.value,
                sample_rate,
            )),
            None,
        )),
        ModuleKind::BiquadFilter(p) => Ok((
            Box::new(biquad::BiquadUnit::new(
                p.filter_type,
                p.frequency.value,
                p.q.value,
                p.gain.value,
                p.detune.value,
                sample_rate,
            )),
            None,
        )),
        ModuleKind::Gain(p) => Ok((Box::new(gain::GainUnit::new(p.gain.value)), None)),
        ModuleKind::Oscillator(p) => Ok((
            Box::new(oscillator::OscillatorUnit::new(
                p.waveform,
                p.frequency.value,
                p.detune.value,
                sample_rate,
            )),
            None,
        )),
        ModuleKind::WaveShaper(p) => Ok((
            Box::new(wave_shaper::WaveShaperUnit::new(
                p.curve.clone(),
                p.oversample,
            )),
            None,
        )),
        ModuleKind::Convolver(_) => Ok((
            Box::new(convolver::ConvolverUnit::new(impulse_response)),
            None,
        )),
        ModuleKind::Recording(_) => {
            let capture = tap::CaptureBuffer::new();
            let unit = tap::StreamTap::new(capture.clone());
            Ok((Box::new(unit), Some(capture)))
        }
        ModuleKind::MicIn(_) | ModuleKind::SpeakerOut => {
            Err(UnitError::UnsupportedBrand(module.brand()))
        }
    }
}
