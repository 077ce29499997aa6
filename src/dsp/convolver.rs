//! Convolver unit.
//!
//! Direct-form convolution against a fixed impulse response. The IR is
//! decoded (or synthesized) by the audio context at unit construction time;
//! it is capped so the per-block cost stays bounded.

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Longest impulse response the unit will convolve, in samples.
pub const MAX_IR_LEN: usize = 8192;

/// Length of the synthesized fallback impulse response.
pub const SYNTH_IR_LEN: usize = 2048;

/// Convolves the input with an impulse response.
pub struct ConvolverUnit {
    ir: Vec<f32>,
    /// Circular history of recent input samples, one IR length long.
    history: Vec<f32>,
    pos: usize,
}

impl ConvolverUnit {
    /// Creates a convolver unit for the given impulse response.
    pub fn new(impulse_response: &[f32]) -> Self {
        let len = impulse_response.len().min(MAX_IR_LEN).max(1);
        let mut ir = impulse_response[..len].to_vec();
        if ir.is_empty() {
            ir.push(1.0);
        }
        Self {
            history: vec![0.0; ir.len()],
            ir,
            pos: 0,
        }
    }
}

impl Unit for ConvolverUnit {
    fn apply(&mut self, _update: &UnitUpdate) {}

    fn process(&mut self, input: &[f32], _mods: &ModInputs, output: &mut [f32]) {
        let len = self.history.len();
        for (i, out) in output.iter_mut().enumerate() {
            let sample = input.get(i).copied().unwrap_or(0.0);
            self.history[self.pos] = sample;

            let mut acc = 0.0;
            for (k, &coeff) in self.ir.iter().enumerate() {
                let index = (self.pos + len - k) % len;
                acc += coeff * self.history[index];
            }
            *out = acc;
            self.pos = (self.pos + 1) % len;
        }
    }
}

/// Synthesizes a deterministic room-like impulse response: an exponentially
/// decaying noise burst from a fixed-seed xorshift generator. Used when no
/// impulse response file is configured.
pub fn synthetic_impulse(sample_rate: u32) -> Vec<f32> {
    let mut state: u32 = 0x2545_f491;
    let decay = 6.0 / SYNTH_IR_LEN as f32;
    let _ = sample_rate; // length is fixed; rate only affects perceived decay

    (0..SYNTH_IR_LEN)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let noise = (state as f32 / u32::MAX as f32) * 2.0 - 1.0;
            noise * (-(i as f32) * decay).exp() * 0.2
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_impulse_passes_through() {
        let mut unit = ConvolverUnit::new(&[1.0]);
        let input = vec![0.3, -0.2, 0.9];
        let mut output = vec![0.0; 3];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn test_delayed_impulse_shifts_signal() {
        let mut unit = ConvolverUnit::new(&[0.0, 0.0, 1.0]);
        let mut input = vec![0.0; 8];
        input[0] = 1.0;
        let mut output = vec![0.0; 8];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output[2], 1.0);
        assert_eq!(output[0], 0.0);
    }

    #[test]
    fn test_synthetic_impulse_is_deterministic() {
        let a = synthetic_impulse(44100);
        let b = synthetic_impulse(44100);
        assert_eq!(a, b);
        assert_eq!(a.len(), SYNTH_IR_LEN);
        assert!(a[0].abs() > a[SYNTH_IR_LEN - 1].abs());
    }

    #[test]
    fn test_empty_impulse_falls_back_to_identity() {
        let mut unit = ConvolverUnit::new(&[]);
        let input = vec![0.5];
        let mut output = vec![0.0];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output[0], 0.5);
    }
}
