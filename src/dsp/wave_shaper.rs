//! Wave-shaper unit.

use crate::graph::Oversample;

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Applies a transfer curve to the input with linear interpolation between
/// curve samples. An empty curve passes the signal through unchanged. The
/// oversample setting is carried for fidelity with the model but shaping is
/// performed 1:1.
pub struct WaveShaperUnit {
    curve: Vec<f32>,
    #[allow(dead_code)]
    oversample: Oversample,
}

impl WaveShaperUnit {
    /// Creates a wave-shaper unit.
    pub fn new(curve: Vec<f32>, oversample: Oversample) -> Self {
        Self { curve, oversample }
    }

    fn shape(&self, x: f32) -> f32 {
        if self.curve.is_empty() {
            return x;
        }
        if self.curve.len() == 1 {
            return self.curve[0];
        }

        let n = self.curve.len();
        let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * (n - 1) as f32;
        let index = pos as usize;
        if index >= n - 1 {
            return self.curve[n - 1];
        }
        let frac = pos - index as f32;
        self.curve[index] * (1.0 - frac) + self.curve[index + 1] * frac
    }
}

impl Unit for WaveShaperUnit {
    fn apply(&mut self, update: &UnitUpdate) {
        if let UnitUpdate::WaveShaper { curve, oversample } = update {
            self.curve = curve.clone();
            self.oversample = *oversample;
        }
    }

    fn process(&mut self, input: &[f32], _mods: &ModInputs, output: &mut [f32]) {
        for (i, out) in output.iter_mut().enumerate() {
            let sample = input.get(i).copied().unwrap_or(0.0);
            *out = self.shape(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{curves, CurveType};

    #[test]
    fn test_empty_curve_is_identity() {
        let mut unit = WaveShaperUnit::new(Vec::new(), Oversample::None);
        let input = vec![-0.5, 0.0, 0.7];
        let mut output = vec![0.0; 3];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn test_curve_endpoints() {
        // A linear two-point curve maps -1 -> -1 and 1 -> 1.
        let mut unit = WaveShaperUnit::new(vec![-1.0, 1.0], Oversample::None);
        let input = vec![-1.0, 0.0, 1.0];
        let mut output = vec![0.0; 3];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output, vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_generated_curve_saturates() {
        let curve = curves::generate_curve(CurveType::Fuzz, 80.0);
        let mut unit = WaveShaperUnit::new(curve, Oversample::None);
        let input = vec![0.9];
        let mut output = vec![0.0];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert!(output[0] > 0.9);
        assert!(output[0] <= 1.0);
    }

    #[test]
    fn test_update_swaps_curve() {
        let mut unit = WaveShaperUnit::new(Vec::new(), Oversample::None);
        unit.apply(&UnitUpdate::WaveShaper {
            curve: vec![0.0, 0.0],
            oversample: Oversample::X2,
        });
        let input = vec![0.5];
        let mut output = vec![1.0];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output[0], 0.0);
    }
}
