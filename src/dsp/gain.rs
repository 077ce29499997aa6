//! Gain unit.

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Scales its input by a gain factor. The `gain` parameter accepts
/// audio-rate modulation, which is summed onto the knob value per sample.
pub struct GainUnit {
    gain: f32,
}

impl GainUnit {
    /// Creates a gain unit.
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }
}

impl Unit for GainUnit {
    fn mod_targets(&self) -> &'static [&'static str] {
        &["gain"]
    }

    fn apply(&mut self, update: &UnitUpdate) {
        if let UnitUpdate::Gain { gain } = update {
            self.gain = *gain;
        }
    }

    fn process(&mut self, input: &[f32], mods: &ModInputs, output: &mut [f32]) {
        for (i, out) in output.iter_mut().enumerate() {
            let sample = input.get(i).copied().unwrap_or(0.0);
            *out = sample * (self.gain + mods.sample("gain", i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_scales_input() {
        let mut unit = GainUnit::new(0.5);
        let input = vec![1.0; 4];
        let mut output = vec![0.0; 4];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output, vec![0.5; 4]);
    }

    #[test]
    fn test_gain_update_applies_in_place() {
        let mut unit = GainUnit::new(1.0);
        unit.apply(&UnitUpdate::Gain { gain: 2.0 });
        let input = vec![0.25; 2];
        let mut output = vec![0.0; 2];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output, vec![0.5; 2]);
    }

    #[test]
    fn test_gain_modulation_sums_with_knob() {
        let mut unit = GainUnit::new(1.0);
        let entries = vec![("gain".to_string(), vec![1.0, -1.0])];
        let input = vec![1.0, 1.0];
        let mut output = vec![0.0; 2];
        unit.process(&input, &ModInputs::new(&entries), &mut output);
        assert_eq!(output, vec![2.0, 0.0]);
    }
}
