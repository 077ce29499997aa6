//! The Unit trait and supporting types.
//!
//! A unit is the live processing object backing one module. The unit graph
//! feeds each unit a mixed main input plus zero or more named modulation
//! inputs (cables patched into a parameter rather than the main input).

use crate::graph::{FilterType, Oversample, Waveform};

/// In-place parameter push for brands that support reconfiguration without
/// replacing the unit.
#[derive(Clone, Debug)]
pub enum UnitUpdate {
    Delay {
        delay_time: f32,
    },
    BiquadFilter {
        filter_type: FilterType,
        frequency: f32,
        q: f32,
        gain: f32,
        detune: f32,
    },
    Gain {
        gain: f32,
    },
    Oscillator {
        waveform: Waveform,
        frequency: f32,
        detune: f32,
    },
    WaveShaper {
        curve: Vec<f32>,
        oversample: Oversample,
    },
}

/// Named audio-rate modulation inputs for one unit, one buffer per
/// parameter key that has at least one cable patched into it.
pub struct ModInputs<'a> {
    entries: &'a [(String, Vec<f32>)],
}

impl<'a> ModInputs<'a> {
    /// Wraps the unit graph's modulation buffers.
    pub fn new(entries: &'a [(String, Vec<f32>)]) -> Self {
        Self { entries }
    }

    /// No modulation at all.
    pub fn empty() -> ModInputs<'static> {
        ModInputs { entries: &[] }
    }

    /// The modulation buffer for a parameter key, if patched.
    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, buf)| buf.as_slice())
    }

    /// Sample `i` of the modulation signal for `key`, or 0.0 when unpatched.
    pub fn sample(&self, key: &str, i: usize) -> f32 {
        self.get(key)
            .and_then(|buf| buf.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    /// Block mean of the modulation signal for `key`, or 0.0 when unpatched.
    /// Used by units that apply modulation at control rate (filter
    /// coefficients, delay taps).
    pub fn block_mean(&self, key: &str) -> f32 {
        match self.get(key) {
            Some(buf) if !buf.is_empty() => buf.iter().sum::<f32>() / buf.len() as f32,
            _ => 0.0,
        }
    }
}

/// A live processing unit.
///
/// `start`/`stop` only matter for one-shot sources (the oscillator); the
/// default implementations are no-ops. The one-shot legality of start/stop
/// sequences is enforced by the audio context before these are invoked.
pub trait Unit: Send {
    /// Parameter keys that accept audio-rate modulation cables.
    fn mod_targets(&self) -> &'static [&'static str] {
        &[]
    }

    /// Applies an in-place parameter push. Updates of a mismatched variant
    /// are ignored.
    fn apply(&mut self, update: &UnitUpdate);

    /// Begins producing output (one-shot sources only).
    fn start(&mut self) {}

    /// Permanently stops output (one-shot sources only).
    fn stop(&mut self) {}

    /// Processes one block: mixed main input in, mono output out.
    fn process(&mut self, input: &[f32], mods: &ModInputs, output: &mut [f32]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_inputs_lookup() {
        let entries = vec![("gain".to_string(), vec![0.5, 0.5])];
        let mods = ModInputs::new(&entries);
        assert_eq!(mods.sample("gain", 0), 0.5);
        assert_eq!(mods.sample("gain", 5), 0.0);
        assert_eq!(mods.sample("frequency", 0), 0.0);
        assert_eq!(mods.block_mean("gain"), 0.5);
        assert_eq!(mods.block_mean("frequency"), 0.0);
    }
}
