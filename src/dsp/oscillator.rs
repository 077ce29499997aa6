//! Oscillator unit.
//!
//! A one-shot source: it emits silence until started, and once stopped it
//! never produces sound again. The node lifecycle manager replaces a stopped
//! oscillator with a fresh, armed unit; this mirrors the restart semantics
//! of one-shot source nodes in host audio engines.

use std::f32::consts::TAU;

use crate::graph::Waveform;

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Waveform generator with frequency and detune modulation inputs.
pub struct OscillatorUnit {
    waveform: Waveform,
    /// Base frequency in Hz.
    frequency: f32,
    /// Detune in cents, applied on top of the base frequency.
    detune: f32,
    /// Phase accumulator in [0, 1).
    phase: f32,
    playing: bool,
    sample_rate: f32,
}

impl OscillatorUnit {
    /// Creates an armed (not yet started) oscillator.
    pub fn new(waveform: Waveform, frequency: f32, detune: f32, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency,
            detune,
            phase: 0.0,
            playing: false,
            sample_rate: sample_rate as f32,
        }
    }

    fn sample_at(&self, phase: f32) -> f32 {
        match self.waveform {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        }
    }
}

impl Unit for OscillatorUnit {
    fn mod_targets(&self) -> &'static [&'static str] {
        &["frequency", "detune"]
    }

    fn apply(&mut self, update: &UnitUpdate) {
        if let UnitUpdate::Oscillator {
            waveform,
            frequency,
            detune,
        } = update
        {
            self.waveform = *waveform;
            self.frequency = *frequency;
            self.detune = *detune;
        }
    }

    fn start(&mut self) {
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn process(&mut self, _input: &[f32], mods: &ModInputs, output: &mut [f32]) {
        if !self.playing {
            output.fill(0.0);
            return;
        }

        for (i, out) in output.iter_mut().enumerate() {
            let cents = self.detune + mods.sample("detune", i);
            let freq = (self.frequency + mods.sample("frequency", i)) * (cents / 1200.0).exp2();
            *out = self.sample_at(self.phase);
            self.phase += freq.max(0.0) / self.sample_rate;
            if self.phase >= 1.0 {
                self.phase -= self.phase.floor();
            }
        }
    }
}
