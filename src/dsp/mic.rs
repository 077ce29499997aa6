//! Microphone source unit.
//!
//! The capture stream itself lives on the control side, which pushes mono
//! samples into a lock-free ring buffer. This unit is the audio-thread end
//! of that ring: it drains whatever has arrived and emits silence when the
//! ring runs dry (device stall, or no stream at all in offline rendering).

use rtrb::Consumer;

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Drains captured input samples from a ring buffer.
pub struct MicSource {
    consumer: Consumer<f32>,
}

impl MicSource {
    pub fn new(consumer: Consumer<f32>) -> Self {
        Self { consumer }
    }
}

impl Unit for MicSource {
    fn apply(&mut self, _update: &UnitUpdate) {}

    fn process(&mut self, _input: &[f32], _mods: &ModInputs, output: &mut [f32]) {
        for out in output.iter_mut() {
            *out = self.consumer.pop().unwrap_or(0.0);
        }
    }
}
