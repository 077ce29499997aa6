//! Delay unit.

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Circular-buffer delay line. The buffer is sized from `max_delay_time` at
/// construction; the tap position follows `delay_time` and its modulation
/// input at control rate.
pub struct DelayUnit {
    buffer: Vec<f32>,
    write_pos: usize,
    /// Delay time in seconds.
    delay_time: f32,
    sample_rate: f32,
}

impl DelayUnit {
    /// Creates a delay unit. `max_delay_time` fixes the buffer size and is
    /// not updatable in place.
    pub fn new(delay_time: f32, max_delay_time: f32, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f32;
        let capacity = (max_delay_time.max(0.01) * sample_rate) as usize + 1;
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            delay_time,
            sample_rate,
        }
    }

    fn delay_samples(&self, delay_time: f32) -> usize {
        let max = self.buffer.len() - 1;
        ((delay_time.max(0.0) * self.sample_rate) as usize).min(max)
    }
}

impl Unit for DelayUnit {
    fn mod_targets(&self) -> &'static [&'static str] {
        &["delayTime"]
    }

    fn apply(&mut self, update: &UnitUpdate) {
        if let UnitUpdate::Delay { delay_time } = update {
            self.delay_time = *delay_time;
        }
    }

    fn process(&mut self, input: &[f32], mods: &ModInputs, output: &mut [f32]) {
        let delay = self.delay_samples(self.delay_time + mods.block_mean("delayTime"));
        let len = self.buffer.len();

        for (i, out) in output.iter_mut().enumerate() {
            let sample = input.get(i).copied().unwrap_or(0.0);
            self.buffer[self.write_pos] = sample;
            let read_pos = (self.write_pos + len - delay) % len;
            *out = self.buffer[read_pos];
            self.write_pos = (self.write_pos + 1) % len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_by_configured_time() {
        // 10 samples of delay at a 1000 Hz sample rate.
        let mut unit = DelayUnit::new(0.01, 0.1, 1000);
        let mut input = vec![0.0; 32];
        input[0] = 1.0;
        let mut output = vec![0.0; 32];
        unit.process(&input, &ModInputs::empty(), &mut output);

        assert_eq!(output[0], 0.0);
        assert_eq!(output[10], 1.0);
        assert_eq!(output.iter().filter(|&&s| s != 0.0).count(), 1);
    }

    #[test]
    fn test_zero_delay_passes_through() {
        let mut unit = DelayUnit::new(0.0, 0.1, 1000);
        let input = vec![0.5; 8];
        let mut output = vec![0.0; 8];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn test_delay_time_update() {
        let mut unit = DelayUnit::new(0.01, 0.1, 1000);
        unit.apply(&UnitUpdate::Delay { delay_time: 0.005 });
        let mut input = vec![0.0; 16];
        input[0] = 1.0;
        let mut output = vec![0.0; 16];
        unit.process(&input, &ModInputs::empty(), &mut output);
        assert_eq!(output[5], 1.0);
    }

    #[test]
    fn test_delay_clamped_to_buffer() {
        // Requested delay exceeds the buffer; must clamp, not panic.
        let mut unit = DelayUnit::new(5.0, 0.05, 1000);
        let input = vec![1.0; 8];
        let mut output = vec![0.0; 8];
        unit.process(&input, &ModInputs::empty(), &mut output);
    }
}
