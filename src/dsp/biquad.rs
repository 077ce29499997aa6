//! Biquad filter unit.
//!
//! RBJ cookbook biquads covering the eight standard response types. The
//! frequency, Q, gain, and detune knobs all accept modulation cables;
//! modulation is applied at control rate, once per block, since it feeds
//! the coefficient computation rather than the sample path.

use crate::graph::FilterType;

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Normalized biquad coefficients (a0 divided out).
#[derive(Clone, Copy, Default)]
struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

/// Direct form I delay line.
#[derive(Clone, Copy, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f32, coeffs: &BiquadCoeffs) -> f32 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Single biquad filter with runtime-selectable response type.
pub struct BiquadUnit {
    filter_type: FilterType,
    frequency: f32,
    q: f32,
    /// Gain in dB; only shelf and peaking types use it.
    gain: f32,
    /// Detune in cents, shifting the effective frequency.
    detune: f32,
    coeffs: BiquadCoeffs,
    state: BiquadState,
    sample_rate: f32,
}

impl BiquadUnit {
    /// Creates a biquad filter unit.
    pub fn new(
        filter_type: FilterType,
        frequency: f32,
        q: f32,
        gain: f32,
        detune: f32,
        sample_rate: u32,
    ) -> Self {
        let mut unit = Self {
            filter_type,
            frequency,
            q,
            gain,
            detune,
            coeffs: BiquadCoeffs::default(),
            state: BiquadState::default(),
            sample_rate: sample_rate as f32,
        };
        unit.update_coeffs(frequency, q, gain, detune);
        unit
    }

    fn update_coeffs(&mut self, frequency: f32, q: f32, gain: f32, detune: f32) {
        let nyquist = self.sample_rate * 0.49;
        let freq = (frequency * (detune / 1200.0).exp2()).clamp(1.0, nyquist);
        let q = q.max(0.0001);
        let a = (10.0f32).powf(gain / 40.0);

        let w0 = std::f32::consts::TAU * freq / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        // Shelf slope fixed at 1, like the host engine's shelving filters.
        let shelf_alpha = sin_w0 / 2.0 * std::f32::consts::SQRT_2;
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * shelf_alpha;

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (
                    b1 / 2.0,
                    b1,
                    b1 / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterType::Highpass => {
                let b1 = -(1.0 + cos_w0);
                (
                    -b1 / 2.0,
                    b1,
                    -b1 / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            FilterType::Bandpass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Notch => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Allpass => (
                1.0 - alpha,
                -2.0 * cos_w0,
                1.0 + alpha,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterType::Peaking => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::Lowshelf => (
                a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            ),
            FilterType::Highshelf => (
                a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
            ),
        };

        self.coeffs = BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
    }
}

impl Unit for BiquadUnit {
    fn mod_targets(&self) -> &'static [&'static str] {
        &["frequency", "Q", "gain", "detune"]
    }

    fn apply(&mut self, update: &UnitUpdate) {
        if let UnitUpdate::BiquadFilter {
            filter_type,
            frequency,
            q,
            gain,
            detune,
        } = update
        {
            self.filter_type = *filter_type;
            self.frequency = *frequency;
            self.q = *q;
            self.gain = *gain;
            self.detune = *detune;
            self.update_coeffs(self.frequency, self.q, self.gain, self.detune);
        }
    }

    fn process(&mut self, input: &[f32], mods: &ModInputs, output: &mut [f32]) {
        let frequency = self.frequency + mods.block_mean("frequency");
        let q = self.q + mods.block_mean("Q");
        let gain = self.gain + mods.block_mean("gain");
        let detune = self.detune + mods.block_mean("detune");
        self.update_coeffs(frequency, q, gain, detune);

        for (i, out) in output.iter_mut().enumerate() {
            let sample = input.get(i).copied().unwrap_or(0.0);
            *out = self.state.process(sample, &self.coeffs);
        }
    }
}
