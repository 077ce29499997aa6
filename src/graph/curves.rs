//! Wave-shaper transfer curves.
//!
//! Curves are derived data: regenerated from the curve type and amount
//! whenever either changes, and again on patch load, so a stored patch can
//! never smuggle in a stale or hand-edited curve.

use super::module::CurveType;

/// Number of samples in a generated transfer curve.
pub const CURVE_LEN: usize = 2048;

/// Generates the transfer curve for a curve type at the given drive amount.
///
/// `amount` is the wave-shaper module's 0-100 drive knob. `CurveType::None`
/// yields an empty curve, which the live unit treats as a pass-through.
/// Output samples stay within [-1, 1].
pub fn generate_curve(curve_type: CurveType, amount: f32) -> Vec<f32> {
    let k = amount.max(0.0);
    match curve_type {
        CurveType::None => Vec::new(),
        CurveType::Distortion => shape(|x| {
            let deg = std::f32::consts::PI / 180.0;
            ((3.0 + k) * x * 20.0 * deg) / (std::f32::consts::PI + k * x.abs())
        }),
        CurveType::Fuzz => shape(|x| x.signum() * (1.0 - (-(x.abs() * (1.0 + k / 10.0))).exp())),
        CurveType::Overdrive => {
            shape(|x| (x * (1.0 + k / 10.0)).atan() * std::f32::consts::FRAC_2_PI)
        }
        CurveType::Sawtooth => shape(|x| {
            let teeth = 1.0 + (k / 20.0).floor();
            let t = (x + 1.0) * 0.5 * teeth;
            2.0 * (t - t.floor()) - 1.0
        }),
    }
}

fn shape(f: impl Fn(f32) -> f32) -> Vec<f32> {
    (0..CURVE_LEN)
        .map(|i| {
            let x = (i as f32 / (CURVE_LEN - 1) as f32) * 2.0 - 1.0;
            f(x).clamp(-1.0, 1.0)
        })
        .collect()
}
