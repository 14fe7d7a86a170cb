//! Encode quality and the constants of the quality descent.
//!
//! - [`Quality`]: lossy encoding quality as a fraction in `(0, 1]`. Clamped on
//!   construction, mapped to the JPEG encoder's `1..=100` scale on use.
//! - [`QUALITY_STEP`] / [`QUALITY_FLOOR`] / [`MAX_DESCENT_STEPS`]: the fixed
//!   schedule [`compress_to_fit`](super::operations::compress_to_fit) walks.

/// Amount subtracted from the quality on each descent step.
pub const QUALITY_STEP: f32 = 0.1;

/// Lowest quality the descent will try.
pub const QUALITY_FLOOR: f32 = 0.1;

/// Upper bound on re-encodes after the first attempt.
pub const MAX_DESCENT_STEPS: u32 = 9;

/// Slack for float error when comparing against [`QUALITY_FLOOR`]
/// (`1.0 - 0.1 * 9.0` lands just under `0.1`).
const FLOOR_TOLERANCE: f32 = 1e-6;

/// Quality setting for lossy encoding, `0.0 < q <= 1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quality(f32);

impl Quality {
    /// Smallest representable quality; maps to JPEG quality 1.
    pub const MIN: Quality = Quality(0.01);

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(Self::MIN.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// The `1..=100` quality understood by JPEG encoders.
    pub fn to_jpeg(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.85)
    }
}

/// Qualities tried after the first encode at `target`, highest first.
///
/// `target - 0.1`, `target - 0.2`, … down to the `0.1` floor, at most
/// [`MAX_DESCENT_STEPS`] values. Computed by multiplication rather than
/// repeated subtraction so error does not accumulate.
pub fn descent_schedule(target: f32) -> impl Iterator<Item = f32> {
    (1..=MAX_DESCENT_STEPS)
        .map(move |step| target - QUALITY_STEP * step as f32)
        .take_while(|q| *q >= QUALITY_FLOOR - FLOOR_TOLERANCE)
}
