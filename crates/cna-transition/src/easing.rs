//! Easing curves

/// `1 − (1 − p)³`, with `p` clamped to `[0, 1]`
///
/// Fast at the start, settling gently into the target.
#[inline]
#[must_use]
pub fn ease_out_cubic(progress: f64) -> f64 {
    let p = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    1.0 - (1.0 - p).powi(3)
}
