//! Vendor-flexibility signals
//!
//! The flexibility score and trend are an external prediction, not a
//! function of the contract. They come from a [`SignalProvider`] so tests can
//! inject fixed values and production can seed a generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a signal or recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Improving
    Up,
    /// Worsening
    Down,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Vendor-flexibility score, always within `[60, 90]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FlexibilityScore(u8);

impl FlexibilityScore {
    /// Lowest score a provider may report
    pub const MIN: u8 = 60;
    /// Highest score a provider may report
    pub const MAX: u8 = 90;

    /// Create score, rejecting values outside `[MIN, MAX]`
    #[inline]
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    /// Create score, clamping into `[MIN, MAX]`
    #[inline]
    #[must_use]
    pub fn clamped(value: u8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FlexibilityScore {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "flexibility score {value} outside [{}, {}]",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<FlexibilityScore> for u8 {
    fn from(score: FlexibilityScore) -> Self {
        score.0
    }
}

/// One draw from a signal provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexibilitySignal {
    /// Bounded score
    pub score: FlexibilityScore,
    /// Independent trend direction
    pub trend: Trend,
}

impl FlexibilitySignal {
    /// Create new signal
    #[inline]
    #[must_use]
    pub fn new(score: FlexibilityScore, trend: Trend) -> Self {
        Self { score, trend }
    }
}

/// Source of flexibility predictions
#[cfg_attr(test, mockall::automock)]
pub trait SignalProvider: Send {
    /// Draw the signal for one derivation
    fn next_signal(&mut self) -> FlexibilitySignal;
}

/// Seeded pseudo-random provider
#[derive(Debug, Clone)]
pub struct SeededSignals {
    rng: StdRng,
}

impl SeededSignals {
    /// Create from seed (same seed, same sequence)
    #[inline]
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create from operating-system entropy
    #[inline]
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl SignalProvider for SeededSignals {
    fn next_signal(&mut self) -> FlexibilitySignal {
        let score = self
            .rng
            .random_range(FlexibilityScore::MIN..=FlexibilityScore::MAX);
        let trend = if self.rng.random_bool(0.5) {
            Trend::Up
        } else {
            Trend::Down
        };
        FlexibilitySignal::new(FlexibilityScore::clamped(score), trend)
    }
}

/// Provider that always reports the same signal
#[derive(Debug, Clone, Copy)]
pub struct FixedSignals(pub FlexibilitySignal);

impl FixedSignals {
    /// Create fixed provider; the score is clamped into range
    #[inline]
    #[must_use]
    pub fn new(score: u8, trend: Trend) -> Self {
        Self(FlexibilitySignal::new(FlexibilityScore::clamped(score), trend))
    }
}

impl SignalProvider for FixedSignals {
    fn next_signal(&mut self) -> FlexibilitySignal {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds() {
        assert!(FlexibilityScore::new(59).is_none());
        assert!(FlexibilityScore::new(60).is_some());
        assert!(FlexibilityScore::new(90).is_some());
        assert!(FlexibilityScore::new(91).is_none());
        assert_eq!(FlexibilityScore::clamped(200).value(), 90);
        assert_eq!(FlexibilityScore::clamped(0).value(), 60);
    }

    #[test]
    fn seeded_provider_is_reproducible() {
        let mut a = SeededSignals::new(42);
        let mut b = SeededSignals::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_signal(), b.next_signal());
        }
    }

    #[test]
    fn seeded_provider_stays_in_bounds() {
        let mut signals = SeededSignals::new(7);
        for _ in 0..1_000 {
            let score = signals.next_signal().score.value();
            assert!((FlexibilityScore::MIN..=FlexibilityScore::MAX).contains(&score));
        }
    }

    #[test]
    fn score_deserialization_is_checked() {
        let ok: FlexibilityScore = serde_json::from_str("75").unwrap();
        assert_eq!(ok.value(), 75);
        assert!(serde_json::from_str::<FlexibilityScore>("95").is_err());
    }

    #[test]
    fn fixed_provider_repeats() {
        let mut fixed = FixedSignals::new(80, Trend::Down);
        assert_eq!(fixed.next_signal(), fixed.next_signal());
        assert_eq!(fixed.next_signal().trend, Trend::Down);
    }
}
