use rand::Rng;
use serde::Serialize;
use serde_with::DeserializeFromStr;
use std::ops::Range;
use strum::{Display as StrumDisplay, EnumIter, EnumString};

/// Below this many degrees per tick the wheel counts as stopped.
pub const MIN_VELOCITY: f64 = 0.01;

pub const RANDOM_VELOCITY: Range<f64> = 8.0..16.0;
pub const RANDOM_DECAY: Range<f64> = 0.975..0.99;

/// Velocity of a spin (degrees per tick) and how it decays.
///
/// Deceleration is geometric: every tick the velocity is multiplied by
/// `decay`, so it approaches zero smoothly and never changes sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedProfile {
    velocity: f64,
    decay: f64,
}

impl SpeedProfile {
    /// `decay` is clamped into `[0, 1)` so that every run terminates.
    pub fn new(velocity: f64, decay: f64) -> Self {
        Self {
            velocity: velocity.max(0.0),
            decay: decay.clamp(0.0, 0.9999),
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(
            rng.random_range(RANDOM_VELOCITY),
            rng.random_range(RANDOM_DECAY),
        )
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// The profile one tick later.
    pub fn decayed(self) -> Self {
        Self {
            velocity: self.velocity * self.decay,
            ..self
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.velocity < MIN_VELOCITY
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    DeserializeFromStr,
    EnumString,
    EnumIter,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreset {
    #[strum(serialize = "Slow", serialize = "s", serialize = "0")]
    Slow,
    #[strum(serialize = "Normal", serialize = "n", serialize = "1")]
    Normal,
    #[strum(serialize = "Fast", serialize = "f", serialize = "2")]
    Fast,
}

impl SpeedPreset {
    pub fn profile(self) -> SpeedProfile {
        match self {
            Self::Slow => SpeedProfile::new(6.0, 0.97),
            Self::Normal => SpeedProfile::new(12.0, 0.98),
            Self::Fast => SpeedProfile::new(20.0, 0.985),
        }
    }
}

impl From<SpeedPreset> for SpeedProfile {
    fn from(preset: SpeedPreset) -> Self {
        preset.profile()
    }
}
