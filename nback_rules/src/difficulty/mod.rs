//! Difficulty curves: continuous in-level progress to concrete stimulus settings.

use serde::{Deserialize, Serialize};

/// Lowest n-back level.
pub const MIN_LEVEL: u32 = 1;

/// Highest n-back level.
pub const MAX_LEVEL: u32 = 12;

/// Match chance (percent) at the start of a level.
pub const BASE_MATCH_CHANCE: f64 = 25.0;

/// Interference (percent) at the end of a level.
pub const MAX_INTERFERENCE: f64 = 35.0;

/// Trial time (ms) at the start of a level.
pub const BASE_TRIAL_TIME_MS: f64 = 2500.0;

/// How much faster a trial is at the end of a level, in ms.
pub const TRIAL_TIME_SPAN_MS: f64 = 1000.0;

/// Stimulus settings for the next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyParams {
    /// Probability (percent) that a trial is a target.
    pub match_chance: u32,
    /// Probability (percent) of a lure stimulus.
    pub interference: u32,
    /// Stimulus exposure window in milliseconds.
    pub trial_time: u32,
}

impl DifficultyParams {
    /// Map progress within a level (clamped to 0.0 - 1.0) to stimulus settings.
    ///
    /// - match chance decays exponentially from 25% to 12.5%
    /// - interference ramps quadratically from 0% to 35%
    /// - trial time falls linearly from 2500 ms to 1500 ms
    pub fn from_progress(progress: f64) -> Self {
        let p = clamp_progress(progress);

        Self {
            match_chance: (BASE_MATCH_CHANCE * 0.5_f64.powf(p)).round() as u32,
            interference: (MAX_INTERFERENCE * p * p).round() as u32,
            trial_time: (BASE_TRIAL_TIME_MS - TRIAL_TIME_SPAN_MS * p).round() as u32,
        }
    }
}

impl Default for DifficultyParams {
    fn default() -> Self {
        Self::from_progress(0.0)
    }
}

/// Clamp progress into 0.0 - 1.0. NaN is treated as no progress.
pub fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Round progress to two decimals for storage.
pub fn round_progress(progress: f64) -> f64 {
    (progress * 100.0).round() / 100.0
}

/// An n-back level, always within `MIN_LEVEL..=MAX_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Level(u32);

impl Level {
    /// Create a level, clamping into the valid range.
    pub fn new(n: u32) -> Self {
        Self(n.clamp(MIN_LEVEL, MAX_LEVEL))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn is_max(&self) -> bool {
        self.0 >= MAX_LEVEL
    }

    pub fn is_min(&self) -> bool {
        self.0 <= MIN_LEVEL
    }

    /// The next level up, or `None` at the top.
    pub fn up(&self) -> Option<Self> {
        (!self.is_max()).then(|| Self(self.0 + 1))
    }

    /// The next level down, or `None` at the bottom.
    pub fn down(&self) -> Option<Self> {
        (!self.is_min()).then(|| Self(self.0 - 1))
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(MIN_LEVEL)
    }
}

impl From<u32> for Level {
    fn from(n: u32) -> Self {
        Self::new(n)
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-back", self.0)
    }
}
