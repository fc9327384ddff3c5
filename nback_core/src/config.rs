//! Progression tuning.
//!
//! Defaults reproduce the standard band table. A TOML file may override any
//! subset of fields:
//!
//! ```toml
//! level_up_at = 0.8
//! non_target_accounting = "derived-from-total"
//!
//! [[bands]]
//! min_d_prime = 2.5
//! delta = 0.05
//! label = "mastery"
//! ```

use nback_rules::{observed_tags, GameInfo, SignalCounts, TrialRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{ProgressionError, Result};

/// One row of the progress table: sessions scoring at least `min_d_prime`
/// move progress by `delta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min_d_prime: f64,
    pub delta: f64,
    pub label: String,
}

impl Band {
    pub fn new(min_d_prime: f64, delta: f64, label: impl Into<String>) -> Self {
        Self {
            min_d_prime,
            delta,
            label: label.into(),
        }
    }
}

/// The band a session landed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandHit<'a> {
    pub delta: f64,
    pub label: &'a str,
}

/// Where the false-alarm denominator comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonTargetAccounting {
    /// Count entries explicitly tagged `non-target`.
    #[default]
    ExplicitTag,
    /// Present trials times scored tags, minus targets.
    DerivedFromTotal,
}

fn default_bands() -> Vec<Band> {
    vec![
        Band::new(2.75, 0.08, "mastery"),
        Band::new(2.0, 0.04, "sweet-spot"),
        Band::new(1.5, 0.01, "hanging-on"),
        Band::new(1.0, 0.0, "edge"),
        Band::new(0.5, -0.02, "struggling"),
    ]
}

/// Tuning for the progression controller and the analytics summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Bands ordered from the highest threshold down. First match wins.
    pub bands: Vec<Band>,

    /// Delta for sessions below every band.
    pub floor_delta: f64,

    /// Progress at which the level goes up.
    pub level_up_at: f64,

    /// d′ below which a session at zero progress drops a level.
    pub level_down_below: f64,

    /// Progress to re-enter the lower level with after a fallback.
    pub fallback_progress: f64,

    pub non_target_accounting: NonTargetAccounting,

    /// Local hour at which the daily play-time counter resets.
    pub rollover_hour: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
            floor_delta: -0.06,
            level_up_at: 0.90,
            level_down_below: 0.5,
            fallback_progress: 0.5,
            non_target_accounting: NonTargetAccounting::ExplicitTag,
            rollover_hour: 4,
        }
    }
}

impl ProgressionConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded progression config from {}", path.display());
        Ok(config)
    }

    /// Reject tables the controller cannot use.
    pub fn validate(&self) -> Result<()> {
        for pair in self.bands.windows(2) {
            if pair[0].min_d_prime <= pair[1].min_d_prime {
                return Err(ProgressionError::InvalidConfig(format!(
                    "bands must be strictly descending: {} then {}",
                    pair[0].min_d_prime, pair[1].min_d_prime
                )));
            }
        }

        let deltas = self.bands.iter().map(|b| b.delta).chain([self.floor_delta]);
        let thresholds = self
            .bands
            .iter()
            .map(|b| b.min_d_prime)
            .chain([self.level_down_below]);
        if deltas.chain(thresholds).any(|v| !v.is_finite()) {
            return Err(ProgressionError::InvalidConfig(
                "band thresholds, deltas and level_down_below must be finite".to_string(),
            ));
        }

        if !(self.level_up_at > 0.0 && self.level_up_at <= 1.0) {
            return Err(ProgressionError::InvalidConfig(format!(
                "level_up_at must be in (0, 1], got {}",
                self.level_up_at
            )));
        }

        if !(0.0..=1.0).contains(&self.fallback_progress) {
            return Err(ProgressionError::InvalidConfig(format!(
                "fallback_progress must be in [0, 1], got {}",
                self.fallback_progress
            )));
        }

        if self.rollover_hour > 23 {
            return Err(ProgressionError::InvalidConfig(format!(
                "rollover_hour must be 0-23, got {}",
                self.rollover_hour
            )));
        }

        Ok(())
    }

    /// Pick the band for a d′ score. NaN falls through to the floor.
    pub fn band_for(&self, d_prime: f64) -> BandHit<'_> {
        self.bands
            .iter()
            .find(|band| d_prime >= band.min_d_prime)
            .map(|band| BandHit {
                delta: band.delta,
                label: &band.label,
            })
            .unwrap_or(BandHit {
                delta: self.floor_delta,
                label: "failure",
            })
    }

    /// Tally a scoresheet using the configured non-target accounting.
    pub fn count_signals(&self, game: &GameInfo, sheet: &[Option<TrialRecord>]) -> SignalCounts {
        match self.non_target_accounting {
            NonTargetAccounting::ExplicitTag => SignalCounts::from_scoresheet(sheet),
            NonTargetAccounting::DerivedFromTotal if game.tags.is_empty() => {
                SignalCounts::from_scoresheet(sheet)
                    .with_derived_non_targets(observed_tags(sheet).len())
            }
            // Every count comes from the scored tags only, so targets and
            // opportunities share one basis.
            NonTargetAccounting::DerivedFromTotal => {
                SignalCounts::from_scored_tags(sheet, &game.tags)
                    .with_derived_non_targets(game.tags.len())
            }
        }
    }
}
