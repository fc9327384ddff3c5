//! Collaborator seams: durable game history and the next-session settings.
//!
//! Both are async because real backends do I/O. The engine never retries a
//! failed call; errors go straight back to the caller.

mod memory;

pub use memory::*;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use nback_rules::{round_progress, DifficultyParams, GameHistoryRecord, Level};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// User settings the engine reads once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_enable_auto_progression")]
    pub enable_auto_progression: bool,
}

fn default_enable_auto_progression() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            enable_auto_progression: default_enable_auto_progression(),
        }
    }
}

/// Configuration for the next session. Always written as a whole record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub n_back: Level,
    pub match_chance: u32,
    pub interference: u32,
    pub trial_time: u32,
    /// Rounded to two decimals.
    pub level_progress: f64,
}

impl GameSettings {
    pub fn new(n_back: Level, params: DifficultyParams, level_progress: f64) -> Self {
        Self {
            n_back,
            match_chance: params.match_chance,
            interference: params.interference,
            trial_time: params.trial_time,
            level_progress: round_progress(level_progress),
        }
    }

    /// The stimulus part of these settings.
    pub fn params(&self) -> DifficultyParams {
        DifficultyParams {
            match_chance: self.match_chance,
            interference: self.interference,
            trial_time: self.trial_time,
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(Level::default(), DifficultyParams::default(), 0.0)
    }
}

/// Append-only game history.
#[async_trait]
pub trait GameHistory: Send + Sync {
    /// Append a record.
    async fn add_game(&self, record: GameHistoryRecord) -> Result<()>;

    /// The most recent non-tombstone record.
    async fn last_recent_game(&self) -> Result<Option<GameHistoryRecord>>;

    /// Every record at or after `since`, newest first, tombstones included.
    async fn games_since(&self, since: DateTime<Utc>) -> Result<Vec<GameHistoryRecord>>;

    /// Total session seconds of scored games at or after `since`.
    async fn play_time_since(&self, since: DateTime<Utc>) -> Result<u64>;

    /// Every record from the last `hours` hours, newest first.
    async fn games_in_last_hours(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<GameHistoryRecord>> {
        self.games_since(now - Duration::hours(i64::from(hours))).await
    }
}

/// Receives the settings for the next session.
#[async_trait]
pub trait SettingsSink: Send + Sync {
    async fn write_settings(&self, settings: GameSettings) -> Result<()>;
}
