//! Progression controller - adapts difficulty between sessions.
//!
//! Each completed session moves the player through a two-part state:
//! a discrete level (the n in n-back, 1-12) and continuous progress within
//! that level (0.0-1.0). The update works as follows:
//! 1. **Score**: tally the scoresheet and compute d′
//! 2. **Adjust**: move progress by the delta of the first band d′ reaches
//! 3. **Level up**: at high progress, go up a level and restart at 0
//! 4. **Level down**: failing at zero progress drops a level, re-entering halfway
//! 5. **Derive**: map progress to next session's stimulus settings

use nback_rules::{
    clamp_progress, round_progress, DifficultyParams, GameHistoryRecord, GameInfo, Level,
    SignalCounts, TransitionResult, TrialRecord,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ProgressionConfig;
use crate::error::Result;
use crate::store::{AppSettings, GameHistory, GameSettings, SettingsSink};

/// Level change signalled to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LevelEvent {
    #[default]
    None,
    /// Moved up a level.
    Advance,
    /// Dropped down a level.
    Fallback,
}

/// Everything one session's evaluation decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionOutcome {
    pub counts: SignalCounts,
    pub d_prime: f64,
    /// Label of the band the session landed in.
    pub band: String,
    pub previous_level: Level,
    pub level: Level,
    /// Progress for the next session, rounded to two decimals.
    pub progress: f64,
    pub params: DifficultyParams,
    pub event: LevelEvent,
    /// Transition marker to append to history, when the level changed.
    pub tombstone: Option<GameHistoryRecord>,
}

impl ProgressionOutcome {
    /// The settings record for the next session.
    pub fn settings(&self) -> GameSettings {
        GameSettings::new(self.level, self.params, self.progress)
    }
}

/// Score a session and decide the next level, progress and settings.
///
/// Pure: nothing is written anywhere.
pub fn evaluate(
    config: &ProgressionConfig,
    game: &GameInfo,
    sheet: &[Option<TrialRecord>],
) -> ProgressionOutcome {
    let counts = config.count_signals(game, sheet);
    let d_prime = counts.d_prime();
    let band = config.band_for(d_prime);

    log_breakdown(&counts, d_prime, band.label);

    let previous_level = game.n_back;
    let mut level = previous_level;
    let mut progress = round_progress(clamp_progress(game.progress() + band.delta));
    let mut event = LevelEvent::None;
    let mut tombstone = None;

    if progress >= config.level_up_at {
        if let Some(next) = level.up() {
            level = next;
            progress = 0.0;
            event = LevelEvent::Advance;
            tombstone = Some(GameHistoryRecord::tombstone(
                game.clone(),
                TransitionResult::LevelUp,
            ));
        }
    } else if progress == 0.0 && d_prime < config.level_down_below {
        if let Some(prev) = level.down() {
            level = prev;
            progress = config.fallback_progress;
            event = LevelEvent::Fallback;
            tombstone = Some(GameHistoryRecord::tombstone(
                game.clone(),
                TransitionResult::LevelDown,
            ));
        }
    }

    ProgressionOutcome {
        counts,
        d_prime,
        band: band.label.to_string(),
        previous_level,
        level,
        progress: round_progress(progress),
        params: DifficultyParams::from_progress(progress),
        event,
        tombstone,
    }
}

fn log_breakdown(counts: &SignalCounts, d_prime: f64, band: &str) {
    let pct = |rate: Option<f64>| {
        rate.map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a".to_string())
    };
    debug!(
        hits = counts.hits,
        misses = counts.misses,
        false_alarms = counts.false_alarms,
        non_targets = counts.non_targets,
        "Session: hit rate {} | FA rate {} | d' {:.3} ({})",
        pct(counts.hit_rate()),
        pct(counts.false_alarm_rate()),
        d_prime,
        band
    );
}

/// Runs progression against the history store and settings sink.
pub struct ProgressionController<H, S> {
    history: H,
    sink: S,
    config: ProgressionConfig,
}

impl<H: GameHistory, S: SettingsSink> ProgressionController<H, S> {
    /// Create a controller with the given configuration.
    pub fn new(history: H, sink: S, config: ProgressionConfig) -> Self {
        Self {
            history,
            sink,
            config,
        }
    }

    /// Create a controller with the default band table.
    pub fn with_defaults(history: H, sink: S) -> Self {
        Self::new(history, sink, ProgressionConfig::default())
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Score a completed session and write the next session's settings.
    ///
    /// Returns `None` without touching any collaborator when auto-progression
    /// is disabled. A level change appends its tombstone before the settings
    /// are written. Collaborator errors are returned as-is.
    pub async fn run(
        &self,
        settings: &AppSettings,
        game: &GameInfo,
        sheet: &[Option<TrialRecord>],
    ) -> Result<Option<ProgressionOutcome>> {
        if !settings.enable_auto_progression {
            debug!("Auto-progression disabled, skipping");
            return Ok(None);
        }

        let outcome = evaluate(&self.config, game, sheet);

        if let Some(tombstone) = &outcome.tombstone {
            self.history.add_game(tombstone.clone()).await?;
            info!(
                "Level {:?}: {} -> {} (d' {:.3})",
                outcome.event, outcome.previous_level, outcome.level, outcome.d_prime
            );
        }

        self.sink.write_settings(outcome.settings()).await?;

        Ok(Some(outcome))
    }
}
