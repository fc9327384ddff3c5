//! Game descriptions and the append-only history they leave behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::detection::{TagScore, TallyScore};
use crate::difficulty::{clamp_progress, Level};

/// Unique identifier for history records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub Uuid);

impl GameId {
    /// Create a new random game ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a nil game ID.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The session being scored, as the caller configured it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub n_back: Level,

    /// Progress within the current level. Absent means 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_progress: Option<f64>,

    /// Stimulus tags this game mode scores.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Wall-clock length of the session in seconds.
    #[serde(default)]
    pub duration_secs: u64,

    /// Anything else the caller wants carried into history.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl GameInfo {
    /// Create game info for a level with no progress and no tags.
    pub fn new(n_back: u32) -> Self {
        Self {
            n_back: Level::new(n_back),
            level_progress: None,
            tags: BTreeSet::new(),
            duration_secs: 0,
            extra: BTreeMap::new(),
        }
    }

    /// Set the progress within the level.
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.level_progress = Some(progress);
        self
    }

    /// Add a scored stimulus tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add multiple scored stimulus tags.
    pub fn with_tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the session length.
    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Progress within the level, defaulting to 0 and clamped to 0.0 - 1.0.
    pub fn progress(&self) -> f64 {
        clamp_progress(self.level_progress.unwrap_or(0.0))
    }
}

/// How a scored session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Completed,
    /// Stopped before the last trial.
    Abandoned,
}

/// Status of a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    Completed,
    Abandoned,
    /// Marks a level transition, never carries scores.
    Tombstone,
}

impl From<SessionStatus> for GameStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Completed => GameStatus::Completed,
            SessionStatus::Abandoned => GameStatus::Abandoned,
        }
    }
}

/// Which way a level transition went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionResult {
    LevelUp,
    LevelDown,
}

/// Scores stored with a session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scores {
    /// Tally-mode counts.
    Tally { tally: TallyScore },
    /// Hit/miss per stimulus tag.
    PerTag(BTreeMap<String, TagScore>),
}

/// One entry in the game history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHistoryRecord {
    pub id: GameId,
    pub recorded_at: DateTime<Utc>,

    #[serde(flatten)]
    pub game: GameInfo,

    pub status: GameStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TransitionResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,

    /// d′ of the session; tally mode has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_trials: Option<u32>,
}

impl GameHistoryRecord {
    /// Record for a scored session.
    pub fn scored(
        game: GameInfo,
        status: SessionStatus,
        scores: Scores,
        dp: Option<f64>,
        completed_trials: u32,
    ) -> Self {
        Self {
            id: GameId::new(),
            recorded_at: Utc::now(),
            game,
            status: status.into(),
            result: None,
            scores: Some(scores),
            dp,
            completed_trials: Some(completed_trials),
        }
    }

    /// Marker for a level transition. Carries the game as it was before the
    /// transition.
    pub fn tombstone(game: GameInfo, result: TransitionResult) -> Self {
        Self {
            id: GameId::new(),
            recorded_at: Utc::now(),
            game,
            status: GameStatus::Tombstone,
            result: Some(result),
            scores: None,
            dp: None,
            completed_trials: None,
        }
    }

    /// Override the timestamp.
    pub fn with_recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }

    pub fn is_tombstone(&self) -> bool {
        self.status == GameStatus::Tombstone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_info_defaults() {
        let info: GameInfo = serde_json::from_str(r#"{"nBack": 3}"#).unwrap();
        assert_eq!(info.n_back.get(), 3);
        assert_eq!(info.progress(), 0.0);
        assert!(info.tags.is_empty());
        assert_eq!(info.duration_secs, 0);
    }

    #[test]
    fn test_game_info_keeps_extra_fields() {
        let json = r#"{"nBack": 2, "levelProgress": 0.4, "tags": ["audio", "position"], "title": "Dual N-Back"}"#;
        let info: GameInfo = serde_json::from_str(json).unwrap();

        assert!((info.progress() - 0.4).abs() < 1e-9);
        assert!(info.tags.contains("audio"));
        assert_eq!(info.extra["title"], serde_json::json!("Dual N-Back"));

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["title"], "Dual N-Back");
        assert_eq!(back["levelProgress"], 0.4);
    }

    #[test]
    fn test_progress_clamped() {
        assert_eq!(GameInfo::new(2).with_progress(1.7).progress(), 1.0);
        assert_eq!(GameInfo::new(2).with_progress(-0.2).progress(), 0.0);
    }

    #[test]
    fn test_tombstone_has_no_scores() {
        let game = GameInfo::new(4).with_progress(0.93);
        let record = GameHistoryRecord::tombstone(game.clone(), TransitionResult::LevelUp);

        assert!(record.is_tombstone());
        assert_eq!(record.result, Some(TransitionResult::LevelUp));
        assert!(record.scores.is_none());
        assert!(record.dp.is_none());
        assert!(record.completed_trials.is_none());
        assert_eq!(record.game, game);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "tombstone");
        assert_eq!(json["result"], "level-up");
        assert!(json.get("scores").is_none());
    }

    #[test]
    fn test_scored_record_shape() {
        let mut tags = BTreeMap::new();
        tags.insert("audio".to_string(), TagScore { hits: 4, misses: 1 });

        let record = GameHistoryRecord::scored(
            GameInfo::new(2).with_tag("audio"),
            SessionStatus::Completed,
            Scores::PerTag(tags),
            Some(2.1),
            20,
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["nBack"], 2);
        assert_eq!(json["completedTrials"], 20);
        assert_eq!(json["scores"]["audio"]["hits"], 4);
    }

    #[test]
    fn test_scores_untagged_roundtrip() {
        let tally: Scores =
            serde_json::from_str(r#"{"tally": {"hits": 3, "misses": 0, "possible": 5}}"#).unwrap();
        assert!(matches!(tally, Scores::Tally { tally } if tally.possible == 5));

        let per_tag: Scores =
            serde_json::from_str(r#"{"position": {"hits": 3, "misses": 2}}"#).unwrap();
        assert!(matches!(per_tag, Scores::PerTag(map) if map["position"].misses == 2));
    }
}
