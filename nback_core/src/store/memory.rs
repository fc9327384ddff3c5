//! In-memory collaborators for embedding and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nback_rules::GameHistoryRecord;
use tokio::sync::Mutex;

use super::{GameHistory, GameSettings, SettingsSink};
use crate::error::Result;

/// Game history kept in a vector, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    records: Mutex<Vec<GameHistoryRecord>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: Vec<GameHistoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Snapshot of every record in insertion order.
    pub async fn records(&self) -> Vec<GameHistoryRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl GameHistory for InMemoryGameStore {
    async fn add_game(&self, record: GameHistoryRecord) -> Result<()> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn last_recent_game(&self) -> Result<Option<GameHistoryRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| !r.is_tombstone())
            .max_by_key(|r| r.recorded_at)
            .cloned())
    }

    async fn games_since(&self, since: DateTime<Utc>) -> Result<Vec<GameHistoryRecord>> {
        let records = self.records.lock().await;
        let mut games: Vec<_> = records
            .iter()
            .filter(|r| r.recorded_at >= since)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps; reverse after.
        games.sort_by_key(|r| r.recorded_at);
        games.reverse();
        Ok(games)
    }

    async fn play_time_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| !r.is_tombstone() && r.recorded_at >= since)
            .map(|r| r.game.duration_secs)
            .sum())
    }
}

/// Holds the latest settings written.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    current: Mutex<Option<GameSettings>>,
    writes: Mutex<usize>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last settings written, if any.
    pub async fn current(&self) -> Option<GameSettings> {
        *self.current.lock().await
    }

    /// How many times settings were written.
    pub async fn write_count(&self) -> usize {
        *self.writes.lock().await
    }
}

#[async_trait]
impl SettingsSink for InMemorySettings {
    async fn write_settings(&self, settings: GameSettings) -> Result<()> {
        *self.current.lock().await = Some(settings);
        *self.writes.lock().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nback_rules::{GameInfo, Scores, SessionStatus, TransitionResult};
    use std::collections::BTreeMap;

    fn completed(duration_secs: u64, at: DateTime<Utc>) -> GameHistoryRecord {
        GameHistoryRecord::scored(
            GameInfo::new(2).with_duration_secs(duration_secs),
            SessionStatus::Completed,
            Scores::PerTag(BTreeMap::new()),
            Some(1.0),
            20,
        )
        .with_recorded_at(at)
    }

    #[tokio::test]
    async fn test_last_recent_game_skips_tombstones() {
        let now = Utc::now();
        let store = InMemoryGameStore::new();

        assert!(store.last_recent_game().await.unwrap().is_none());

        let game = completed(60, now - Duration::minutes(5));
        store.add_game(game.clone()).await.unwrap();
        store
            .add_game(
                GameHistoryRecord::tombstone(GameInfo::new(2), TransitionResult::LevelUp)
                    .with_recorded_at(now),
            )
            .await
            .unwrap();

        let last = store.last_recent_game().await.unwrap().unwrap();
        assert_eq!(last.id, game.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_games_since_newest_first() {
        let now = Utc::now();
        let old = completed(60, now - Duration::hours(72));
        let mid = completed(60, now - Duration::hours(10));
        let new = completed(60, now - Duration::hours(1));
        let store = InMemoryGameStore::with_records(vec![mid.clone(), old, new.clone()]);

        let recent = store.games_in_last_hours(48, now).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, new.id);
        assert_eq!(recent[1].id, mid.id);
    }

    #[tokio::test]
    async fn test_play_time_since() {
        let now = Utc::now();
        let store = InMemoryGameStore::with_records(vec![
            completed(120, now - Duration::hours(30)),
            completed(90, now - Duration::hours(2)),
            completed(45, now - Duration::minutes(10)),
            GameHistoryRecord::tombstone(
                GameInfo::new(2).with_duration_secs(999),
                TransitionResult::LevelDown,
            )
            .with_recorded_at(now),
        ]);

        let total = store
            .play_time_since(now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(total, 135);
    }

    #[tokio::test]
    async fn test_settings_replace_whole_record() {
        let sink = InMemorySettings::new();
        assert!(sink.current().await.is_none());

        sink.write_settings(GameSettings::default()).await.unwrap();
        let next = GameSettings {
            match_chance: 20,
            ..GameSettings::default()
        };
        sink.write_settings(next).await.unwrap();

        assert_eq!(sink.current().await, Some(next));
        assert_eq!(sink.write_count().await, 2);
    }
}
