//! Session analytics - records scored sessions and keeps a small activity summary.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use nback_rules::{
    tag_scores, tally_score, GameHistoryRecord, GameInfo, Scores, SessionStatus, TallyEntry,
    TrialRecord,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProgressionConfig;
use crate::error::Result;
use crate::store::GameHistory;

/// Recent activity shown between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub last_game: Option<GameHistoryRecord>,
    /// Play time since the daily rollover, absent when there was none.
    pub play_time: Option<String>,
}

/// Persists scored sessions and refreshes the activity summary.
pub struct AnalyticsRecorder<H> {
    history: H,
    config: ProgressionConfig,
}

impl<H: GameHistory> AnalyticsRecorder<H> {
    /// Create a recorder sharing the progression config's scoring rules.
    pub fn new(history: H, config: ProgressionConfig) -> Self {
        Self { history, config }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Record a flagged-match session: per-tag hit/miss tallies plus d′.
    pub async fn score_trials(
        &self,
        game: &GameInfo,
        sheet: &[Option<TrialRecord>],
        status: SessionStatus,
    ) -> Result<(GameHistoryRecord, ActivitySummary)> {
        let scores = tag_scores(sheet, game.tags.iter().map(String::as_str));
        let dp = self.config.count_signals(game, sheet).d_prime();

        let record = GameHistoryRecord::scored(
            game.clone(),
            status,
            Scores::PerTag(scores),
            Some(dp),
            trial_count(sheet.len()),
        );
        self.persist(record).await
    }

    /// Record a tally-mode session. No d′ for this mode.
    pub async fn score_tally_trials(
        &self,
        game: &GameInfo,
        entries: &[TallyEntry],
        status: SessionStatus,
    ) -> Result<(GameHistoryRecord, ActivitySummary)> {
        let record = GameHistoryRecord::scored(
            game.clone(),
            status,
            Scores::Tally {
                tally: tally_score(entries),
            },
            None,
            trial_count(entries.len()),
        );
        self.persist(record).await
    }

    async fn persist(
        &self,
        record: GameHistoryRecord,
    ) -> Result<(GameHistoryRecord, ActivitySummary)> {
        self.history.add_game(record.clone()).await?;
        debug!(
            "Recorded {:?} game {} at {}",
            record.status, record.id, record.game.n_back
        );
        let summary = self.refresh_summary().await?;
        Ok((record, summary))
    }

    /// Summary as of now, in local time.
    pub async fn refresh_summary(&self) -> Result<ActivitySummary> {
        self.refresh_summary_at(&Local::now()).await
    }

    /// Summary as of `now`; the rollover hour is read in `now`'s time zone.
    pub async fn refresh_summary_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<ActivitySummary> {
        let since = rollover_instant(now, self.config.rollover_hour);
        let last_game = self.history.last_recent_game().await?;
        let seconds = self.history.play_time_since(since).await?;

        Ok(ActivitySummary {
            last_game,
            play_time: (seconds > 0).then(|| format_duration(seconds)),
        })
    }

    /// Every record from the last `hours` hours, newest first.
    pub async fn recent_games(&self, hours: u32) -> Result<Vec<GameHistoryRecord>> {
        self.history.games_in_last_hours(hours, Utc::now()).await
    }

    /// Records from the last `hours` hours played since the latest level change.
    pub async fn games_since_transition(&self, hours: u32) -> Result<Vec<GameHistoryRecord>> {
        let games = self.recent_games(hours).await?;
        Ok(games.into_iter().take_while(|g| !g.is_tombstone()).collect())
    }
}

fn trial_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// The most recent occurrence of `hour`:00 local time at or before `now`.
pub fn rollover_instant<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> DateTime<Utc> {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let today = now.date_naive();

    match local_hour(&tz, today, hour) {
        Some(instant) if instant <= now_utc => instant,
        Some(instant) => today
            .pred_opt()
            .and_then(|yesterday| local_hour(&tz, yesterday, hour))
            .unwrap_or(instant - Duration::days(1)),
        // The hour does not exist today (DST gap).
        None => now_utc - Duration::days(1),
    }
}

fn local_hour<Tz: TimeZone>(tz: &Tz, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format seconds as `1h 02m 03s`, `4m 05s` or `9s`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
