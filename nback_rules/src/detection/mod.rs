//! Signal-detection scoring: outcome tallies and the d′ sensitivity index.
//!
//! Counts are collected from a [`Scoresheet`] and turned into d′ with the
//! log-linear (Hautus) correction, so rates of exactly 0 or 1 never reach the
//! probit and the score is always finite.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::{BTreeMap, BTreeSet};

use crate::trials::{TallyEntry, TrialOutcome, TrialRecord};

/// Bias-corrected sensitivity from raw counts.
///
/// `hit_rate = (hits + 0.5) / (hits + misses + 1)` and
/// `fa_rate = (false_alarms + 0.5) / (non_targets + 1)`, then
/// `d′ = Φ⁻¹(hit_rate) − Φ⁻¹(fa_rate)`.
///
/// A false alarm always happens on a non-target, so the non-target count is
/// raised to at least `false_alarms`. This keeps the rate below 1 when the
/// caller only counts correctly rejected non-targets.
pub fn d_prime(hits: u32, misses: u32, false_alarms: u32, non_targets: u32) -> f64 {
    let non_targets = f64::from(non_targets.max(false_alarms));
    let hits = f64::from(hits);
    let misses = f64::from(misses);
    let false_alarms = f64::from(false_alarms);

    let hit_rate = (hits + 0.5) / (hits + misses + 1.0);
    let fa_rate = (false_alarms + 0.5) / (non_targets + 1.0);

    probit(hit_rate) - probit(fa_rate)
}

/// Standard normal quantile function.
fn probit(p: f64) -> f64 {
    Normal::standard().inverse_cdf(p)
}

/// Outcome counts pooled over every tag of every trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub hits: u32,
    pub misses: u32,
    /// Lure and random false alarms combined.
    pub false_alarms: u32,
    /// Non-target opportunities where the player correctly held back.
    pub non_targets: u32,
    /// Trials that were present in the scoresheet.
    pub trials: u32,
}

impl SignalCounts {
    /// Tally a whole scoresheet. Missing trials and unknown statuses are skipped.
    pub fn from_scoresheet(sheet: &[Option<TrialRecord>]) -> Self {
        let mut counts = Self::default();
        for trial in sheet.iter().flatten() {
            counts.trials += 1;
            for (_, outcome) in trial.iter() {
                counts.record(outcome);
            }
        }
        counts
    }

    /// Tally only the outcomes of `tags`. Trials still count when present,
    /// even if none of their entries are scored.
    pub fn from_scored_tags(sheet: &[Option<TrialRecord>], tags: &BTreeSet<String>) -> Self {
        let mut counts = Self::default();
        for trial in sheet.iter().flatten() {
            counts.trials += 1;
            for (_, outcome) in trial.iter().filter(|(tag, _)| tags.contains(*tag)) {
                counts.record(outcome);
            }
        }
        counts
    }

    /// Add a single outcome to the tally.
    pub fn record(&mut self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::Hit => self.hits += 1,
            TrialOutcome::Miss => self.misses += 1,
            TrialOutcome::LureFa | TrialOutcome::RandomFa => self.false_alarms += 1,
            TrialOutcome::NonTarget => self.non_targets += 1,
            TrialOutcome::Unknown => {}
        }
    }

    /// Number of target presentations (hits plus misses).
    pub fn targets(&self) -> u32 {
        self.hits + self.misses
    }

    /// Replace the explicit non-target count with one derived from the trial
    /// count: every present trial offers `tags_per_trial` opportunities, and
    /// whatever was not a target is treated as a non-target opportunity.
    pub fn with_derived_non_targets(self, tags_per_trial: usize) -> Self {
        let tags = u32::try_from(tags_per_trial).unwrap_or(u32::MAX);
        let opportunities = self.trials.saturating_mul(tags);
        Self {
            non_targets: opportunities.saturating_sub(self.targets()),
            ..self
        }
    }

    /// Corrected d′ for these counts.
    pub fn d_prime(&self) -> f64 {
        d_prime(self.hits, self.misses, self.false_alarms, self.non_targets)
    }

    /// Uncorrected hit rate, `None` when there were no targets.
    pub fn hit_rate(&self) -> Option<f64> {
        let targets = self.targets();
        (targets > 0).then(|| f64::from(self.hits) / f64::from(targets))
    }

    /// Uncorrected false-alarm rate, `None` when there were no non-targets.
    pub fn false_alarm_rate(&self) -> Option<f64> {
        (self.non_targets > 0).then(|| f64::from(self.false_alarms) / f64::from(self.non_targets))
    }
}

/// Distinct tags that appear anywhere in the scoresheet.
pub fn observed_tags(sheet: &[Option<TrialRecord>]) -> BTreeSet<&str> {
    sheet
        .iter()
        .flatten()
        .flat_map(|trial| trial.iter().map(|(tag, _)| tag))
        .collect()
}

/// Hit/miss tally for one stimulus tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagScore {
    pub hits: u32,
    pub misses: u32,
}

/// Per-tag hit/miss tallies for the tags a game mode scores.
///
/// Any answered outcome other than a hit or a correct non-target counts as a
/// miss for that tag, so false alarms and unknown statuses count against it.
pub fn tag_scores<'a>(
    sheet: &[Option<TrialRecord>],
    tags: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, TagScore> {
    let mut scores: BTreeMap<String, TagScore> = tags
        .into_iter()
        .map(|tag| (tag.to_string(), TagScore::default()))
        .collect();

    for trial in sheet.iter().flatten() {
        for (tag, score) in scores.iter_mut() {
            match trial.outcome(tag) {
                Some(TrialOutcome::Hit) => score.hits += 1,
                Some(TrialOutcome::NonTarget) | None => {}
                Some(_) => score.misses += 1,
            }
        }
    }

    scores
}

/// Result of a tally-mode session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyScore {
    pub hits: u32,
    pub misses: u32,
    pub possible: u32,
}

/// Score a tally-mode session.
///
/// A hit is a successful answer with a positive count. A trial is possible
/// when it had something to count or was explicitly judged a failure.
pub fn tally_score(entries: &[TallyEntry]) -> TallyScore {
    let hits = entries
        .iter()
        .filter(|e| e.success == Some(true) && e.count > 0)
        .count();
    let possible = entries
        .iter()
        .filter(|e| e.count > 0 || e.success == Some(false))
        .count();

    TallyScore {
        hits: u32::try_from(hits).unwrap_or(u32::MAX),
        misses: 0,
        possible: u32::try_from(possible).unwrap_or(u32::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trials::Scoresheet;

    fn trial(pairs: &[(&str, TrialOutcome)]) -> Option<TrialRecord> {
        Some(
            pairs
                .iter()
                .fold(TrialRecord::new(), |t, (tag, o)| t.with(*tag, *o)),
        )
    }

    #[test]
    fn test_all_zero_counts_give_zero() {
        let dp = d_prime(0, 0, 0, 0);
        assert!(dp.is_finite());
        assert!(dp.abs() < 1e-9);
    }

    #[test]
    fn test_saturated_counts_stay_finite() {
        assert!(d_prime(1000, 0, 0, 1000).is_finite());
        assert!(d_prime(0, 1000, 1000, 0).is_finite());
        assert!(d_prime(u32::MAX, 0, 0, u32::MAX).is_finite());
    }

    #[test]
    fn test_false_alarms_beyond_non_targets() {
        // Pure guessing with no correct rejections: rates match, d' is zero.
        let dp = d_prime(10, 0, 10, 0);
        assert!(dp.is_finite());
        assert!(dp.abs() < 1e-9);
        assert!(d_prime(5, 5, 12, 3) < d_prime(5, 5, 3, 3));
    }

    #[test]
    fn test_perfect_session_scores_high() {
        // 10 hits, 30 correct rejections.
        let dp = d_prime(10, 0, 0, 30);
        assert!((dp - 3.83).abs() < 0.02, "d' was {dp}");
    }

    #[test]
    fn test_monotonic_in_hits_and_false_alarms() {
        let mut last = f64::NEG_INFINITY;
        for hits in 0..20 {
            let dp = d_prime(hits, 5, 3, 30);
            assert!(dp >= last);
            last = dp;
        }

        let mut last = f64::INFINITY;
        for fas in 0..20 {
            let dp = d_prime(8, 2, fas, 30);
            assert!(dp <= last);
            last = dp;
        }
    }

    #[test]
    fn test_counts_from_scoresheet() {
        let sheet: Scoresheet = vec![
            trial(&[("position", TrialOutcome::Hit), ("audio", TrialOutcome::NonTarget)]),
            None,
            trial(&[("position", TrialOutcome::LureFa), ("audio", TrialOutcome::Miss)]),
            trial(&[("position", TrialOutcome::RandomFa), ("audio", TrialOutcome::Unknown)]),
        ];

        let counts = SignalCounts::from_scoresheet(&sheet);
        assert_eq!(counts.hits, 1);
        assert_eq!(counts.misses, 1);
        assert_eq!(counts.false_alarms, 2);
        assert_eq!(counts.non_targets, 1);
        assert_eq!(counts.trials, 3);
    }

    #[test]
    fn test_empty_scoresheet() {
        let counts = SignalCounts::from_scoresheet(&[]);
        assert_eq!(counts, SignalCounts::default());
        assert!(counts.d_prime().abs() < 1e-9);
        assert!(counts.hit_rate().is_none());
        assert!(counts.false_alarm_rate().is_none());
    }

    #[test]
    fn test_derived_non_targets() {
        let sheet: Scoresheet = vec![
            trial(&[("position", TrialOutcome::Hit), ("audio", TrialOutcome::NonTarget)]),
            trial(&[("position", TrialOutcome::NonTarget), ("audio", TrialOutcome::Miss)]),
            trial(&[("position", TrialOutcome::RandomFa)]),
        ];

        let counts = SignalCounts::from_scoresheet(&sheet);
        assert_eq!(counts.non_targets, 2);

        let derived = counts.with_derived_non_targets(2);
        // 3 trials x 2 tags - 2 targets
        assert_eq!(derived.non_targets, 4);
        assert_eq!(derived.hits, counts.hits);

        assert_eq!(SignalCounts::default().with_derived_non_targets(3).non_targets, 0);
    }

    #[test]
    fn test_observed_tags() {
        let sheet: Scoresheet = vec![
            trial(&[("position", TrialOutcome::Hit)]),
            trial(&[("audio", TrialOutcome::Miss), ("position", TrialOutcome::Miss)]),
        ];
        let tags = observed_tags(&sheet);
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("audio"));
    }

    #[test]
    fn test_tag_scores() {
        let sheet: Scoresheet = vec![
            trial(&[("position", TrialOutcome::Hit), ("audio", TrialOutcome::NonTarget)]),
            trial(&[("position", TrialOutcome::Miss), ("audio", TrialOutcome::LureFa)]),
            None,
            trial(&[("position", TrialOutcome::Hit), ("color", TrialOutcome::Miss)]),
        ];

        let scores = tag_scores(&sheet, ["position", "audio"]);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["position"], TagScore { hits: 2, misses: 1 });
        assert_eq!(scores["audio"], TagScore { hits: 0, misses: 1 });
        assert!(!scores.contains_key("color"));
    }

    #[test]
    fn test_tag_scores_count_unknown_as_miss() {
        let sheet: Scoresheet = vec![
            trial(&[("audio", TrialOutcome::Unknown)]),
            trial(&[("audio", TrialOutcome::Hit)]),
        ];

        let scores = tag_scores(&sheet, ["audio"]);
        assert_eq!(scores["audio"], TagScore { hits: 1, misses: 1 });
    }

    #[test]
    fn test_counts_from_scored_tags() {
        let sheet: Scoresheet = vec![
            trial(&[("position", TrialOutcome::NonTarget), ("color", TrialOutcome::Hit)]),
            trial(&[("position", TrialOutcome::Hit), ("color", TrialOutcome::LureFa)]),
            trial(&[("color", TrialOutcome::Miss)]),
            None,
        ];
        let tags: BTreeSet<String> = ["position".to_string()].into_iter().collect();

        let counts = SignalCounts::from_scored_tags(&sheet, &tags);
        assert_eq!(counts.hits, 1);
        assert_eq!(counts.misses, 0);
        assert_eq!(counts.false_alarms, 0);
        assert_eq!(counts.non_targets, 1);
        assert_eq!(counts.trials, 3);
    }

    #[test]
    fn test_tally_score() {
        let entries = [
            TallyEntry::new(Some(true), 3),
            TallyEntry::new(Some(true), 0),
            TallyEntry::new(Some(false), 0),
            TallyEntry::new(None, 2),
            TallyEntry::new(None, 0),
        ];

        let score = tally_score(&entries);
        assert_eq!(score.hits, 1);
        assert_eq!(score.possible, 3);
    }
}
