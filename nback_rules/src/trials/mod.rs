//! Trial records: what the player answered for each stimulus tag on each trial.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one stimulus tag on one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialOutcome {
    /// Target present, player responded.
    Hit,
    /// Target present, player stayed silent.
    Miss,
    /// Responded to a lure (an n±1 repeat).
    LureFa,
    /// Responded to an unrelated stimulus.
    RandomFa,
    /// No target, player correctly stayed silent.
    NonTarget,
    /// Any status this version does not know about. Ignored by scoring.
    #[serde(other)]
    Unknown,
}

impl TrialOutcome {
    /// Whether this outcome is a false alarm of either kind.
    pub fn is_false_alarm(&self) -> bool {
        matches!(self, TrialOutcome::LureFa | TrialOutcome::RandomFa)
    }

    /// Whether a target was present on this trial.
    pub fn is_target(&self) -> bool {
        matches!(self, TrialOutcome::Hit | TrialOutcome::Miss)
    }
}

/// One trial: stimulus tag ("position", "audio", "color", ...) to outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialRecord(pub BTreeMap<String, TrialOutcome>);

impl TrialRecord {
    /// Create an empty trial record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outcome for a tag.
    pub fn with(mut self, tag: impl Into<String>, outcome: TrialOutcome) -> Self {
        self.0.insert(tag.into(), outcome);
        self
    }

    /// Outcome for a tag, if the trial scored it.
    pub fn outcome(&self, tag: &str) -> Option<TrialOutcome> {
        self.0.get(tag).copied()
    }

    /// Iterate over every tag/outcome pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TrialOutcome)> {
        self.0.iter().map(|(tag, outcome)| (tag.as_str(), *outcome))
    }
}

impl FromIterator<(String, TrialOutcome)> for TrialRecord {
    fn from_iter<I: IntoIterator<Item = (String, TrialOutcome)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A session's trials in chronological order. Missing trials are `None`.
pub type Scoresheet = Vec<Option<TrialRecord>>;

/// An answer in tally mode, where the player counts occurrences instead of
/// flagging matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    /// `None` when the trial was never judged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default)]
    pub count: u32,
}

impl TallyEntry {
    pub fn new(success: Option<bool>, count: u32) -> Self {
        Self { success, count }
    }
}
