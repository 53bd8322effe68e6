use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::elapsed_secs;

/// Record of a finished session, as stored on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    score: u32,
    #[serde(rename = "date")]
    created_at: DateTime<Utc>,
    #[serde(rename = "timeSpent")]
    time_spent_secs: u64,
    questions_answered: u32,
}

impl ResultSummary {
    /// Summarize a session that started at `started_at` and ended at `completed_at`.
    ///
    /// Elapsed time is floored to whole seconds; a completion timestamp earlier
    /// than the start counts as zero seconds.
    #[must_use]
    pub fn new(
        score: u32,
        questions_answered: u32,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            score,
            created_at: completed_at,
            time_spent_secs: elapsed_secs(started_at, completed_at),
            questions_answered,
        }
    }

    /// Rehydrate a summary from persisted storage.
    #[must_use]
    pub fn from_persisted(
        score: u32,
        created_at: DateTime<Utc>,
        time_spent_secs: u64,
        questions_answered: u32,
    ) -> Self {
        Self {
            score,
            created_at,
            time_spent_secs,
            questions_answered,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    #[must_use]
    pub fn handoff(&self) -> QuizHandoff {
        QuizHandoff {
            score: self.score,
            time_spent_secs: self.time_spent_secs,
            questions_answered: self.questions_answered,
        }
    }
}

/// Values carried to the results view once a session completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizHandoff {
    pub score: u32,
    pub time_spent_secs: u64,
    pub questions_answered: u32,
}
