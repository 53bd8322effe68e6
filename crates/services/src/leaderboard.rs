use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use quiz_core::model::{Rank, ResultSummary};
use storage::repository::{InMemoryRepository, LeaderboardRepository};

use crate::error::QuizServiceError;

/// Presentation-agnostic leaderboard row.
///
/// Formatting of dates and durations is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub position: usize,
    pub score: u32,
    pub date: DateTime<Utc>,
    pub time_spent_secs: u64,
    pub questions_answered: u32,
    pub rank: Rank,
}

impl LeaderboardEntry {
    #[must_use]
    pub fn from_summary(position: usize, summary: &ResultSummary) -> Self {
        Self {
            position,
            score: summary.score(),
            date: summary.created_at(),
            time_spent_secs: summary.time_spent_secs(),
            questions_answered: summary.questions_answered(),
            rank: Rank::from_score(summary.score()),
        }
    }
}

/// Read side of the leaderboard store.
#[derive(Clone)]
pub struct LeaderboardService {
    results: Arc<dyn LeaderboardRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(results: Arc<dyn LeaderboardRepository>) -> Self {
        Self { results }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Best results first: highest score, then earliest date.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on repository failures.
    pub async fn ranked(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, QuizServiceError> {
        let mut results = self.results.list_results().await?;
        results.sort_by(|a, b| {
            b.score()
                .cmp(&a.score())
                .then_with(|| a.created_at().cmp(&b.created_at()))
        });

        Ok(results
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, summary)| LeaderboardEntry::from_summary(i + 1, summary))
            .collect())
    }

    /// Every stored result, unsorted.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on repository failures.
    pub async fn all(&self) -> Result<Vec<ResultSummary>, QuizServiceError> {
        Ok(self.results.list_results().await?)
    }

    /// Erase the leaderboard.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on repository failures.
    pub async fn clear(&self) -> Result<(), QuizServiceError> {
        self.results.clear_results().await?;
        log::info!("leaderboard cleared");
        Ok(())
    }
}
