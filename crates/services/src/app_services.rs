use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::bank::QuestionBank;
use crate::error::QuizServiceError;
use crate::leaderboard::LeaderboardService;
use crate::quiz::QuizService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz: Arc<QuizService>,
    leaderboard: Arc<LeaderboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Sqlite` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        bank: QuestionBank,
    ) -> Result<Self, QuizServiceError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, bank))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, bank: QuestionBank) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, bank)
    }

    fn from_storage(storage: &Storage, clock: Clock, bank: QuestionBank) -> Self {
        let quiz = Arc::new(QuizService::new(
            clock,
            bank,
            Arc::clone(&storage.results),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(Arc::clone(&storage.results)));
        Self { quiz, leaderboard }
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }
}
