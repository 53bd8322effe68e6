use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RulesError {
    #[error("question count must be at least 1")]
    NoQuestions,

    #[error("time limit must be at least 1 second")]
    NoTime,

    #[error("starting lives must be at least 1")]
    NoLives,
}

/// Fixed parameters of a quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRules {
    question_count: usize,
    time_limit_secs: u32,
    starting_lives: u32,
    advance_delay: Duration,
    finish_delay: Duration,
}

impl QuizRules {
    pub const DEFAULT_QUESTION_COUNT: usize = 10;
    pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;
    pub const DEFAULT_STARTING_LIVES: u32 = 3;
    pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

    /// Build custom rules.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` if any count or the time limit is zero.
    pub fn new(
        question_count: usize,
        time_limit_secs: u32,
        starting_lives: u32,
        advance_delay: Duration,
        finish_delay: Duration,
    ) -> Result<Self, RulesError> {
        if question_count == 0 {
            return Err(RulesError::NoQuestions);
        }
        if time_limit_secs == 0 {
            return Err(RulesError::NoTime);
        }
        if starting_lives == 0 {
            return Err(RulesError::NoLives);
        }
        Ok(Self {
            question_count,
            time_limit_secs,
            starting_lives,
            advance_delay,
            finish_delay,
        })
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn starting_lives(&self) -> u32 {
        self.starting_lives
    }

    /// Pause between a resolution and the next question.
    #[must_use]
    pub fn advance_delay(&self) -> Duration {
        self.advance_delay
    }

    /// Pause between termination and the completion handoff.
    #[must_use]
    pub fn finish_delay(&self) -> Duration {
        self.finish_delay
    }
}

impl Default for QuizRules {
    fn default() -> Self {
        Self {
            question_count: Self::DEFAULT_QUESTION_COUNT,
            time_limit_secs: Self::DEFAULT_TIME_LIMIT_SECS,
            starting_lives: Self::DEFAULT_STARTING_LIVES,
            advance_delay: Duration::from_secs(2),
            finish_delay: Duration::from_secs(2),
        }
    }
}
