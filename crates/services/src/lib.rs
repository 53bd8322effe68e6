#![forbid(unsafe_code)]

pub mod app_services;
pub mod bank;
pub mod error;
pub mod leaderboard;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use bank::QuestionBank;
pub use error::{BankError, QuizServiceError};
pub use leaderboard::{LeaderboardEntry, LeaderboardService};
pub use quiz::{
    EngineStep, PlayerInput, QuizEngine, QuizPlan, QuizPlanner, QuizRunner, QuizService,
    RunOutcome, TokioScheduler,
};
