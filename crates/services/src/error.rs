//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::QuestionError;
use quiz_core::quiz::QuizError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while loading a question bank.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode question bank: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

/// Errors emitted by quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
