use async_trait::async_trait;
use quiz_core::model::ResultSummary;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Append-only store of finished session results.
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// Append a result and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &ResultSummary) -> Result<i64, StorageError>;

    /// All stored results in insertion order. Callers sort for display.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_results(&self) -> Result<Vec<ResultSummary>, StorageError>;

    /// Remove every stored result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be cleared.
    async fn clear_results(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<ResultSummary>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaderboardRepository for InMemoryRepository {
    async fn append_result(&self, result: &ResultSummary) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(result.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Serialization("id overflow".into()))
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn clear_results(&self) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clear();
        Ok(())
    }
}

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn LeaderboardRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let results: Arc<dyn LeaderboardRepository> = Arc::new(InMemoryRepository::new());
        Self { results }
    }
}
