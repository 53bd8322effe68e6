use std::path::Path;
use std::sync::Arc;

use quiz_core::model::{Question, QuestionRecord};

use crate::error::BankError;

/// Read-only snapshot of every question available to the quiz.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Arc<[Question]>,
}

impl QuestionBank {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: questions.into(),
        }
    }

    /// Parse a JSON array of question records.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Json` for malformed JSON and
    /// `BankError::InvalidQuestion` for the first record that fails validation.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let records: Vec<QuestionRecord> = serde_json::from_str(json)?;
        let questions = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                Question::try_from(record).map_err(|source| BankError::InvalidQuestion { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("loaded {} questions", questions.len());
        Ok(Self::new(questions))
    }

    /// Load a JSON question bank from disk.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if the file cannot be read or decoded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
