use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("expected {expected} options, got {got}")]
    OptionCount { expected: usize, got: usize },

    #[error("duplicate option: {0}")]
    DuplicateOption(String),

    #[error("correct answer is not one of the options: {0}")]
    CorrectAnswerMissing(String),
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// Wire shape of a question as it appears in a question bank file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub category: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Immutable multiple-choice question supplied by a question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    category: String,
    prompt: String,
    options: Vec<String>,
    correct_answer: String,
    image_url: Option<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, the option count is not
    /// `OPTION_COUNT`, options repeat, or `correct_answer` is not an option.
    pub fn new(
        category: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        let correct_answer = correct_answer.into();

        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() != OPTION_COUNT {
            return Err(QuestionError::OptionCount {
                expected: OPTION_COUNT,
                got: options.len(),
            });
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption(option.clone()));
            }
        }
        if !seen.contains(correct_answer.as_str()) {
            return Err(QuestionError::CorrectAnswerMissing(correct_answer));
        }

        Ok(Self {
            category: category.into(),
            prompt,
            options,
            correct_answer,
            image_url: None,
        })
    }

    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Options in bank order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Exact string comparison against the correct option.
    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let question = Self::new(
            record.category,
            record.question,
            record.options,
            record.correct_answer,
        )?;
        Ok(match record.image_url {
            Some(url) => question.with_image_url(url),
            None => question,
        })
    }
}

impl From<Question> for QuestionRecord {
    fn from(question: Question) -> Self {
        Self {
            category: question.category,
            question: question.prompt,
            options: question.options,
            correct_answer: question.correct_answer,
            image_url: question.image_url,
        }
    }
}

//
// ─── SESSION QUESTION ─────────────────────────────────────────────────────────
//

/// A bank question plus the option order used for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionQuestion {
    question: Question,
    options: Vec<String>,
}

impl SessionQuestion {
    /// Keep the bank's option order.
    #[must_use]
    pub fn new(question: Question) -> Self {
        let options = question.options().to_vec();
        Self { question, options }
    }

    /// Reorder the session copy of the options with `arrange`.
    ///
    /// `arrange` receives the options in bank order and is expected to permute
    /// them (typically a shuffle).
    #[must_use]
    pub fn arranged(question: Question, arrange: impl FnOnce(&mut [String])) -> Self {
        let mut session = Self::new(question);
        arrange(&mut session.options);
        session
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Options in session order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn category(&self) -> &str {
        self.question.category()
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        self.question.prompt()
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        self.question.correct_answer()
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.question.image_url()
    }

    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.question.is_correct(option)
    }
}
