use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::QuizRules;
use quiz_core::quiz::{QuizError, QuizObserver};
use quiz_core::timer::Scheduler;
use storage::repository::LeaderboardRepository;
use tokio::sync::mpsc;

use super::engine::QuizEngine;
use super::plan::{QuizPlan, QuizPlanner};
use super::runtime::{PlayerInput, QuizRunner, RunOutcome};
use crate::bank::QuestionBank;
use crate::error::QuizServiceError;

/// Starts quiz sessions over a question bank and a leaderboard store.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    rules: QuizRules,
    bank: QuestionBank,
    results: Arc<dyn LeaderboardRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, bank: QuestionBank, results: Arc<dyn LeaderboardRepository>) -> Self {
        Self {
            clock,
            rules: QuizRules::default(),
            bank,
            results,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: QuizRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn rules(&self) -> &QuizRules {
        &self.rules
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Draw the questions for a new session.
    #[must_use]
    pub fn plan(&self) -> QuizPlan {
        QuizPlanner::new(self.bank.questions(), self.rules.question_count()).draw()
    }

    /// Start an engine driven by `scheduler`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if the bank is empty.
    pub fn start_engine<S: Scheduler>(
        &self,
        scheduler: S,
    ) -> Result<QuizEngine<S>, QuizServiceError> {
        let mut engine = QuizEngine::new(
            self.rules.clone(),
            self.clock,
            scheduler,
            Arc::clone(&self.results),
        );
        engine.start(self.plan().questions)?;
        Ok(engine)
    }

    /// Play one real-time session fed by `inputs`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if the bank is empty.
    pub async fn play(
        &self,
        inputs: mpsc::Receiver<PlayerInput>,
        observer: Box<dyn QuizObserver>,
    ) -> Result<RunOutcome, QuizServiceError> {
        let plan = self.plan();
        if plan.questions.is_empty() {
            return Err(QuizError::NoQuestions.into());
        }
        let runner = QuizRunner::new(self.rules.clone(), self.clock, Arc::clone(&self.results))
            .with_observer(observer);
        Ok(runner.run(plan.questions, inputs).await?)
    }
}
