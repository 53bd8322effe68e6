use std::fmt;
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{QuizHandoff, QuizRules, ResultSummary, SessionQuestion};
use quiz_core::quiz::{
    AdvanceResult, NoopObserver, QuizError, QuizObserver, QuizSession, Resolution,
    ResolutionCause, TickResult,
};
use quiz_core::timer::{Scheduler, TimerRole, TimerSlots, TimerToken};
use storage::repository::LeaderboardRepository;

/// Observable effect of feeding one event to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStep {
    /// Stale or out-of-phase event; nothing changed.
    Ignored,
    Ticked { time_left: u32 },
    Resolved(Resolution),
    Advanced { index: usize },
    Ended(ResultSummary),
    Completed(QuizHandoff),
}

/// Drives a `QuizSession` with a `Scheduler` and persists the result.
///
/// Events are handled one at a time; the engine keeps at most one live timer
/// per role and re-checks every delivered token against the current epoch.
pub struct QuizEngine<S: Scheduler> {
    session: QuizSession,
    scheduler: S,
    timers: TimerSlots,
    results: Arc<dyn LeaderboardRepository>,
    observer: Box<dyn QuizObserver>,
    clock: Clock,
    summary: Option<ResultSummary>,
    completed: bool,
}

impl<S: Scheduler> QuizEngine<S> {
    #[must_use]
    pub fn new(
        rules: QuizRules,
        clock: Clock,
        scheduler: S,
        results: Arc<dyn LeaderboardRepository>,
    ) -> Self {
        Self {
            session: QuizSession::new(rules, clock.now()),
            scheduler,
            timers: TimerSlots::new(),
            results,
            observer: Box::new(NoopObserver),
            clock,
            summary: None,
            completed: false,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn QuizObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Load the drawn questions and start the first countdown.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the draw is empty or the engine already started.
    pub fn start(&mut self, questions: Vec<SessionQuestion>) -> Result<(), QuizError> {
        self.session.load(questions)?;
        log::info!(
            "quiz started with {} questions",
            self.session.total_questions()
        );
        self.observer.on_start(self.session.total_questions());
        self.show_current_question();
        Ok(())
    }

    /// Player picked `option` for the current question.
    pub async fn answer(&mut self, option: &str) -> EngineStep {
        match self.session.answer(option) {
            Some(resolution) => self.after_resolution(resolution).await,
            None => {
                log::trace!("answer ignored in phase {:?}", self.session.phase());
                EngineStep::Ignored
            }
        }
    }

    /// Player picked the option at `index` in session order.
    pub async fn answer_index(&mut self, index: usize) -> EngineStep {
        let Some(option) = self
            .session
            .current_question()
            .and_then(|q| q.option(index))
            .map(str::to_owned)
        else {
            return EngineStep::Ignored;
        };
        self.answer(&option).await
    }

    /// A scheduled token came due.
    pub async fn on_timer(&mut self, token: TimerToken) -> EngineStep {
        if token.epoch() != self.session.epoch() || !self.timers.take_fired(token) {
            log::trace!("stale timer {token:?} ignored");
            return EngineStep::Ignored;
        }

        match token.role() {
            TimerRole::Tick => match self.session.tick() {
                TickResult::Counted { time_left } => {
                    self.arm(TimerRole::Tick);
                    self.observer.on_tick(time_left);
                    EngineStep::Ticked { time_left }
                }
                TickResult::TimedOut(resolution) => self.after_resolution(resolution).await,
                TickResult::Ignored => EngineStep::Ignored,
            },
            TimerRole::Advance => match self.session.advance() {
                AdvanceResult::Advanced { index } => {
                    self.show_current_question();
                    EngineStep::Advanced { index }
                }
                AdvanceResult::MustEnd => self.end().await,
                AdvanceResult::Ignored => EngineStep::Ignored,
            },
            TimerRole::Finish => match self.summary.as_ref() {
                Some(summary) if !self.completed => {
                    self.completed = true;
                    EngineStep::Completed(summary.handoff())
                }
                _ => EngineStep::Ignored,
            },
        }
    }

    /// Leave mid-session. Nothing is persisted.
    pub fn abandon(&mut self) {
        self.timers.disarm_all(&mut self.scheduler);
        if self.session.abandon() {
            log::info!(
                "quiz abandoned at question {} with score {}",
                self.session.current_index() + 1,
                self.session.score()
            );
        }
    }

    async fn after_resolution(&mut self, resolution: Resolution) -> EngineStep {
        self.timers.disarm(&mut self.scheduler, TimerRole::Tick);
        log::debug!(
            "question {} resolved: {:?} via {:?}, +{} points, {} lives left",
            resolution.index + 1,
            resolution.outcome,
            resolution.cause,
            resolution.points,
            resolution.lives
        );

        if resolution.is_correct() {
            self.observer.on_correct(&resolution);
        } else {
            let correct = self
                .session
                .current_question()
                .map(|q| q.correct_answer().to_owned())
                .unwrap_or_default();
            match resolution.cause {
                ResolutionCause::Answered => self.observer.on_incorrect(&resolution, &correct),
                ResolutionCause::TimedOut => self.observer.on_timeout(&resolution, &correct),
            }
        }

        // Out of lives ends right away; the last question ends after the usual pause.
        if resolution.out_of_lives() {
            self.end().await;
        } else {
            self.arm(TimerRole::Advance);
        }
        EngineStep::Resolved(resolution)
    }

    async fn end(&mut self) -> EngineStep {
        let Some(summary) = self.session.end(self.clock.now()) else {
            return EngineStep::Ignored;
        };
        self.timers.disarm_all(&mut self.scheduler);

        log::info!(
            "quiz ended: score {}, {}s, {} questions",
            summary.score(),
            summary.time_spent_secs(),
            summary.questions_answered()
        );
        if let Err(err) = self.results.append_result(&summary).await {
            log::warn!("failed to persist quiz result: {err}");
        }

        self.observer.on_end(&summary);
        self.summary = Some(summary.clone());
        self.arm(TimerRole::Finish);
        EngineStep::Ended(summary)
    }

    fn show_current_question(&mut self) {
        if let Some(question) = self.session.current_question() {
            self.observer.on_question(
                self.session.current_index(),
                question,
                self.session.time_left(),
            );
        }
        self.arm(TimerRole::Tick);
    }

    fn arm(&mut self, role: TimerRole) {
        let rules = self.session.rules();
        let delay = match role {
            TimerRole::Tick => QuizRules::TICK_INTERVAL,
            TimerRole::Advance => rules.advance_delay(),
            TimerRole::Finish => rules.finish_delay(),
        };
        let token = TimerToken::new(role, self.session.epoch());
        self.timers.arm(&mut self.scheduler, delay, token);
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Source of the start and end timestamps; a fixed clock can be advanced here.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn timers(&self) -> &TimerSlots {
        &self.timers
    }

    /// Result of the session once it has ended.
    #[must_use]
    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl<S: Scheduler> Drop for QuizEngine<S> {
    fn drop(&mut self) {
        self.timers.disarm_all(&mut self.scheduler);
    }
}

impl<S: Scheduler> fmt::Debug for QuizEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizEngine")
            .field("session", &self.session)
            .field("timers", &self.timers)
            .field("summary", &self.summary)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}
