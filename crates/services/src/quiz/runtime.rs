use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::{QuizHandoff, QuizRules, SessionQuestion};
use quiz_core::quiz::{NextStep, QuizError, QuizObserver, QuizPhase};
use quiz_core::timer::{Scheduler, TimerHandle, TimerToken};
use storage::repository::LeaderboardRepository;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::engine::{EngineStep, QuizEngine};

//
// ─── TOKIO SCHEDULER ──────────────────────────────────────────────────────────
//

/// Real-time scheduler: each timer is a task that sleeps, then sends its token.
///
/// Cancelling aborts the task. Dropping the scheduler aborts everything still
/// pending so no tick outlives its session.
#[derive(Debug)]
pub struct TokioScheduler {
    fired: mpsc::UnboundedSender<TimerToken>,
    next_id: u64,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Returns the scheduler and the receiver its tokens are delivered to.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerToken>) {
        let (fired, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            fired,
            next_id: 0,
            tasks: HashMap::new(),
        };
        (scheduler, rx)
    }

    /// Number of timers not yet fired or cancelled.
    #[must_use]
    pub fn live(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let handle = TimerHandle::new(self.next_id);
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone once the session is torn down.
            let _ = fired.send(token);
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

//
// ─── RUNNER ───────────────────────────────────────────────────────────────────
//

/// Input from the player while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput {
    /// Option text, matched exactly.
    Answer(String),
    /// Option position in session order, starting at 0.
    Choice(usize),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(QuizHandoff),
    /// The player left before the end; nothing was persisted.
    Abandoned,
}

/// Single-session event loop over player input and timer tokens.
pub struct QuizRunner {
    engine: QuizEngine<TokioScheduler>,
    timers: mpsc::UnboundedReceiver<TimerToken>,
}

impl QuizRunner {
    #[must_use]
    pub fn new(rules: QuizRules, clock: Clock, results: Arc<dyn LeaderboardRepository>) -> Self {
        let (scheduler, timers) = TokioScheduler::new();
        Self {
            engine: QuizEngine::new(rules, clock, scheduler, results),
            timers,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn QuizObserver>) -> Self {
        self.engine = self.engine.with_observer(observer);
        self
    }

    /// Play one session to completion or abandonment.
    ///
    /// Player input is ignored once the session has ended; the loop then only
    /// waits for the completion handoff. A closed input stream abandons the
    /// session unless every question has already been answered.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty draw.
    pub async fn run(
        mut self,
        questions: Vec<SessionQuestion>,
        mut inputs: mpsc::Receiver<PlayerInput>,
    ) -> Result<RunOutcome, QuizError> {
        self.engine.start(questions)?;
        let mut input_open = true;

        loop {
            let accepting = input_open && !self.engine.session().is_ended();
            tokio::select! {
                Some(token) = self.timers.recv() => {
                    if let EngineStep::Completed(handoff) = self.engine.on_timer(token).await {
                        return Ok(RunOutcome::Completed(handoff));
                    }
                }
                input = inputs.recv(), if accepting => match input {
                    Some(PlayerInput::Answer(option)) => {
                        self.engine.answer(&option).await;
                    }
                    Some(PlayerInput::Choice(index)) => {
                        self.engine.answer_index(index).await;
                    }
                    // Every question is answered; let the pending timers finish the session.
                    None if self.is_winding_down() => input_open = false,
                    Some(PlayerInput::Quit) | None => {
                        self.engine.abandon();
                        return Ok(RunOutcome::Abandoned);
                    }
                },
                else => {
                    self.engine.abandon();
                    return Ok(RunOutcome::Abandoned);
                }
            }
        }
    }

    /// The last question is resolved, or the session has already ended.
    fn is_winding_down(&self) -> bool {
        let session = self.engine.session();
        session.is_ended()
            || (session.phase() == QuizPhase::Resolved && session.next_step() == NextStep::End)
    }
}
