mod observer;
mod session;

pub use observer::{NoopObserver, QuizObserver};
pub use session::{
    AdvanceResult, NextStep, Outcome, QuizError, QuizPhase, QuizSession, Resolution,
    ResolutionCause, TickResult,
};
