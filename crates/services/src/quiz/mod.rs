mod engine;
mod plan;
mod runtime;
mod service;

// Public API of the quiz subsystem.
pub use crate::error::QuizServiceError;
pub use engine::{EngineStep, QuizEngine};
pub use plan::{QuizPlan, QuizPlanner};
pub use runtime::{PlayerInput, QuizRunner, RunOutcome, TokioScheduler};
pub use service::QuizService;
