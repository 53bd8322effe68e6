use crate::model::{ResultSummary, SessionQuestion};

use super::session::Resolution;

/// Cosmetic notifications (sounds, animations, terminal output).
///
/// Every method defaults to a no-op; session behaviour never depends on an
/// observer being present.
pub trait QuizObserver: Send {
    fn on_start(&mut self, _total_questions: usize) {}

    fn on_question(&mut self, _index: usize, _question: &SessionQuestion, _time_left: u32) {}

    fn on_tick(&mut self, _time_left: u32) {}

    fn on_correct(&mut self, _resolution: &Resolution) {}

    fn on_incorrect(&mut self, _resolution: &Resolution, _correct_answer: &str) {}

    fn on_timeout(&mut self, _resolution: &Resolution, _correct_answer: &str) {}

    fn on_end(&mut self, _summary: &ResultSummary) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl QuizObserver for NoopObserver {}
