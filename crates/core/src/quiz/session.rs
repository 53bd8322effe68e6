use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{QuizRules, ResultSummary, SessionQuestion};
use crate::scoring;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions available for session")]
    NoQuestions,

    #[error("session already started")]
    AlreadyStarted,
}

//
// ─── STATE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// Waiting for the drawn questions.
    Loading,
    /// Countdown running, current question unresolved.
    AwaitingAnswer,
    /// Current question resolved; waiting to advance or end.
    Resolved,
    /// Terminal.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unresolved,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionCause {
    Answered,
    TimedOut,
}

/// What must follow a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Advance,
    End,
}

/// Result of resolving the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub index: usize,
    pub cause: ResolutionCause,
    pub outcome: Outcome,
    pub points: u32,
    pub score: u32,
    pub lives: u32,
    pub next: NextStep,
}

impl Resolution {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.outcome == Outcome::Correct
    }

    #[must_use]
    pub fn out_of_lives(&self) -> bool {
        self.lives == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickResult {
    /// No countdown is running.
    Ignored,
    Counted { time_left: u32 },
    TimedOut(Resolution),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceResult {
    /// Nothing was resolved, or the session is over.
    Ignored,
    Advanced { index: usize },
    /// Lives are exhausted or the last question was resolved.
    MustEnd,
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// Single-player quiz session.
///
/// Every transition checks the current phase first, so an event that arrives
/// after the state has moved on (late click, stale tick, second end trigger)
/// changes nothing and reports itself as ignored.
pub struct QuizSession {
    rules: QuizRules,
    questions: Vec<SessionQuestion>,
    phase: QuizPhase,
    current: usize,
    score: u32,
    lives: u32,
    selected: Option<String>,
    outcome: Outcome,
    time_left: u32,
    ended: bool,
    epoch: u64,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    /// Create a session in `Loading`.
    ///
    /// `started_at` should come from the services layer clock.
    #[must_use]
    pub fn new(rules: QuizRules, started_at: DateTime<Utc>) -> Self {
        let time_left = rules.time_limit_secs();
        let lives = rules.starting_lives();
        Self {
            rules,
            questions: Vec::new(),
            phase: QuizPhase::Loading,
            current: 0,
            score: 0,
            lives,
            selected: None,
            outcome: Outcome::Unresolved,
            time_left,
            ended: false,
            epoch: 0,
            started_at,
        }
    }

    /// Hand the drawn questions to the session and show the first one.
    ///
    /// Questions beyond the configured count are dropped.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyStarted` outside `Loading`, and
    /// `QuizError::NoQuestions` for an empty draw.
    pub fn load(&mut self, mut questions: Vec<SessionQuestion>) -> Result<(), QuizError> {
        if self.phase != QuizPhase::Loading {
            return Err(QuizError::AlreadyStarted);
        }
        questions.truncate(self.rules.question_count());
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        self.questions = questions;
        self.current = 0;
        self.time_left = self.rules.time_limit_secs();
        self.phase = QuizPhase::AwaitingAnswer;
        self.epoch += 1;
        Ok(())
    }

    /// Resolve the current question with the player's choice.
    ///
    /// Returns `None` unless a question is awaiting an answer.
    pub fn answer(&mut self, option: &str) -> Option<Resolution> {
        if self.phase != QuizPhase::AwaitingAnswer {
            return None;
        }
        let correct = self.current_question()?.is_correct(option);
        self.selected = Some(option.to_owned());
        Some(self.resolve(ResolutionCause::Answered, correct))
    }

    /// One countdown step. Reaching zero resolves the question as a timeout.
    pub fn tick(&mut self) -> TickResult {
        if self.phase != QuizPhase::AwaitingAnswer {
            return TickResult::Ignored;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return TickResult::Counted {
                time_left: self.time_left,
            };
        }
        TickResult::TimedOut(self.resolve(ResolutionCause::TimedOut, false))
    }

    fn resolve(&mut self, cause: ResolutionCause, correct: bool) -> Resolution {
        let points = if correct {
            scoring::points_within(self.time_left, self.rules.time_limit_secs())
        } else {
            0
        };

        if correct {
            self.outcome = Outcome::Correct;
            self.score = self.score.saturating_add(points);
        } else {
            self.outcome = Outcome::Incorrect;
            self.lives = self.lives.saturating_sub(1);
        }
        self.phase = QuizPhase::Resolved;

        Resolution {
            index: self.current,
            cause,
            outcome: self.outcome,
            points,
            score: self.score,
            lives: self.lives,
            next: self.next_step(),
        }
    }

    /// What follows the current resolution.
    #[must_use]
    pub fn next_step(&self) -> NextStep {
        if self.lives == 0 || self.current + 1 >= self.questions.len() {
            NextStep::End
        } else {
            NextStep::Advance
        }
    }

    /// Move to the next question after a resolution.
    pub fn advance(&mut self) -> AdvanceResult {
        if self.phase != QuizPhase::Resolved {
            return AdvanceResult::Ignored;
        }
        if self.next_step() == NextStep::End {
            return AdvanceResult::MustEnd;
        }

        self.current += 1;
        self.selected = None;
        self.outcome = Outcome::Unresolved;
        self.time_left = self.rules.time_limit_secs();
        self.phase = QuizPhase::AwaitingAnswer;
        self.epoch += 1;
        AdvanceResult::Advanced {
            index: self.current,
        }
    }

    /// Terminate the session and produce its result.
    ///
    /// Only the first call after a resolution that must end the session yields
    /// a summary; every other call returns `None`.
    pub fn end(&mut self, completed_at: DateTime<Utc>) -> Option<ResultSummary> {
        if self.ended || self.phase != QuizPhase::Resolved || self.next_step() != NextStep::End {
            return None;
        }

        self.ended = true;
        self.phase = QuizPhase::Ended;
        self.epoch += 1;

        let answered = u32::try_from(self.current + 1).unwrap_or(u32::MAX);
        Some(ResultSummary::new(
            self.score,
            answered,
            self.started_at,
            completed_at,
        ))
    }

    /// Leave the session without a result. Returns `false` if it had already ended.
    pub fn abandon(&mut self) -> bool {
        if self.ended {
            return false;
        }
        self.ended = true;
        self.phase = QuizPhase::Ended;
        self.epoch += 1;
        true
    }

    #[must_use]
    pub fn rules(&self) -> &QuizRules {
        &self.rules
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn questions(&self) -> &[SessionQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&SessionQuestion> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn lives(&self) -> u32 {
        self.lives
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    #[must_use]
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Bumped whenever a new question becomes active and when the session ends.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("phase", &self.phase)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("lives", &self.lives)
            .field("outcome", &self.outcome)
            .field("time_left", &self.time_left)
            .field("ended", &self.ended)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn build_question(id: usize) -> SessionQuestion {
        let options = (0..4).map(|o| format!("q{id}-o{o}")).collect();
        let question =
            Question::new("TEST", format!("Question {id}?"), options, format!("q{id}-o0")).unwrap();
        SessionQuestion::new(question)
    }

    fn started(n: usize) -> QuizSession {
        let mut session = QuizSession::new(QuizRules::default(), fixed_now());
        session
            .load((0..n).map(build_question).collect())
            .unwrap();
        session
    }

    fn answer_right(session: &mut QuizSession) -> Resolution {
        let option = session.current_question().unwrap().correct_answer().to_owned();
        session.answer(&option).unwrap()
    }

    fn answer_wrong(session: &mut QuizSession) -> Resolution {
        let option = session.current_question().unwrap().options()[1].clone();
        session.answer(&option).unwrap()
    }

    #[test]
    fn load_moves_to_awaiting_answer() {
        let session = started(10);
        assert_eq!(session.phase(), QuizPhase::AwaitingAnswer);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.time_left(), 30);
        assert_eq!(session.lives(), 3);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn load_rejects_empty_and_repeat() {
        let mut session = QuizSession::new(QuizRules::default(), fixed_now());
        assert_eq!(session.load(Vec::new()), Err(QuizError::NoQuestions));
        assert_eq!(session.phase(), QuizPhase::Loading);

        let mut session = started(2);
        assert_eq!(
            session.load(vec![build_question(9)]),
            Err(QuizError::AlreadyStarted)
        );
    }

    #[test]
    fn load_truncates_to_question_count() {
        let session = started(14);
        assert_eq!(session.total_questions(), 10);
    }

    #[test]
    fn correct_answer_scores_by_time_left() {
        let mut session = started(10);
        for _ in 0..10 {
            session.tick();
        }
        let res = answer_right(&mut session);
        assert_eq!(res.outcome, Outcome::Correct);
        assert_eq!(res.points, 25);
        assert_eq!(session.score(), 25);
        assert_eq!(session.lives(), 3);
        assert_eq!(res.next, NextStep::Advance);
        assert_eq!(session.phase(), QuizPhase::Resolved);
        assert_eq!(session.selected_answer(), Some("q0-o0"));
    }

    #[test]
    fn wrong_answer_costs_a_life() {
        let mut session = started(10);
        let res = answer_wrong(&mut session);
        assert_eq!(res.outcome, Outcome::Incorrect);
        assert_eq!(res.points, 0);
        assert_eq!(session.lives(), 2);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn late_click_is_ignored() {
        let mut session = started(10);
        answer_right(&mut session);
        let before = (session.score(), session.lives());
        assert_eq!(session.answer("q0-o1"), None);
        assert_eq!((session.score(), session.lives()), before);
        assert_eq!(session.selected_answer(), Some("q0-o0"));
    }

    #[test]
    fn answer_then_timeout_changes_state_once() {
        let mut session = started(10);
        answer_wrong(&mut session);
        for _ in 0..30 {
            assert_eq!(session.tick(), TickResult::Ignored);
        }
        assert_eq!(session.lives(), 2);
    }

    #[test]
    fn countdown_to_zero_times_out() {
        let mut session = started(10);
        for expected in (1..30).rev() {
            assert_eq!(
                session.tick(),
                TickResult::Counted {
                    time_left: expected
                }
            );
        }
        let TickResult::TimedOut(res) = session.tick() else {
            panic!("expected timeout");
        };
        assert_eq!(res.cause, ResolutionCause::TimedOut);
        assert_eq!(res.points, 0);
        assert_eq!(session.lives(), 2);
        assert_eq!(session.selected_answer(), None);
        assert_eq!(session.time_left(), 0);
        assert_eq!(session.tick(), TickResult::Ignored);
    }

    #[test]
    fn advance_resets_question_state() {
        let mut session = started(10);
        let epoch = session.epoch();
        assert_eq!(session.advance(), AdvanceResult::Ignored);

        answer_wrong(&mut session);
        assert_eq!(session.advance(), AdvanceResult::Advanced { index: 1 });
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.selected_answer(), None);
        assert_eq!(session.outcome(), Outcome::Unresolved);
        assert_eq!(session.time_left(), 30);
        assert!(session.epoch() > epoch);
        assert_eq!(session.advance(), AdvanceResult::Ignored);
    }

    #[test]
    fn perfect_run_scores_three_hundred() {
        let mut session = started(10);
        for i in 0..10 {
            let res = answer_right(&mut session);
            if i < 9 {
                assert_eq!(res.next, NextStep::Advance);
                session.advance();
            } else {
                assert_eq!(res.next, NextStep::End);
                assert_eq!(session.advance(), AdvanceResult::MustEnd);
            }
        }
        let summary = session
            .end(fixed_now() + Duration::seconds(42))
            .unwrap();
        assert_eq!(summary.score(), 300);
        assert_eq!(summary.questions_answered(), 10);
        assert_eq!(summary.time_spent_secs(), 42);
    }

    #[test]
    fn three_misses_end_the_session_early() {
        let mut session = started(10);
        answer_wrong(&mut session);
        session.advance();
        answer_wrong(&mut session);
        session.advance();
        let res = answer_wrong(&mut session);

        assert!(res.out_of_lives());
        assert_eq!(res.next, NextStep::End);
        assert_eq!(session.advance(), AdvanceResult::MustEnd);

        let summary = session.end(fixed_now()).unwrap();
        assert_eq!(summary.questions_answered(), 3);
        assert_eq!(summary.score(), 0);
    }

    #[test]
    fn end_happens_exactly_once() {
        let mut session = started(1);
        answer_wrong(&mut session);
        assert!(session.end(fixed_now()).is_some());
        assert!(session.end(fixed_now()).is_none());
        assert_eq!(session.phase(), QuizPhase::Ended);
        assert_eq!(session.advance(), AdvanceResult::Ignored);
        assert_eq!(session.answer("q0-o0"), None);
        assert!(!session.abandon());
    }

    #[test]
    fn end_is_refused_mid_session() {
        let mut session = started(10);
        assert!(session.end(fixed_now()).is_none());
        answer_right(&mut session);
        assert!(session.end(fixed_now()).is_none());
        assert!(!session.is_ended());
    }

    #[test]
    fn abandon_stops_everything() {
        let mut session = started(10);
        assert!(session.abandon());
        assert_eq!(session.tick(), TickResult::Ignored);
        assert_eq!(session.answer("q0-o0"), None);
        assert!(session.end(fixed_now()).is_none());
    }

    #[test]
    fn lives_and_score_are_monotonic() {
        let mut session = started(10);
        let mut lives = session.lives();
        let mut score = session.score();
        for i in 0..10 {
            if session.is_ended() {
                break;
            }
            if i % 3 == 0 {
                answer_wrong(&mut session);
            } else {
                answer_right(&mut session);
            }
            assert!(session.lives() <= lives);
            assert!(session.score() >= score);
            assert!(session.lives() <= 3);
            lives = session.lives();
            score = session.score();
            if session.advance() == AdvanceResult::MustEnd {
                session.end(fixed_now());
            }
        }
        assert!(session.is_ended());
    }
}
