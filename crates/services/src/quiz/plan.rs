use rand::Rng;
use rand::rng;
use rand::seq::SliceRandom;

use quiz_core::model::{Question, SessionQuestion};

/// Questions drawn for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPlan {
    pub questions: Vec<SessionQuestion>,
    pub requested: usize,
}

impl QuizPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// True when the bank held fewer questions than requested.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.questions.len() < self.requested
    }
}

/// Draws a session's questions from a bank.
///
/// Questions are drawn without replacement in random order and every drawn
/// question gets its own shuffled option order.
pub struct QuizPlanner<'a> {
    bank: &'a [Question],
    count: usize,
}

impl<'a> QuizPlanner<'a> {
    #[must_use]
    pub fn new(bank: &'a [Question], count: usize) -> Self {
        Self { bank, count }
    }

    /// Draw using the thread-local generator.
    #[must_use]
    pub fn draw(&self) -> QuizPlan {
        self.draw_with(&mut rng())
    }

    /// Draw `min(bank size, count)` questions using `rng`.
    pub fn draw_with<R: Rng + ?Sized>(&self, rng: &mut R) -> QuizPlan {
        let mut order: Vec<usize> = (0..self.bank.len()).collect();
        order.shuffle(&mut *rng);
        order.truncate(self.count);

        if order.len() < self.count {
            log::warn!(
                "question bank holds {} questions, {} requested",
                self.bank.len(),
                self.count
            );
        }

        let questions = order
            .into_iter()
            .map(|i| {
                SessionQuestion::arranged(self.bank[i].clone(), |options| {
                    options.shuffle(&mut *rng);
                })
            })
            .collect();

        QuizPlan {
            questions,
            requested: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn build_bank(n: usize) -> Vec<Question> {
        (0..n)
            .map(|id| {
                let options = (0..4).map(|o| format!("q{id}-o{o}")).collect();
                Question::new("TEST", format!("Question {id}?"), options, format!("q{id}-o2"))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn draws_distinct_questions() {
        let bank = build_bank(25);
        let plan = QuizPlanner::new(&bank, 10).draw_with(&mut StdRng::seed_from_u64(7));

        assert_eq!(plan.total(), 10);
        assert!(!plan.is_short());
        let prompts: HashSet<_> = plan.questions.iter().map(|q| q.prompt().to_owned()).collect();
        assert_eq!(prompts.len(), 10);
    }

    #[test]
    fn options_are_a_permutation_of_the_bank_options() {
        let bank = build_bank(12);
        let plan = QuizPlanner::new(&bank, 10).draw_with(&mut StdRng::seed_from_u64(42));

        for q in &plan.questions {
            let mut session: Vec<_> = q.options().to_vec();
            let mut original: Vec<_> = q.question().options().to_vec();
            session.sort();
            original.sort();
            assert_eq!(session, original);
            assert!(q.options().iter().any(|o| q.is_correct(o)));
        }
    }

    #[test]
    fn small_bank_yields_everything_it_has() {
        let bank = build_bank(4);
        let plan = QuizPlanner::new(&bank, 10).draw();
        assert_eq!(plan.total(), 4);
        assert!(plan.is_short());

        let empty: Vec<Question> = Vec::new();
        assert_eq!(QuizPlanner::new(&empty, 10).draw().total(), 0);
    }

    #[test]
    fn repeated_draws_have_same_length() {
        let bank = build_bank(30);
        let planner = QuizPlanner::new(&bank, 10);
        assert_eq!(planner.draw().total(), planner.draw().total());
    }
}
