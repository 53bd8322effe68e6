use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quiz_core::model::{Question, QuizRules, ResultSummary, SessionQuestion};
use quiz_core::quiz::{Outcome, QuizObserver, QuizPhase, Resolution, ResolutionCause};
use quiz_core::time::fixed_clock;
use quiz_core::timer::{ManualScheduler, TimerRole, TimerToken};
use services::{EngineStep, QuestionBank, QuizEngine, QuizService};
use storage::repository::{InMemoryRepository, LeaderboardRepository, StorageError};

#[derive(Default)]
struct CountingRepo {
    inner: InMemoryRepository,
    appends: AtomicUsize,
}

#[async_trait]
impl LeaderboardRepository for CountingRepo {
    async fn append_result(&self, result: &ResultSummary) -> Result<i64, StorageError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append_result(result).await
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, StorageError> {
        self.inner.list_results().await
    }

    async fn clear_results(&self) -> Result<(), StorageError> {
        self.inner.clear_results().await
    }
}

struct BrokenRepo;

#[async_trait]
impl LeaderboardRepository for BrokenRepo {
    async fn append_result(&self, _result: &ResultSummary) -> Result<i64, StorageError> {
        Err(StorageError::Connection("disk on fire".into()))
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, StorageError> {
        Ok(Vec::new())
    }

    async fn clear_results(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

type EventLog = Arc<Mutex<Vec<&'static str>>>;

fn record(log: &EventLog, event: &'static str) {
    log.lock().unwrap().push(event);
}

struct LoggingRepo {
    log: EventLog,
    inner: InMemoryRepository,
}

#[async_trait]
impl LeaderboardRepository for LoggingRepo {
    async fn append_result(&self, result: &ResultSummary) -> Result<i64, StorageError> {
        record(&self.log, "append");
        self.inner.append_result(result).await
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, StorageError> {
        self.inner.list_results().await
    }

    async fn clear_results(&self) -> Result<(), StorageError> {
        self.inner.clear_results().await
    }
}

struct LoggingObserver {
    log: EventLog,
}

impl QuizObserver for LoggingObserver {
    fn on_correct(&mut self, _resolution: &Resolution) {
        record(&self.log, "correct");
    }

    fn on_end(&mut self, _summary: &ResultSummary) {
        record(&self.log, "end");
    }
}

fn build_question(id: usize) -> Question {
    let options = (0..4).map(|o| format!("q{id}-o{o}")).collect();
    Question::new("TEST", format!("Question {id}?"), options, format!("q{id}-o3")).unwrap()
}

fn draw(n: usize) -> Vec<SessionQuestion> {
    (0..n).map(|id| SessionQuestion::new(build_question(id))).collect()
}

fn start_engine(
    n: usize,
    repo: Arc<dyn LeaderboardRepository>,
) -> QuizEngine<ManualScheduler> {
    let mut engine = QuizEngine::new(
        QuizRules::default(),
        fixed_clock(),
        ManualScheduler::new(),
        repo,
    );
    engine.start(draw(n)).unwrap();
    engine
}

fn correct_option(engine: &QuizEngine<ManualScheduler>) -> String {
    engine
        .session()
        .current_question()
        .unwrap()
        .correct_answer()
        .to_owned()
}

fn wrong_option(engine: &QuizEngine<ManualScheduler>) -> String {
    engine.session().current_question().unwrap().options()[0].clone()
}

async fn fire(engine: &mut QuizEngine<ManualScheduler>) -> EngineStep {
    let token = engine.scheduler_mut().fire_next().expect("a pending timer");
    engine.on_timer(token).await
}

/// Fire the next timer and move the wall clock by the same virtual delay.
async fn fire_in_step(engine: &mut QuizEngine<ManualScheduler>) -> EngineStep {
    let before = engine.scheduler().now();
    let token = engine.scheduler_mut().fire_next().expect("a pending timer");
    let waited = engine.scheduler().now() - before;
    engine
        .clock_mut()
        .advance(chrono::Duration::from_std(waited).unwrap());
    engine.on_timer(token).await
}

#[tokio::test]
async fn perfect_run_scores_300_and_persists_once() {
    let repo = Arc::new(CountingRepo::default());
    let mut engine = start_engine(10, repo.clone());

    for i in 0..10 {
        let option = correct_option(&engine);
        let EngineStep::Resolved(res) = engine.answer(&option).await else {
            panic!("answer should resolve question {i}");
        };
        assert_eq!(res.points, 30);

        // Only the auto-advance timer remains once the clock is stopped.
        let pending = engine.scheduler().pending_tokens();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].role(), TimerRole::Advance);

        match fire(&mut engine).await {
            EngineStep::Advanced { index } => assert_eq!(index, i + 1),
            EngineStep::Ended(summary) => {
                assert_eq!(i, 9);
                assert_eq!(summary.score(), 300);
                assert_eq!(summary.questions_answered(), 10);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    assert_eq!(engine.session().phase(), QuizPhase::Ended);
    let EngineStep::Completed(handoff) = fire(&mut engine).await else {
        panic!("expected completion handoff");
    };
    assert_eq!(handoff.score, 300);
    assert_eq!(handoff.questions_answered, 10);
    assert_eq!(repo.appends.load(Ordering::SeqCst), 1);
    assert_eq!(engine.scheduler().pending(), 0);
}

#[tokio::test]
async fn three_wrong_answers_end_immediately() {
    let repo = Arc::new(CountingRepo::default());
    let mut engine = start_engine(10, repo.clone());

    for expected_lives in [2, 1] {
        let option = wrong_option(&engine);
        let EngineStep::Resolved(res) = engine.answer(&option).await else {
            panic!("wrong answer should resolve");
        };
        assert_eq!(res.lives, expected_lives);
        assert!(matches!(fire(&mut engine).await, EngineStep::Advanced { .. }));
    }

    let option = wrong_option(&engine);
    let EngineStep::Resolved(res) = engine.answer(&option).await else {
        panic!("wrong answer should resolve");
    };
    assert_eq!(res.lives, 0);
    assert!(engine.session().is_ended());

    let summary = engine.summary().expect("summary after termination");
    assert_eq!(summary.questions_answered(), 3);
    assert_eq!(summary.score(), 0);
    assert_eq!(repo.appends.load(Ordering::SeqCst), 1);

    let pending = engine.scheduler().pending_tokens();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].role(), TimerRole::Finish);
    assert!(matches!(fire(&mut engine).await, EngineStep::Completed(_)));
}

#[tokio::test]
async fn clock_expiry_counts_as_a_miss() {
    let repo = Arc::new(InMemoryRepository::new());
    let mut engine = start_engine(10, repo);

    for expected in (1..30).rev() {
        assert_eq!(
            fire(&mut engine).await,
            EngineStep::Ticked {
                time_left: expected
            }
        );
    }
    let EngineStep::Resolved(res) = fire(&mut engine).await else {
        panic!("expected timeout resolution");
    };
    assert_eq!(res.cause, ResolutionCause::TimedOut);
    assert_eq!(res.outcome, Outcome::Incorrect);
    assert_eq!(res.points, 0);
    assert_eq!(engine.session().lives(), 2);
    assert_eq!(engine.session().selected_answer(), None);

    assert_eq!(fire(&mut engine).await, EngineStep::Advanced { index: 1 });
    assert_eq!(engine.session().time_left(), 30);
}

#[tokio::test]
async fn tick_after_answer_is_stale() {
    let repo = Arc::new(InMemoryRepository::new());
    let mut engine = start_engine(10, repo);

    let tick = engine.scheduler().pending_tokens()[0];
    assert_eq!(tick.role(), TimerRole::Tick);

    let option = wrong_option(&engine);
    assert!(matches!(engine.answer(&option).await, EngineStep::Resolved(_)));

    // Delivered anyway, as if cancellation lost the race.
    assert_eq!(engine.on_timer(tick).await, EngineStep::Ignored);
    assert_eq!(engine.session().lives(), 2);

    let late = correct_option(&engine);
    assert_eq!(engine.answer(&late).await, EngineStep::Ignored);
    assert_eq!(engine.session().score(), 0);
}

#[tokio::test]
async fn last_question_with_last_life_ends_once() {
    let repo = Arc::new(CountingRepo::default());
    let mut engine = start_engine(3, repo.clone());
    for _ in 0..2 {
        let option = wrong_option(&engine);
        engine.answer(&option).await;
        fire(&mut engine).await;
    }
    let epoch_before_end = engine.session().epoch();

    let option = wrong_option(&engine);
    engine.answer(&option).await;
    assert!(engine.session().is_ended());

    // Stray triggers for the final question after termination.
    let stray_advance = TimerToken::new(TimerRole::Advance, epoch_before_end);
    let stray_tick = TimerToken::new(TimerRole::Tick, epoch_before_end);
    assert_eq!(engine.on_timer(stray_advance).await, EngineStep::Ignored);
    assert_eq!(engine.on_timer(stray_tick).await, EngineStep::Ignored);
    assert_eq!(engine.answer_index(0).await, EngineStep::Ignored);

    assert!(matches!(fire(&mut engine).await, EngineStep::Completed(_)));
    assert_eq!(fire_if_any(&mut engine).await, None);
    assert_eq!(repo.appends.load(Ordering::SeqCst), 1);
    assert_eq!(repo.list_results().await.unwrap().len(), 1);
}

async fn fire_if_any(engine: &mut QuizEngine<ManualScheduler>) -> Option<EngineStep> {
    let token = engine.scheduler_mut().fire_next()?;
    Some(engine.on_timer(token).await)
}

#[tokio::test]
async fn persistence_failure_does_not_block_termination() {
    let mut engine = start_engine(1, Arc::new(BrokenRepo));
    let option = correct_option(&engine);
    engine.answer(&option).await;

    assert!(matches!(fire(&mut engine).await, EngineStep::Ended(_)));
    let EngineStep::Completed(handoff) = fire(&mut engine).await else {
        panic!("termination should still hand off");
    };
    assert_eq!(handoff.score, 30);
    assert_eq!(handoff.questions_answered, 1);
}

#[tokio::test]
async fn abandoning_persists_nothing_and_stops_timers() {
    let repo = Arc::new(CountingRepo::default());
    let mut engine = start_engine(10, repo.clone());
    let option = correct_option(&engine);
    engine.answer(&option).await;

    engine.abandon();

    assert_eq!(engine.scheduler().pending(), 0);
    assert_eq!(engine.answer_index(1).await, EngineStep::Ignored);
    assert_eq!(repo.appends.load(Ordering::SeqCst), 0);
    assert!(engine.summary().is_none());
}

#[tokio::test]
async fn answer_by_index_uses_session_order() {
    let repo = Arc::new(InMemoryRepository::new());
    let mut engine = start_engine(10, repo);

    assert_eq!(engine.answer_index(7).await, EngineStep::Ignored);
    let EngineStep::Resolved(res) = engine.answer_index(3).await else {
        panic!("index 3 holds the correct option");
    };
    assert!(res.is_correct());
}

#[tokio::test]
async fn service_draws_from_a_short_bank() {
    let bank = QuestionBank::new((0..4).map(build_question).collect());
    let service = QuizService::new(fixed_clock(), bank, Arc::new(InMemoryRepository::new()));

    let engine = service.start_engine(ManualScheduler::new()).unwrap();
    assert_eq!(engine.session().total_questions(), 4);

    let empty = QuizService::new(
        fixed_clock(),
        QuestionBank::new(Vec::new()),
        Arc::new(InMemoryRepository::new()),
    );
    assert!(empty.start_engine(ManualScheduler::new()).is_err());
}

#[tokio::test]
async fn result_is_stored_before_the_end_is_announced() {
    let log = EventLog::default();
    let repo = Arc::new(LoggingRepo {
        log: Arc::clone(&log),
        inner: InMemoryRepository::new(),
    });
    let observer = LoggingObserver {
        log: Arc::clone(&log),
    };
    let mut engine = QuizEngine::new(
        QuizRules::default(),
        fixed_clock(),
        ManualScheduler::new(),
        repo,
    )
    .with_observer(Box::new(observer));
    engine.start(draw(1)).unwrap();

    let option = correct_option(&engine);
    engine.answer(&option).await;
    assert_eq!(*log.lock().unwrap(), vec!["correct"]);

    assert!(matches!(fire(&mut engine).await, EngineStep::Ended(_)));
    assert_eq!(*log.lock().unwrap(), vec!["correct", "append", "end"]);

    assert!(matches!(fire(&mut engine).await, EngineStep::Completed(_)));
    assert_eq!(*log.lock().unwrap(), vec!["correct", "append", "end"]);
}

#[tokio::test]
async fn time_spent_covers_countdowns_and_pauses() {
    let repo = Arc::new(InMemoryRepository::new());
    let mut engine = start_engine(10, repo.clone());

    // Three full countdowns with two 2s pauses between them.
    while !engine.session().is_ended() {
        fire_in_step(&mut engine).await;
    }
    let summary = engine.summary().expect("summary after termination").clone();
    assert_eq!(summary.questions_answered(), 3);
    assert_eq!(summary.time_spent_secs(), 3 * 30 + 2 * 2);

    let EngineStep::Completed(handoff) = fire_in_step(&mut engine).await else {
        panic!("expected completion handoff");
    };
    assert_eq!(handoff.time_spent_secs, 94);
    assert_eq!(repo.list_results().await.unwrap()[0].time_spent_secs(), 94);
}

#[tokio::test]
async fn instant_answers_spend_only_the_pauses() {
    let repo = Arc::new(InMemoryRepository::new());
    let mut engine = start_engine(10, repo);

    let summary = loop {
        let option = correct_option(&engine);
        engine.answer(&option).await;
        if let EngineStep::Ended(summary) = fire_in_step(&mut engine).await {
            break summary;
        }
    };
    assert_eq!(summary.score(), 300);
    assert_eq!(summary.time_spent_secs(), 10 * 2);
}
