use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use quiz_core::model::{
    Badge, QuizHandoff, Rank, ResultSummary, SessionQuestion, format_duration,
};
use quiz_core::quiz::{QuizObserver, Resolution};
use services::{AppServices, Clock, PlayerInput, QuestionBank, RunOutcome};
use tokio::sync::mpsc;

const BUILTIN_BANK: &str = include_str!("../assets/questions.json");
const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
const DEFAULT_LIMIT: usize = 10;
const OPTION_KEYS: [char; 4] = ['a', 'b', 'c', 'd'];

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MisplacedCommand(String),
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MisplacedCommand(cmd) => {
                write!(f, "subcommand {cmd} must come before any flags")
            }
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz play        [--db <sqlite_url>] [--bank <questions.json>]");
    eprintln!("  quiz leaderboard [--db <sqlite_url>] [--limit <n>] [--json]");
    eprintln!("  quiz clear       [--db <sqlite_url>]");
    eprintln!();
    eprintln!("The subcommand goes first; without one, quiz plays.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --bank built-in question bank");
    eprintln!("  --limit {DEFAULT_LIMIT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_BANK, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Leaderboard,
    Clear,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "leaderboard" => Some(Self::Leaderboard),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    db_url: String,
    bank: Option<PathBuf>,
    limit: usize,
    json: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        Self::parse_with(args, |key| std::env::var(key).ok())
    }

    fn parse_with(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("QUIZ_DB_URL")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut bank = env("QUIZ_BANK")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let mut limit = DEFAULT_LIMIT;
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bank" => {
                    bank = Some(PathBuf::from(require_value(args, "--bank")?));
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidLimit { raw: value })?;
                }
                "--json" => json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if Command::from_arg(other).is_some() => {
                    return Err(ArgsError::MisplacedCommand(arg));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            bank,
            limit,
            json,
        })
    }

    fn question_bank(&self) -> Result<QuestionBank, services::BankError> {
        match &self.bank {
            Some(path) => QuestionBank::load(path),
            None => QuestionBank::from_json(BUILTIN_BANK),
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── TERMINAL ─────────────────────────────────────────────────────────────────
//

/// Prints session events; the bell stands in for sound effects.
#[derive(Default)]
struct TerminalObserver {
    total: usize,
}

impl TerminalObserver {
    fn bell() {
        print!("\x07");
    }
}

impl QuizObserver for TerminalObserver {
    fn on_start(&mut self, total_questions: usize) {
        self.total = total_questions;
        println!("Fact check! {total_questions} questions, answer with a-d or 1-4, q to quit.");
    }

    fn on_question(&mut self, index: usize, question: &SessionQuestion, time_left: u32) {
        println!();
        println!(
            "[{}] Question {}/{} ({time_left}s)",
            question.category(),
            index + 1,
            self.total
        );
        println!("{}", question.prompt());
        for (key, option) in OPTION_KEYS.iter().zip(question.options()) {
            println!("  {key}) {option}");
        }
    }

    fn on_tick(&mut self, time_left: u32) {
        if time_left <= 5 {
            Self::bell();
            println!("  {time_left}s left");
        } else if time_left % 10 == 0 {
            println!("  {time_left}s left");
        }
    }

    fn on_correct(&mut self, resolution: &Resolution) {
        Self::bell();
        println!(
            "Correct! +{} points (score {}, lives {})",
            resolution.points, resolution.score, resolution.lives
        );
    }

    fn on_incorrect(&mut self, resolution: &Resolution, correct_answer: &str) {
        Self::bell();
        println!("Wrong. The answer was: {correct_answer}");
        println!("Lives left: {}", resolution.lives);
    }

    fn on_timeout(&mut self, resolution: &Resolution, correct_answer: &str) {
        Self::bell();
        println!("Time's up! The answer was: {correct_answer}");
        println!("Lives left: {}", resolution.lives);
    }

    fn on_end(&mut self, summary: &ResultSummary) {
        println!();
        println!("Quiz over with {} points.", summary.score());
        let _ = std::io::stdout().flush();
    }
}

/// Map one line of player input to an action. Unknown input is skipped.
fn parse_input(line: &str) -> Option<PlayerInput> {
    let line = line.trim().to_ascii_lowercase();
    let mut chars = line.chars();
    let key = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    match key {
        'q' => Some(PlayerInput::Quit),
        '1'..='4' => key.to_digit(10).map(|d| PlayerInput::Choice(d as usize - 1)),
        _ => OPTION_KEYS
            .iter()
            .position(|k| *k == key)
            .map(PlayerInput::Choice),
    }
}

fn spawn_stdin_reader(tx: mpsc::Sender<PlayerInput>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let Some(input) = parse_input(&line) else {
                continue;
            };
            if tx.blocking_send(input).is_err() {
                break;
            }
        }
    });
}

fn print_results(handoff: &QuizHandoff, total_questions: u32) {
    println!();
    println!("Rank      {}", Rank::from_score(handoff.score));
    println!("Score     {}", handoff.score);
    println!("Time      {}", format_duration(handoff.time_spent_secs));
    println!("Questions {}/{total_questions}", handoff.questions_answered);

    let badges = Badge::earned(
        handoff.score,
        handoff.time_spent_secs,
        handoff.questions_answered,
        total_questions,
    );
    if !badges.is_empty() {
        let labels: Vec<_> = badges.iter().map(|badge| badge.label()).collect();
        println!("Badges    {}", labels.join(", "));
    }
}

async fn play(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let quiz = services.quiz();
    let total = quiz.rules().question_count().min(quiz.bank().len());
    let total = u32::try_from(total).unwrap_or(u32::MAX);

    let (tx, rx) = mpsc::channel(8);
    spawn_stdin_reader(tx);

    match quiz.play(rx, Box::new(TerminalObserver::default())).await? {
        RunOutcome::Completed(handoff) => print_results(&handoff, total),
        RunOutcome::Abandoned => println!("Quiz abandoned; no result saved."),
    }
    Ok(())
}

async fn show_leaderboard(
    services: &AppServices,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = services.leaderboard().ranked(limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No results yet. Play a round first.");
        return Ok(());
    }
    println!("{:>3}  {:>5}  {:>4}  {:>5}  {:>9}  date", "#", "score", "rank", "time", "questions");
    for entry in entries {
        println!(
            "{:>3}  {:>5}  {:>4}  {:>5}  {:>9}  {}",
            entry.position,
            entry.score,
            entry.rank.to_string(),
            format_duration(entry.time_spent_secs),
            entry.questions_answered,
            entry.date.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means play.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let bank = parsed.question_bank()?;
    match &parsed.bank {
        Some(path) => log::debug!("loaded {} questions from {}", bank.len(), path.display()),
        None => log::debug!("using built-in bank of {} questions", bank.len()),
    }
    log::debug!("opening leaderboard at {}", parsed.db_url);
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock(), bank).await?;

    match cmd {
        Command::Play => play(&services).await,
        Command::Leaderboard => show_leaderboard(&services, parsed.limit, parsed.json).await,
        Command::Clear => {
            services.leaderboard().clear().await?;
            println!("Leaderboard cleared.");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
