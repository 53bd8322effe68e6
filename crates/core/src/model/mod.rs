mod grade;
mod question;
mod result;
mod rules;

pub use grade::{Badge, Rank, format_duration};
pub use question::{OPTION_COUNT, Question, QuestionError, QuestionRecord, SessionQuestion};
pub use result::{QuizHandoff, ResultSummary};
pub use rules::{QuizRules, RulesError};
