//! Points awarded for a correct answer.

use crate::model::QuizRules;

pub const MAX_POINTS: u32 = 30;
pub const MIN_POINTS: u32 = 10;

/// Points for a correct answer given with `time_left` seconds on the default clock.
///
/// `max(10, floor(30 - elapsed * 0.5))` where `elapsed = 30 - time_left`.
/// Under the 30 s limit the lowest award is 15; the 10 point floor only binds
/// for limits above 40 s (see `points_within`).
#[must_use]
pub fn points(time_left: u32) -> u32 {
    points_within(time_left, QuizRules::DEFAULT_TIME_LIMIT_SECS)
}

/// Same policy measured against a custom time limit.
#[must_use]
pub fn points_within(time_left: u32, time_limit: u32) -> u32 {
    let elapsed = time_limit.saturating_sub(time_left);
    // floor(30 - e / 2) == 30 - ceil(e / 2)
    MAX_POINTS
        .saturating_sub(elapsed.div_ceil(2))
        .max(MIN_POINTS)
}
