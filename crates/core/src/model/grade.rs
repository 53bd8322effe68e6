use serde::Serialize;
use std::fmt;

/// Letter rank shown on the results view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Rank {
    S,
    A,
    B,
    C,
    D,
}

impl Rank {
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Rank::S,
            80..=89 => Rank::A,
            70..=79 => Rank::B,
            50..=69 => Rank::C,
            _ => Rank::D,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Rank::S => "S",
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
        };
        f.write_str(letter)
    }
}

/// Achievements awarded for a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    TruthMaster,
    FactFinder,
    TruthSeeker,
    SpeedDemon,
    Completionist,
}

impl Badge {
    const SPEED_LIMIT_SECS: u64 = 120;
    const SPEED_MIN_QUESTIONS: u32 = 8;

    /// Badges earned by a session.
    ///
    /// At most one score badge is awarded; `total_questions` is the session length
    /// needed for `Completionist`.
    #[must_use]
    pub fn earned(
        score: u32,
        time_spent_secs: u64,
        questions_answered: u32,
        total_questions: u32,
    ) -> Vec<Badge> {
        let mut badges = Vec::new();

        if score >= 90 {
            badges.push(Badge::TruthMaster);
        } else if score >= 70 {
            badges.push(Badge::FactFinder);
        } else if score >= 50 {
            badges.push(Badge::TruthSeeker);
        }

        if time_spent_secs < Self::SPEED_LIMIT_SECS && questions_answered >= Self::SPEED_MIN_QUESTIONS
        {
            badges.push(Badge::SpeedDemon);
        }
        if questions_answered == total_questions {
            badges.push(Badge::Completionist);
        }

        badges
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Badge::TruthMaster => "Truth Master",
            Badge::FactFinder => "Fact Finder",
            Badge::TruthSeeker => "Truth Seeker",
            Badge::SpeedDemon => "Speed Demon",
            Badge::Completionist => "Completionist",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Formats seconds as `m:ss`.
#[must_use]
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
