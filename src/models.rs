use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;

/// Status label the submission source uses for accepted solutions.
pub const ACCEPTED: &str = "Accepted";

/// Language recorded when the source doesn't report one.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

static WHITESPACE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\s+").expect("whitespace regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub username: String,

    pub current_streak: u64,
    pub longest_streak: u64,

    /// Unix seconds of the most recently processed accepted submission.
    pub last_activity: Option<i64>,
    /// Either a UTC offset (`+05:00`) or an IANA zone name, as the user entered it.
    pub timezone: Option<String>,
}

impl User {
    pub fn new(user_id: &str, username: &str, timezone: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: username.to_string(),
            current_streak: 0,
            longest_streak: 0,
            last_activity: None,
            timezone: timezone.map(String::from),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**User Streak:** {}\n\
             \tCurrent Streak: {}\n\
             \tLongest Streak: {}\n\
             \tLast Activity: {}\n\
             \tTimezone: {}",
            self.username,
            self.current_streak,
            self.longest_streak,
            self.last_activity
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map_or_else(|| String::from("never"), |dt| dt.to_string()),
            self.timezone.as_deref().unwrap_or("UTC"),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub title: String,
    pub slug: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub status: String,
    pub language: String,
}

impl Submission {
    /// Builds a submission, deriving the slug from the title when the source didn't provide one.
    pub fn new(title: &str, slug: &str, timestamp: i64, status: &str, language: &str) -> Self {
        let slug = if slug.trim().is_empty() { slugify(title) } else { slug.to_string() };
        let language = if language.trim().is_empty() { UNKNOWN_LANGUAGE } else { language };

        Self {
            title: title.to_string(),
            slug,
            timestamp,
            status: status.to_string(),
            language: language.to_string(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ACCEPTED
    }
}

/// Normalizes a problem title into its slug: lowercase, whitespace runs become `-`.
pub fn slugify(title: &str) -> String {
    WHITESPACE
        .replace_all(title.trim(), "-")
        .to_lowercase()
}

/// Per-user, per-local-day record of solved problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakHistory {
    pub user_id: String,
    pub date: NaiveDate,
    pub problems_solved: u64,
    /// Unix seconds of the first accepted submission of the streak segment in progress.
    pub first_problem_at: i64,
}

/// Result of a per-user streak update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakUpdate {
    pub streak: u64,
    pub last_activity: Option<i64>,
}

impl From<&User> for StreakUpdate {
    fn from(user: &User) -> Self {
        Self { streak: user.current_streak, last_activity: user.last_activity }
    }
}

/// Outcome of an "update all users" pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Outcome of a history reconciliation pass over every user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub total_users: usize,
    pub processed: usize,
    pub updated: usize,
    pub errors: usize,
    /// Only the first few failures are kept.
    pub error_messages: Vec<String>,
}
