use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::models;

pub mod history;
pub mod memory;
pub mod schema;
pub mod submissions;
pub mod users;

pub type DBResult<T> = rusqlite::Result<T>;

/// Recorded submissions, keyed by `(user_id, slug)`.
pub trait SubmissionStore {
    /// Returns which of `slugs` the user already has a stored submission for.
    fn query_existing_slugs(&self, user_id: &str, slugs: &[String]) -> DBResult<HashSet<String>>;

    /// Records a submission. Returns `true` if it was newly added, false if the problem
    /// was already recorded for this user.
    fn insert_submission(&self, user_id: &str, submission: &models::Submission) -> DBResult<bool>;

    /// All stored accepted submissions for a user, oldest first.
    fn query_accepted_submissions(&self, user_id: &str) -> DBResult<Vec<models::Submission>>;
}

/// Per-day streak history, keyed by `(user_id, date)`.
pub trait HistoryStore {
    fn upsert_history(&self, record: &models::StreakHistory) -> DBResult<()>;

    fn query_history(&self, user_id: &str, date: NaiveDate)
        -> DBResult<Option<models::StreakHistory>>;

    /// The user's most recent history record, by date.
    fn query_latest_history(&self, user_id: &str) -> DBResult<Option<models::StreakHistory>>;
}

/// Per-user streak state.
pub trait UserStore {
    fn query_user(&self, user_id: &str) -> DBResult<Option<models::User>>;

    fn query_users(&self) -> DBResult<Vec<models::User>>;

    /// Inserts the user, doing nothing if they're already there.
    /// Returns `true` if it was newly added, false otherwise.
    fn insert_user(&self, user: &models::User) -> DBResult<bool>;

    /// Stores the new streak state. The longest streak only ever grows.
    fn update_streak(&self, user_id: &str, streak: u64, last_activity: Option<i64>)
        -> DBResult<()>;

    /// Zeroes the current streak and forgets the last activity.
    fn reset_streak(&self, user_id: &str) -> DBResult<()>;

    fn update_timezone(&self, user_id: &str, timezone: &str) -> DBResult<()>;
}

/// Everything the streak jobs need from storage.
pub trait StreakRepository: UserStore + SubmissionStore + HistoryStore {}
impl<T: UserStore + SubmissionStore + HistoryStore> StreakRepository for T {}

/// SQLite-backed implementation of every store.
pub struct Database {
    connection: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> DBResult<Self> {
        log::debug!("[Database::open] Opening database at {}", path.as_ref().display());
        Self::initialize(Connection::open(path)?)
    }

    pub fn open_in_memory() -> DBResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(connection: Connection) -> DBResult<Self> {
        log::debug!("[initialize_db] creating Users table...");
        connection.execute(schema::USER_SCHEMA, [])?;

        log::debug!("[initialize_db] creating Submissions table...");
        connection.execute(schema::SUBMISSIONS_SCHEMA, [])?;

        log::debug!("[initialize_db] creating StreakHistory table...");
        connection.execute(schema::STREAK_HISTORY_SCHEMA, [])?;

        Ok(Self { connection })
    }

    pub(crate) fn connect(&self) -> &Connection {
        &self.connection
    }
}

/// Turns a unique or primary key violation into `Ok(false)`, for inserts that may already exist.
/// Every other constraint failure (foreign key, not null) is still an error.
pub(crate) fn swallow_constraint_violation(err: rusqlite::Error) -> DBResult<bool> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Ok(false)
        }
        err => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ACCEPTED, Submission, User};

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leek.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_user(&User::new("u1", "leek", Some("+01:00"))).unwrap();
            db.insert_submission("u1", &Submission::new("Two Sum", "two-sum", 100, ACCEPTED, "rust"))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let user = db.query_user("u1").unwrap().unwrap();
        assert_eq!(user.username, "leek");
        assert_eq!(user.timezone.as_deref(), Some("+01:00"));
        assert_eq!(db.query_accepted_submissions("u1").unwrap().len(), 1);
    }

    #[test]
    fn rows_for_unknown_users_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let sub = Submission::new("Two Sum", "two-sum", 100, ACCEPTED, "rust");

        let err = db.insert_submission("ghost", &sub).unwrap_err();
        assert!(matches!(
            err,
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        ));
        assert!(db.query_accepted_submissions("ghost").unwrap().is_empty());
    }
}
