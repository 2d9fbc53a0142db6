//! In-memory stores. Used as a scratch novelty store when replaying history,
//! and as a stand-in for SQLite in tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::{lcdb::{DBResult, HistoryStore, SubmissionStore, UserStore}, models};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RefCell<BTreeMap<String, models::User>>,
    submissions: RefCell<BTreeMap<(String, String), models::Submission>>,
    history: RefCell<BTreeMap<(String, NaiveDate), models::StreakHistory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every history record held, ordered by user then date.
    pub fn history(&self) -> Vec<models::StreakHistory> {
        self.history.borrow().values().cloned().collect()
    }
}

impl SubmissionStore for MemoryStore {
    fn query_existing_slugs(&self, user_id: &str, slugs: &[String]) -> DBResult<HashSet<String>> {
        let submissions = self.submissions.borrow();
        Ok(slugs
            .iter()
            .filter(|slug| submissions.contains_key(&(user_id.to_string(), slug.to_string())))
            .cloned()
            .collect())
    }

    fn insert_submission(&self, user_id: &str, submission: &models::Submission) -> DBResult<bool> {
        let key = (user_id.to_string(), submission.slug.clone());
        let mut submissions = self.submissions.borrow_mut();
        if submissions.contains_key(&key) {
            return Ok(false);
        }

        submissions.insert(key, submission.clone());
        Ok(true)
    }

    fn query_accepted_submissions(&self, user_id: &str) -> DBResult<Vec<models::Submission>> {
        let mut accepted = self
            .submissions
            .borrow()
            .iter()
            .filter(|((owner, _), sub)| owner == user_id && sub.is_accepted())
            .map(|(_, sub)| sub.clone())
            .collect::<Vec<_>>();
        accepted.sort_by_key(|sub| sub.timestamp);

        Ok(accepted)
    }
}

impl HistoryStore for MemoryStore {
    fn upsert_history(&self, record: &models::StreakHistory) -> DBResult<()> {
        self.history
            .borrow_mut()
            .insert((record.user_id.clone(), record.date), record.clone());
        Ok(())
    }

    fn query_history(&self, user_id: &str, date: NaiveDate)
        -> DBResult<Option<models::StreakHistory>>
    {
        Ok(self.history.borrow().get(&(user_id.to_string(), date)).cloned())
    }

    fn query_latest_history(&self, user_id: &str) -> DBResult<Option<models::StreakHistory>> {
        Ok(self
            .history
            .borrow()
            .values()
            .filter(|record| record.user_id == user_id)
            .max_by_key(|record| record.date)
            .cloned())
    }
}

impl UserStore for MemoryStore {
    fn query_user(&self, user_id: &str) -> DBResult<Option<models::User>> {
        Ok(self.users.borrow().get(user_id).cloned())
    }

    fn query_users(&self) -> DBResult<Vec<models::User>> {
        Ok(self.users.borrow().values().cloned().collect())
    }

    fn insert_user(&self, user: &models::User) -> DBResult<bool> {
        let mut users = self.users.borrow_mut();
        if users.contains_key(&user.user_id) {
            return Ok(false);
        }

        users.insert(user.user_id.clone(), user.clone());
        Ok(true)
    }

    fn update_streak(&self, user_id: &str, streak: u64, last_activity: Option<i64>)
        -> DBResult<()>
    {
        if let Some(user) = self.users.borrow_mut().get_mut(user_id) {
            user.current_streak = streak;
            user.longest_streak = user.longest_streak.max(streak);
            user.last_activity = last_activity;
        }
        Ok(())
    }

    fn reset_streak(&self, user_id: &str) -> DBResult<()> {
        if let Some(user) = self.users.borrow_mut().get_mut(user_id) {
            user.current_streak = 0;
            user.last_activity = None;
        }
        Ok(())
    }

    fn update_timezone(&self, user_id: &str, timezone: &str) -> DBResult<()> {
        if let Some(user) = self.users.borrow_mut().get_mut(user_id) {
            user.timezone = Some(timezone.to_string());
        }
        Ok(())
    }
}
