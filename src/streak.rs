use std::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::error::{StreakError, StreakResult};
use crate::lcapi::SubmissionSource;
use crate::lcdb::memory::MemoryStore;
use crate::lcdb::{Database, HistoryStore, SubmissionStore, UserStore};
use crate::lctime;
use crate::models;

pub mod engine;
pub mod locks;
pub mod reconcile;

use engine::EngineState;
use locks::UserLocks;

/// Entry points for keeping users' streaks in sync with the submission source.
///
/// Every per-user operation holds that user's lock, so one user never has two updates in
/// flight. The database lock is only ever held between awaits.
pub struct StreakService<S> {
    source: S,
    db: Mutex<Database>,
    locks: UserLocks,
    fetch_limit: usize,
}

impl<S: SubmissionSource> StreakService<S> {
    pub fn new(source: S, db: Database, config: &Config) -> Self {
        Self {
            source,
            db: Mutex::new(db),
            locks: UserLocks::new(),
            fetch_limit: config.fetch_limit,
        }
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find_user(&self, user_id: &str) -> StreakResult<models::User> {
        self.db()
            .query_user(user_id)?
            .ok_or_else(|| StreakError::UserNotFound(user_id.to_string()))
    }

    /// Registers a user to be kept in sync. Returns `true` if they weren't known yet.
    pub fn track_user(&self, user: &models::User) -> StreakResult<bool> {
        Ok(self.db().insert_user(user)?)
    }

    pub fn user(&self, user_id: &str) -> StreakResult<models::User> {
        self.find_user(user_id)
    }

    pub fn streak(&self, user_id: &str) -> StreakResult<u64> {
        Ok(self.find_user(user_id)?.current_streak)
    }

    pub async fn reset_streak(&self, user_id: &str) -> StreakResult<()> {
        let _guard = self.locks.acquire(user_id).await;
        self.find_user(user_id)?;
        self.db().reset_streak(user_id)?;
        log::info!("Reset {user_id}'s streak.");

        Ok(())
    }

    /// Changes the zone the user's days are counted in. Returns the form that was stored.
    pub async fn set_timezone(&self, user_id: &str, timezone: &str) -> StreakResult<String> {
        let _guard = self.locks.acquire(user_id).await;
        self.find_user(user_id)?;

        let zone = lctime::normalize_timezone(timezone)
            .ok_or_else(|| StreakError::InvalidTimezone(timezone.to_string()))?;
        self.db().update_timezone(user_id, &zone)?;
        log::info!("Set {user_id}'s timezone to {zone} (currently UTC{}).",
            lctime::utc_offset(&lctime::iana_timezone(Some(&zone))));

        Ok(zone)
    }

    async fn fetch(&self, user: &models::User) -> StreakResult<Vec<models::Submission>> {
        self.source
            .fetch_recent_accepted(&user.username, self.fetch_limit)
            .await
            .map_err(StreakError::Upstream)
    }

    /// Pulls the user's latest accepted submissions and advances their streak.
    pub async fn update_streak(&self, user_id: &str) -> StreakResult<models::StreakUpdate> {
        let _guard = self.locks.acquire(user_id).await;
        let user = self.find_user(user_id)?;

        let submissions = self.fetch(&user).await?;
        if submissions.is_empty() {
            log::trace!("[update_streak] No recent submissions for {}.", user.username);
            return Ok(models::StreakUpdate::from(&user));
        }

        let tz = lctime::resolve_timezone(user.timezone.as_deref());
        let db = self.db();

        let latest = db.query_latest_history(user_id)?;
        let problems_today = match (user.last_activity, &latest) {
            (Some(last), Some(record)) if lctime::local_date(last, tz) == record.date => {
                record.problems_solved
            }
            _ => 0,
        };

        let state = EngineState {
            streak: user.current_streak,
            last_processed: user.last_activity,
            problems_today,
            segment_start: latest.map(|record| record.first_problem_at),
        };

        let outcome = engine::process_submissions(&*db, &*db, user_id, tz, state, &submissions)?;
        db.update_streak(user_id, outcome.streak, outcome.last_processed)?;

        if outcome.streak != user.current_streak {
            log::info!("{}'s streak is now {} (was {}).",
                user.username, outcome.streak, user.current_streak);
        }

        Ok(models::StreakUpdate { streak: outcome.streak, last_activity: outcome.last_processed })
    }

    /// Updates every known user, one at a time. Failures are logged and counted.
    pub async fn update_all_streaks(&self) -> StreakResult<models::BatchSummary> {
        let users = self.db().query_users()?;
        if users.is_empty() {
            log::warn!("[update_all_streaks] No users found to update.");
        }

        let mut summary = models::BatchSummary::default();
        for user in users {
            match self.update_streak(&user.user_id).await {
                Ok(_) => summary.processed += 1,
                Err(err) => {
                    log::error!("[update_all_streaks] Could not update {}: {err}", user.user_id);
                    summary.failed += 1;
                }
            }
        }

        log::info!("Streaks updated: {} ok, {} failed.", summary.processed, summary.failed);
        Ok(summary)
    }

    /// Recomputes the streak from the start of the fetched window, ignoring stored streak state.
    ///
    /// A problem counts as new the first time it appears in the window, unless it was already
    /// solved before the window opened. Problems that weren't stored yet are recorded afterwards.
    /// `timezone` overrides the user's stored zone.
    pub async fn resync_streak(&self, user_id: &str, timezone: Option<&str>)
        -> StreakResult<models::StreakUpdate>
    {
        let _guard = self.locks.acquire(user_id).await;
        let user = self.find_user(user_id)?;

        let submissions = self.fetch(&user).await?;
        if submissions.is_empty() {
            return Ok(models::StreakUpdate::from(&user));
        }

        let tz = lctime::resolve_timezone(timezone.or(user.timezone.as_deref()));
        let db = self.db();

        let window_start = submissions
            .iter()
            .filter(|sub| sub.is_accepted())
            .map(|sub| sub.timestamp)
            .min();
        let scratch = MemoryStore::new();
        if let Some(window_start) = window_start {
            for sub in db.query_accepted_submissions(user_id)?
                .iter()
                .filter(|sub| sub.timestamp < window_start)
            {
                scratch.insert_submission(user_id, sub)?;
            }
        }

        let outcome = engine::process_submissions(
            &scratch, &*db, user_id, tz, EngineState::default(), &submissions,
        )?;

        for sub in submissions.iter().filter(|sub| sub.is_accepted()) {
            db.insert_submission(user_id, sub)?;
        }
        db.update_streak(user_id, outcome.streak, outcome.last_processed)?;
        log::info!("Resynced {}'s streak: {}.", user.username, outcome.streak);

        Ok(models::StreakUpdate { streak: outcome.streak, last_activity: outcome.last_processed })
    }

    /// Recomputes the streak by replaying every submission already on record.
    pub async fn rebuild_streak(&self, user_id: &str) -> StreakResult<u64> {
        let _guard = self.locks.acquire(user_id).await;
        let user = self.find_user(user_id)?;

        let tz = lctime::resolve_timezone(user.timezone.as_deref());
        let scratch = MemoryStore::new();
        let db = self.db();

        let submissions = db.query_accepted_submissions(user_id)?;
        let outcome = engine::process_submissions(
            &scratch, &*db, user_id, tz, EngineState::default(), &submissions,
        )?;

        db.update_streak(
            user_id,
            outcome.streak,
            outcome.last_processed.or(user.last_activity),
        )?;
        log::info!("Rebuilt {}'s streak from {} submissions: {}.",
            user.username, submissions.len(), outcome.streak);

        Ok(outcome.streak)
    }

    pub fn reconcile_all_histories(&self) -> StreakResult<models::ReconcileSummary> {
        Ok(reconcile::reconcile_all_histories(&*self.db())?)
    }
}
