//! Rebuilds stored streak history from the submissions on record.
//!
//! Each local day's `problems_solved` is the running total of the unbroken run of consecutive
//! days it belongs to. A missed day restarts the total at that day's own count.
//! Only rows that are missing or disagree are written, so a second pass writes nothing.

use chrono::NaiveDate;
use itertools::Itertools;

use crate::lcdb::{DBResult, StreakRepository};
use crate::lctime;
use crate::models;

/// Keep at most this many failure messages in a summary.
const MAX_ERROR_MESSAGES: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserReconciliation {
    pub processed: usize,
    pub updated: usize,
}

struct DayBucket {
    date: NaiveDate,
    count: u64,
    first_at: i64,
}

/// Replays every accepted submission stored for `user` and repairs their history.
pub fn reconcile_user_history<R>(repo: &R, user: &models::User) -> DBResult<UserReconciliation>
where
    R: StreakRepository + ?Sized,
{
    let tz = lctime::resolve_timezone(user.timezone.as_deref());
    let mut submissions = repo.query_accepted_submissions(&user.user_id)?;
    submissions.sort_by_key(|sub| sub.timestamp);

    let days = submissions
        .iter()
        .chunk_by(|sub| lctime::local_date(sub.timestamp, tz))
        .into_iter()
        .map(|(date, day)| {
            let day = day.collect::<Vec<_>>();
            DayBucket {
                date,
                count: day.len() as u64,
                first_at: day.first().map_or(0, |sub| sub.timestamp),
            }
        })
        .collect::<Vec<_>>();

    let mut result = UserReconciliation::default();
    let mut accumulated = 0;
    let mut previous: Option<i64> = None;

    for day in days {
        let continues = previous.is_none_or(|prev| {
            lctime::is_next_day(day.first_at, prev, tz) || lctime::is_same_day(day.first_at, prev, tz)
        });
        if !continues {
            accumulated = 0;
        }
        accumulated += day.count;
        result.processed += 1;

        match repo.query_history(&user.user_id, day.date)? {
            Some(stored) if stored.problems_solved == accumulated => {}
            stored => {
                log::trace!("[reconcile_user_history] {} on {}: {:?} -> {accumulated}",
                    user.user_id, day.date, stored.map(|s| s.problems_solved));

                repo.upsert_history(&models::StreakHistory {
                    user_id: user.user_id.clone(),
                    date: day.date,
                    problems_solved: accumulated,
                    first_problem_at: day.first_at,
                })?;
                result.updated += 1;
            }
        }

        previous = Some(day.first_at);
    }

    Ok(result)
}

/// Repairs the history of every user. One user's failure is recorded and skipped.
pub fn reconcile_all_histories<R>(repo: &R) -> DBResult<models::ReconcileSummary>
where
    R: StreakRepository + ?Sized,
{
    log::info!("Starting streak history reconciliation...");

    let users = repo.query_users()?;
    let mut summary = models::ReconcileSummary {
        total_users: users.len(),
        ..Default::default()
    };

    if users.is_empty() {
        log::warn!("[reconcile_all_histories] No users found to reconcile.");
        return Ok(summary);
    }

    for user in &users {
        match reconcile_user_history(repo, user) {
            Ok(result) => {
                summary.processed += result.processed;
                summary.updated += result.updated;
            }
            Err(err) => {
                let message = format!("Error processing user {}: {err}", user.user_id);
                log::error!("[reconcile_all_histories] {message}");

                summary.errors += 1;
                if summary.error_messages.len() < MAX_ERROR_MESSAGES {
                    summary.error_messages.push(message);
                }
            }
        }
    }

    log::info!(
        "Reconciliation finished: {} users, {} records processed, {} updated, {} errors.",
        summary.total_users, summary.processed, summary.updated, summary.errors
    );

    Ok(summary)
}
