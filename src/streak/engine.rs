//! Turns a batch of accepted submissions into streak state and per-day history.
//!
//! The engine only sees what it is handed: prior state comes in through [`EngineState`],
//! novelty is decided by the [`SubmissionStore`] it is given, and every touched day is written
//! through the [`HistoryStore`]. Days are processed strictly in order, since each day's outcome
//! depends on the ones before it.

use chrono_tz::Tz;
use itertools::Itertools;

use crate::lcdb::{DBResult, HistoryStore, SubmissionStore};
use crate::lctime;
use crate::models;

/// Streak state carried into a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineState {
    pub streak: u64,
    /// Unix seconds of the last accepted submission already processed.
    pub last_processed: Option<i64>,
    /// Problems counted so far on the day of `last_processed`.
    pub problems_today: u64,
    /// Unix seconds at which the segment in progress started.
    pub segment_start: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub streak: u64,
    pub last_processed: Option<i64>,
    /// One record per local day touched, in day order.
    pub history: Vec<models::StreakHistory>,
}

/// Processes `submissions` for `user_id` on top of `state`.
///
/// Only accepted submissions newer than `state.last_processed` count. A day with at least one
/// problem the user has never solved before extends, starts, or restarts the streak; problems
/// already recorded in `novelty` only add to the day's count. New problems are recorded in
/// `novelty` as they are processed.
///
/// With nothing to process, `state` comes back unchanged and nothing is written.
pub fn process_submissions<S, H>(
    novelty: &S,
    history: &H,
    user_id: &str,
    tz: Tz,
    state: EngineState,
    submissions: &[models::Submission],
) -> DBResult<EngineOutcome>
where
    S: SubmissionStore + ?Sized,
    H: HistoryStore + ?Sized,
{
    let mut pending = submissions
        .iter()
        .filter(|sub| sub.is_accepted())
        .filter(|sub| state.last_processed.is_none_or(|last| sub.timestamp > last))
        .collect::<Vec<_>>();
    pending.sort_by_key(|sub| sub.timestamp);

    if pending.is_empty() {
        log::trace!("[process_submissions] Nothing new for {user_id}.");
        return Ok(EngineOutcome {
            streak: state.streak,
            last_processed: state.last_processed,
            history: Vec::new(),
        });
    }

    let slugs = pending.iter().map(|sub| sub.slug.clone()).unique().collect::<Vec<_>>();
    let mut recorded = novelty.query_existing_slugs(user_id, &slugs)?;

    let mut streak = state.streak;
    let mut last_processed = state.last_processed;
    let mut last_active = state.last_processed;
    let mut problems_today = state.problems_today;
    let mut segment_start = state.segment_start;
    let mut touched = Vec::new();

    let days = pending.into_iter().chunk_by(|sub| lctime::local_date(sub.timestamp, tz));
    for (date, day) in &days {
        let day = day.collect::<Vec<_>>();
        let (Some(first), Some(last)) = (day.first(), day.last()) else { continue };

        if last_processed.is_none_or(|prev| !lctime::is_same_day(first.timestamp, prev, tz)) {
            last_active = last_processed;
            problems_today = 0;
            segment_start = Some(first.timestamp);
        }

        problems_today += day.len() as u64;

        let novel = day
            .iter()
            .copied()
            .filter(|sub| !recorded.contains(&sub.slug))
            .unique_by(|sub| sub.slug.clone())
            .collect::<Vec<_>>();

        if !novel.is_empty() {
            streak = match last_active {
                _ if streak == 0 => 1,
                Some(prev) if lctime::is_next_day(first.timestamp, prev, tz) => streak + 1,
                Some(prev) if lctime::is_same_day(first.timestamp, prev, tz) => streak,
                _ => {
                    log::debug!("[process_submissions] {user_id}'s streak of {streak} broke \
                                 before {date}.");
                    1
                }
            };
        }

        for sub in novel {
            novelty.insert_submission(user_id, sub)?;
            recorded.insert(sub.slug.clone());
        }

        last_processed = Some(last.timestamp);

        let record = models::StreakHistory {
            user_id: user_id.to_string(),
            date,
            problems_solved: problems_today,
            first_problem_at: segment_start.unwrap_or(first.timestamp),
        };
        history.upsert_history(&record)?;
        touched.push(record);
    }

    Ok(EngineOutcome { streak, last_processed, history: touched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcdb::memory::MemoryStore;
    use crate::models::{ACCEPTED, Submission};
    use chrono::NaiveDate;

    const HOUR: i64 = 3600;
    const DAY: i64 = 24 * HOUR;
    // 2025-03-10T09:00:00Z, a Monday.
    const MONDAY: i64 = 1_741_597_200;

    fn accepted(slug: &str, timestamp: i64) -> Submission {
        Submission::new(slug, slug, timestamp, ACCEPTED, "rust")
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    /// A user with a 3-day streak whose last solve was `two-sum` on Monday.
    fn monday_streak() -> (MemoryStore, EngineState) {
        let store = MemoryStore::new();
        store.insert_submission("u1", &accepted("two-sum", MONDAY)).unwrap();
        let state = EngineState {
            streak: 3,
            last_processed: Some(MONDAY),
            problems_today: 1,
            segment_start: Some(MONDAY - 2 * DAY),
        };
        (store, state)
    }

    fn run(store: &MemoryStore, state: EngineState, subs: &[Submission]) -> EngineOutcome {
        process_submissions(store, store, "u1", Tz::UTC, state, subs).unwrap()
    }

    /// The state the next run would start from, as the orchestrator derives it.
    fn carry(outcome: &EngineOutcome) -> EngineState {
        let latest = outcome.history.last().unwrap();
        EngineState {
            streak: outcome.streak,
            last_processed: outcome.last_processed,
            problems_today: latest.problems_solved,
            segment_start: Some(latest.first_problem_at),
        }
    }

    #[test]
    fn next_day_extends_and_same_day_accumulates() {
        let (store, state) = monday_streak();

        let tuesday = run(&store, state, &[accepted("3sum", MONDAY + DAY)]);
        assert_eq!(tuesday.streak, 4);
        assert_eq!(tuesday.history.len(), 1);
        assert_eq!(tuesday.history[0].date, date(11));
        assert_eq!(tuesday.history[0].problems_solved, 1);

        let later = run(&store, carry(&tuesday), &[accepted("4sum", MONDAY + DAY + 5 * HOUR)]);
        assert_eq!(later.streak, 4);
        assert_eq!(later.history[0].date, date(11));
        assert_eq!(later.history[0].problems_solved, 2);
        assert_eq!(later.history[0].first_problem_at, MONDAY + DAY);
        assert_eq!(store.query_history("u1", date(11)).unwrap().unwrap().problems_solved, 2);
    }

    #[test]
    fn two_day_gap_resets_to_one() {
        let (store, state) = monday_streak();

        let thursday = run(&store, state, &[accepted("3sum", MONDAY + 3 * DAY)]);
        assert_eq!(thursday.streak, 1);
        assert_eq!(thursday.history[0].date, date(13));
        assert_eq!(thursday.history[0].problems_solved, 1);
        assert_eq!(thursday.history[0].first_problem_at, MONDAY + 3 * DAY);
    }

    #[test]
    fn day_after_next_resets_within_one_batch() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            EngineState::default(),
            &[accepted("a", MONDAY), accepted("b", MONDAY + 2 * DAY)],
        );
        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.history.len(), 2);
    }

    #[test]
    fn consecutive_days_add_exactly_one_each() {
        let store = MemoryStore::new();
        let mut state = EngineState::default();

        for (i, slug) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            let day = MONDAY + i as i64 * DAY;
            // Several new problems on one day still only count the day once.
            let outcome = run(&store, state, &[
                accepted(slug, day),
                accepted(&format!("{slug}-2"), day + HOUR),
            ]);
            assert_eq!(outcome.streak, i as u64 + 1);
            state = carry(&outcome);
        }
    }

    #[test]
    fn first_solve_starts_at_one() {
        let store = MemoryStore::new();
        let outcome = run(&store, EngineState::default(), &[accepted("two-sum", MONDAY)]);

        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.last_processed, Some(MONDAY));
        assert!(store.query_existing_slugs("u1", &[String::from("two-sum")]).unwrap()
            .contains("two-sum"));
    }

    #[test]
    fn repeats_count_in_history_but_not_in_streak() {
        let (store, state) = monday_streak();

        // Tuesday only re-solves Monday's problem.
        let outcome = run(&store, state, &[accepted("two-sum", MONDAY + DAY)]);
        assert_eq!(outcome.streak, 3);
        assert_eq!(outcome.history[0].problems_solved, 1);
        assert_eq!(outcome.last_processed, Some(MONDAY + DAY));
    }

    #[test]
    fn same_problem_on_two_days_is_novel_once() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            EngineState::default(),
            &[accepted("a", MONDAY), accepted("a", MONDAY + 2 * DAY)],
        );

        // The Wednesday repeat neither resets nor extends Monday's streak.
        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history[1].problems_solved, 1);
        assert_eq!(store.query_accepted_submissions("u1").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_slug_in_one_day_is_recorded_once() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            EngineState::default(),
            &[accepted("a", MONDAY), accepted("a", MONDAY + HOUR)],
        );

        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.history[0].problems_solved, 2);
        assert_eq!(store.query_accepted_submissions("u1").unwrap().len(), 1);
    }

    #[test]
    fn rerun_without_new_submissions_is_a_no_op() {
        let (store, state) = monday_streak();
        let subs = [accepted("3sum", MONDAY + DAY), accepted("4sum", MONDAY + DAY + HOUR)];

        let first = run(&store, state, &subs);
        let before = store.history();

        let second = run(&store, carry(&first), &subs);
        assert_eq!(second.streak, first.streak);
        assert_eq!(second.last_processed, first.last_processed);
        assert!(second.history.is_empty());
        assert_eq!(store.history(), before);
    }

    #[test]
    fn ignores_rejected_and_already_processed_submissions() {
        let (store, state) = monday_streak();
        let subs = [
            Submission::new("Wrong", "wrong", MONDAY + DAY, "Wrong Answer", "rust"),
            accepted("old", MONDAY - HOUR),
            accepted("same-instant", MONDAY),
        ];

        let outcome = run(&store, state, &subs);
        assert_eq!(outcome.streak, state.streak);
        assert_eq!(outcome.last_processed, state.last_processed);
        assert!(store.history().is_empty());
    }

    #[test]
    fn unsorted_input_is_processed_chronologically() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            EngineState::default(),
            &[accepted("c", MONDAY + 2 * DAY), accepted("a", MONDAY), accepted("b", MONDAY + DAY)],
        );

        assert_eq!(outcome.streak, 3);
        assert_eq!(outcome.last_processed, Some(MONDAY + 2 * DAY));
        let dates = outcome.history.iter().map(|h| h.date).collect::<Vec<_>>();
        assert_eq!(dates, vec![date(10), date(11), date(12)]);
    }

    #[test]
    fn days_are_bucketed_in_the_users_zone() {
        let store = MemoryStore::new();
        // 09:00Z Monday and 03:00Z Tuesday are both Monday in Lima (UTC-5).
        let subs = [accepted("a", MONDAY), accepted("b", MONDAY + 18 * HOUR)];
        let outcome = process_submissions(
            &store, &store, "u1", Tz::America__Lima, EngineState::default(), &subs,
        ).unwrap();

        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].date, date(10));
        assert_eq!(outcome.history[0].problems_solved, 2);
    }
}
