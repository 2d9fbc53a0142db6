use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::sleep;

use crate::lcapi::SubmissionSource;
use crate::streak::StreakService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Every `interval_hours`, on the hour (UTC).
    Periodic,
    /// The last run of the day, at 23:59 UTC. History is reconciled afterwards.
    EndOfDay,
}

/// When the next scheduled run after `now` happens, and which kind it is.
pub fn next_run(now: DateTime<Utc>, interval_hours: u32) -> (DateTime<Utc>, RunKind) {
    let interval = interval_hours.clamp(1, 24);
    let today = now.date_naive();

    let periodic = (0..24)
        .step_by(interval as usize)
        .filter_map(|hour| today.and_hms_opt(hour, 0, 0))
        .map(|at| (at, RunKind::Periodic));
    let end_of_day = today.and_hms_opt(23, 59, 0).map(|at| (at, RunKind::EndOfDay));
    let tomorrow = today
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|at| (at, RunKind::Periodic));

    periodic
        .chain(end_of_day)
        .chain(tomorrow)
        .map(|(at, kind)| (at.and_utc(), kind))
        .filter(|(at, _)| *at > now)
        .min_by_key(|(at, _)| *at)
        .unwrap_or((now + TimeDelta::hours(interval.into()), RunKind::Periodic))
}

/// How long to sleep until the next scheduled run.
pub fn next_run_delay(now: DateTime<Utc>, interval_hours: u32) -> (std::time::Duration, RunKind) {
    let (at, kind) = next_run(now, interval_hours);
    ((at - now).to_std().unwrap_or_default(), kind)
}

/// Updates every user on schedule, forever. Reconciles history after the end-of-day run.
pub async fn run_forever<S: SubmissionSource>(service: &StreakService<S>, interval_hours: u32) {
    loop {
        let (delay, kind) = next_run_delay(Utc::now(), interval_hours);
        log::info!("Next {kind:?} update in {} minutes.", delay.as_secs() / 60);
        sleep(delay).await;

        if let Err(err) = service.update_all_streaks().await {
            log::error!("Scheduled streak update failed: {err}");
        }

        if kind == RunKind::EndOfDay {
            match service.reconcile_all_histories() {
                Ok(summary) => log::info!("Reconciled history: {} records updated, {} errors.",
                    summary.updated, summary.errors),
                Err(err) => log::error!("Scheduled reconciliation failed: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).single().unwrap()
    }

    #[test]
    fn runs_on_interval_boundaries() {
        assert_eq!(next_run(at(10, 1, 30), 3), (at(10, 3, 0), RunKind::Periodic));
        assert_eq!(next_run(at(10, 3, 0), 3), (at(10, 6, 0), RunKind::Periodic));
        assert_eq!(next_run(at(10, 13, 5), 6), (at(10, 18, 0), RunKind::Periodic));
    }

    #[test]
    fn last_run_of_the_day_is_at_23_59() {
        assert_eq!(next_run(at(10, 22, 0), 3), (at(10, 23, 59), RunKind::EndOfDay));
        assert_eq!(next_run(at(10, 23, 59), 3), (at(11, 0, 0), RunKind::Periodic));
    }

    #[test]
    fn delay_matches_the_next_run() {
        let (delay, kind) = next_run_delay(at(10, 2, 0), 3);
        assert_eq!(delay, std::time::Duration::from_secs(3600));
        assert_eq!(kind, RunKind::Periodic);
    }
}
