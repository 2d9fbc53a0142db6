use chrono::NaiveDate;

use crate::{lcdb::{Database, DBResult, HistoryStore}, models};

/////*============== STREAK HISTORY QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::StreakHistory {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            date: row.get("date")?,
            problems_solved: row.get("problems_solved")?,
            first_problem_at: row.get("first_problem_at")?,
        })
    }
}

impl HistoryStore for Database {
    /// Creates the day's record, or overwrites its counters if it already exists.
    fn upsert_history(&self, record: &models::StreakHistory) -> DBResult<()> {
        log::trace!("[upsert_history] {} solved {} on {}",
            record.user_id, record.problems_solved, record.date);

        let query_params = rusqlite::named_params! {
                ":user_id":          record.user_id,
                ":date":             record.date,
                ":problems_solved":  record.problems_solved,
                ":first_problem_at": record.first_problem_at,
        };

        self.connect()
            .prepare(
                "INSERT INTO StreakHistory ( user_id,  date,  problems_solved,  first_problem_at)
                 VALUES                    (:user_id, :date, :problems_solved, :first_problem_at)
                 ON CONFLICT(user_id, date) DO UPDATE SET
                    problems_solved = excluded.problems_solved,
                    first_problem_at = excluded.first_problem_at"
            )?
            .execute(query_params)
            .inspect_err(|err| log::error!("[upsert_history] Could not upsert history for \
                                            '{}': {err}", record.user_id))?;

        Ok(())
    }

    fn query_history(&self, user_id: &str, date: NaiveDate)
        -> DBResult<Option<models::StreakHistory>>
    {
        self.connect()
            .prepare("SELECT * FROM StreakHistory WHERE user_id = :user_id AND date = :date")?
            .query(rusqlite::named_params! { ":user_id": user_id, ":date": date })?
            .next()?
            .map(|row| row.try_into())
            .transpose()
    }

    fn query_latest_history(&self, user_id: &str) -> DBResult<Option<models::StreakHistory>> {
        self.connect()
            .prepare("SELECT * FROM StreakHistory WHERE user_id = :user_id \
                      ORDER BY date DESC LIMIT 1")?
            .query(rusqlite::named_params! { ":user_id": user_id })?
            .next()?
            .map(|row| row.try_into())
            .transpose()
    }
}
