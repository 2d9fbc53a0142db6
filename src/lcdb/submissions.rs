use std::collections::HashSet;

use itertools::Itertools;

use crate::{lcdb::{Database, DBResult, SubmissionStore}, models};

/////*============== SUBMISSION QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::Submission {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            title: row.get("problem_name")?,
            slug: row.get("problem_slug")?,
            timestamp: row.get("timestamp")?,
            status: row.get("status")?,
            language: row.get("language")?,
        })
    }
}

impl SubmissionStore for Database {
    /// Single round trip regardless of how many slugs are checked.
    fn query_existing_slugs(&self, user_id: &str, slugs: &[String]) -> DBResult<HashSet<String>> {
        if slugs.is_empty() {
            return Ok(HashSet::new());
        }

        log::trace!("[query_existing_slugs] Checking {} slugs for {user_id}...", slugs.len());

        let placeholders = std::iter::repeat_n("?", slugs.len()).join(", ");
        let mut stmt = self.connect().prepare(&format!(
            "SELECT problem_slug FROM Submissions
             WHERE user_id = ? AND problem_slug IN ({placeholders})"
        ))?;

        let query_params = std::iter::once(user_id).chain(slugs.iter().map(String::as_str));
        let existing = stmt
            .query_map(rusqlite::params_from_iter(query_params), |row| row.get(0))?
            .collect::<DBResult<HashSet<String>>>()?;

        Ok(existing)
    }

    fn insert_submission(&self, user_id: &str, submission: &models::Submission) -> DBResult<bool> {
        log::trace!("[insert_submission] Inserting submission for {} into Submissions...",
            submission.title);

        let query_params = rusqlite::named_params! {
                ":user_id":       user_id,
                ":problem_slug":  submission.slug,
                ":problem_name":  submission.title,
                ":status":        submission.status,
                ":language":      submission.language,
                ":timestamp":     submission.timestamp,
        };

        self.connect()
            .prepare(
                "INSERT INTO Submissions
                    ( user_id,  problem_slug,  problem_name,  status,  language,  timestamp)
                VALUES
                    (:user_id, :problem_slug, :problem_name, :status, :language, :timestamp)"
            )?
            .execute(query_params)
            .map_or_else(crate::lcdb::swallow_constraint_violation, |_| Ok(true))
    }

    fn query_accepted_submissions(&self, user_id: &str) -> DBResult<Vec<models::Submission>> {
        let mut stmt = self.connect().prepare(
            "SELECT * FROM Submissions
             WHERE user_id = :user_id AND status = :accepted
             ORDER BY timestamp ASC",
        )?;

        let query_params = rusqlite::named_params! {
                ":user_id":  user_id,
                ":accepted": models::ACCEPTED,
        };

        let submissions = stmt
            .query_map(query_params, |row| {
                models::Submission::try_from(row)
                    .inspect_err(|err|
                        log::error!("[query_accepted_submissions] Could not convert row into \
                                     submission: {err}"))
            })?
            .collect::<DBResult<Vec<models::Submission>>>()?;

        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcdb::UserStore;
    use crate::models::{ACCEPTED, Submission, User};

    fn slugs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn with_users(user_ids: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for user_id in user_ids {
            db.insert_user(&User::new(user_id, user_id, None)).unwrap();
        }
        db
    }

    #[test]
    fn one_submission_per_problem() {
        let db = with_users(&["u1", "u2"]);
        let first = Submission::new("Two Sum", "two-sum", 100, ACCEPTED, "rust");
        let again = Submission::new("Two Sum", "two-sum", 500, ACCEPTED, "python3");

        assert!(db.insert_submission("u1", &first).unwrap());
        assert!(!db.insert_submission("u1", &again).unwrap());
        // Other users are unaffected.
        assert!(db.insert_submission("u2", &again).unwrap());

        assert_eq!(db.query_accepted_submissions("u1").unwrap(), vec![first]);
    }

    #[test]
    fn existing_slugs_are_checked_in_batch() {
        let db = with_users(&["u1", "u2"]);
        db.insert_submission("u1", &Submission::new("Two Sum", "two-sum", 1, ACCEPTED, "rust"))
            .unwrap();
        db.insert_submission("u2", &Submission::new("Add Two Numbers", "", 1, ACCEPTED, "c"))
            .unwrap();

        let existing = db
            .query_existing_slugs("u1", &slugs(&["two-sum", "add-two-numbers", "3sum"]))
            .unwrap();
        assert_eq!(existing, HashSet::from([String::from("two-sum")]));
        assert!(db.query_existing_slugs("u1", &[]).unwrap().is_empty());
    }

    #[test]
    fn accepted_submissions_come_back_oldest_first() {
        let db = with_users(&["u1"]);
        db.insert_submission("u1", &Submission::new("B", "b", 300, ACCEPTED, "rust")).unwrap();
        db.insert_submission("u1", &Submission::new("A", "a", 100, ACCEPTED, "rust")).unwrap();
        db.insert_submission("u1", &Submission::new("C", "c", 200, "Wrong Answer", "rust"))
            .unwrap();

        let order = db
            .query_accepted_submissions("u1")
            .unwrap()
            .into_iter()
            .map(|s| s.slug)
            .collect::<Vec<_>>();
        assert_eq!(order, slugs(&["a", "b"]));
    }
}
