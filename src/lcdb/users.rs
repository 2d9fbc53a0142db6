use crate::{lcdb::{Database, DBResult, UserStore}, models};

/////*============== USER QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::User {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            username: row.get("username")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            last_activity: row.get("last_activity")?,
            timezone: row.get("timezone")?,
        })
    }
}

impl UserStore for Database {
    /// Returns the user with the id: `user_id`, if they exist.
    fn query_user(&self, user_id: &str) -> DBResult<Option<models::User>> {
        self.connect()
            .prepare("SELECT * FROM Users WHERE user_id = :user_id")?
            .query(rusqlite::named_params! { ":user_id": user_id })?
            .next()?
            .map(|row| row.try_into())
            .transpose()
    }

    fn query_users(&self) -> DBResult<Vec<models::User>> {
        log::trace!("[query_users] Querying all users.");
        let mut stmt = self.connect().prepare("SELECT * FROM Users ORDER BY user_id")?;

        let users = stmt
            .query_map([], |row| models::User::try_from(row))?
            .collect::<DBResult<Vec<models::User>>>()?;

        Ok(users)
    }

    fn insert_user(&self, user: &models::User) -> DBResult<bool> {
        log::trace!("[insert_user] Inserting user {} into Users...", user.username);

        let query_params = rusqlite::named_params! {
                ":user_id":        user.user_id,
                ":username":       user.username,
                ":current_streak": user.current_streak,
                ":longest_streak": user.longest_streak,
                ":last_activity":  user.last_activity,
                ":timezone":       user.timezone,
        };

        self.connect()
            .prepare(
                "INSERT INTO Users ( user_id,  username,  current_streak,  longest_streak,
                                     last_activity,  timezone)
                 VALUES            (:user_id, :username, :current_streak, :longest_streak,
                                    :last_activity, :timezone)"
            )?
            .execute(query_params)
            .map_or_else(crate::lcdb::swallow_constraint_violation, |_| Ok(true))
            .inspect(|added| if *added {
                log::info!("User {} has been added to the database.", user.username)
            })
    }

    fn update_streak(&self, user_id: &str, streak: u64, last_activity: Option<i64>)
        -> DBResult<()>
    {
        let query_params = rusqlite::named_params! {
                ":user_id":       user_id,
                ":streak":        streak,
                ":last_activity": last_activity,
        };

        self.connect()
            .prepare(
                "UPDATE Users SET
                    current_streak = :streak,
                    longest_streak = MAX(longest_streak, :streak),
                    last_activity = :last_activity
                 WHERE user_id = :user_id"
            )?
            .execute(query_params)
            .inspect_err(|err| log::error!("[update_streak] Could not update streak for \
                                            '{user_id}': {err}"))?;

        Ok(())
    }

    fn reset_streak(&self, user_id: &str) -> DBResult<()> {
        self.connect()
            .prepare("UPDATE Users SET current_streak = 0, last_activity = NULL \
                      WHERE user_id = :user_id")?
            .execute(rusqlite::named_params! { ":user_id": user_id })?;

        Ok(())
    }

    fn update_timezone(&self, user_id: &str, timezone: &str) -> DBResult<()> {
        log::trace!("[update_timezone] Setting timezone of {user_id} to {timezone}.");

        self.connect()
            .prepare("UPDATE Users SET timezone = :timezone WHERE user_id = :user_id")?
            .execute(rusqlite::named_params! { ":user_id": user_id, ":timezone": timezone })?;

        Ok(())
    }
}
