pub const USER_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Users (
        user_id        TEXT        PRIMARY KEY,
        username       TEXT        NOT NULL,

        current_streak INTEGER     NOT NULL    DEFAULT 0,
        longest_streak INTEGER     NOT NULL    DEFAULT 0,
        last_activity  INTEGER,

        timezone       TEXT
    )";

pub const SUBMISSIONS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Submissions (
        user_id        TEXT        NOT NULL    REFERENCES Users(user_id),
        problem_slug   TEXT        NOT NULL,
        problem_name   TEXT        NOT NULL,

        status         TEXT        NOT NULL,
        language       TEXT        NOT NULL,
        timestamp      INTEGER     NOT NULL,

        UNIQUE(user_id, problem_slug)
    )";

pub const STREAK_HISTORY_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS StreakHistory (
        user_id           TEXT        NOT NULL    REFERENCES Users(user_id),
        date              TEXT        NOT NULL,

        problems_solved   INTEGER     NOT NULL,
        first_problem_at  INTEGER     NOT NULL,

        UNIQUE(user_id, date)
    )";
