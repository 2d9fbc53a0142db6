use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreakError {
    #[error("User with id {0} not found")]
    UserNotFound(String),

    #[error("Unrecognized timezone '{0}'")]
    InvalidTimezone(String),

    #[error("Submission source unavailable: {0:#}")]
    Upstream(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type StreakResult<T> = Result<T, StreakError>;
