use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};

pub const DEFAULT_API_URL: &str = "https://leetcode.com/graphql";

#[derive(Debug, Clone)]
pub struct Config {
    /// GraphQL endpoint of the submission source.
    pub api_url: String,
    pub database_path: String,
    /// How many recent accepted submissions to fetch per user update.
    pub fetch_limit: usize,
    pub fetch_timeout: Duration,
    pub update_interval_hours: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::from(DEFAULT_API_URL),
            database_path: String::from("leek.db"),
            fetch_limit: 20,
            fetch_timeout: Duration::from_secs(10),
            update_interval_hours: 3,
        }
    }
}

impl Config {
    /// Loads configuration from the environment (and `.env`, if the caller loaded it).
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let update_interval_hours: u32 =
            try_load("UPDATE_INTERVAL_HOURS", defaults.update_interval_hours)?;
        if update_interval_hours == 0 || update_interval_hours > 24 {
            return Err(anyhow!(
                "UPDATE_INTERVAL_HOURS must be between 1 and 24, got {update_interval_hours}"
            ));
        }

        Ok(Self {
            api_url: try_load("API_URL", defaults.api_url)?,
            database_path: try_load("DATABASE_PATH", defaults.database_path)?,
            fetch_limit: try_load("FETCH_LIMIT", defaults.fetch_limit)?,
            fetch_timeout: Duration::from_secs(
                try_load("FETCH_TIMEOUT_SECS", defaults.fetch_timeout.as_secs())?,
            ),
            update_interval_hours,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("Invalid value for {key}: '{value}'")),
        Err(_) => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_load_falls_back_to_default() {
        let limit: usize = try_load("LEEKSTREAK_TEST_UNSET_KEY", 20).unwrap();
        assert_eq!(limit, 20);
    }

    #[test]
    fn defaults_match_the_leetcode_endpoint() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.fetch_limit, 20);
        assert_eq!(config.update_interval_hours, 3);
    }
}
