//! # Configuration
//!
//! Environment-driven configuration, loaded once at startup. A `.env` file is
//! honored via dotenvy in the bin entrypoint before `from_env` runs.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use anyhow::{Context as _, Result};
use std::time::Duration;

/// Default poll interval for the reminder scheduler, in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Runtime configuration for the bot process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (required).
    pub discord_token: String,
    /// Path to the SQLite database file.
    pub database_path: String,
    /// How often the scheduler polls for due reminders.
    pub poll_interval: Duration,
    /// Default log filter when RUST_LOG is not set.
    pub log_level: String,
}

impl Config {
    /// Build configuration from environment variables.
    ///
    /// * `DISCORD_TOKEN` - required
    /// * `DATABASE_PATH` - default `reminders.db`
    /// * `REMINDER_POLL_INTERVAL` - seconds, default 30
    /// * `LOG_LEVEL` - default `info`
    pub fn from_env() -> Result<Self> {
        let discord_token =
            std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "reminders.db".to_string());

        let poll_interval = match std::env::var("REMINDER_POLL_INTERVAL") {
            Ok(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("invalid REMINDER_POLL_INTERVAL: {raw}"))?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            discord_token,
            database_path,
            poll_interval,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // All env manipulation happens in this single test to avoid races between
    // parallel test threads sharing the process environment.
    #[test]
    fn test_from_env_defaults_and_overrides() {
        std::env::set_var("DISCORD_TOKEN", "test-token");
        std::env::remove_var("DATABASE_PATH");
        std::env::remove_var("REMINDER_POLL_INTERVAL");
        std::env::remove_var("LOG_LEVEL");

        let config = Config::from_env().unwrap();
        assert_eq!(config.discord_token, "test-token");
        assert_eq!(config.database_path, "reminders.db");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.log_level, "info");

        std::env::set_var("DATABASE_PATH", "/tmp/test.db");
        std::env::set_var("REMINDER_POLL_INTERVAL", "5");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database_path, "/tmp/test.db");
        assert_eq!(config.poll_interval, Duration::from_secs(5));

        std::env::set_var("REMINDER_POLL_INTERVAL", "not-a-number");
        assert!(Config::from_env().is_err());

        std::env::remove_var("REMINDER_POLL_INTERVAL");
        std::env::remove_var("DATABASE_PATH");
        std::env::remove_var("DISCORD_TOKEN");
        assert!(Config::from_env().is_err());
    }
}
