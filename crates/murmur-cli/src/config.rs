use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_DB_PATH: &str = "murmur.db";
const DEFAULT_POLL_MS: u64 = 500;

/// Runtime settings, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: PathBuf,
    /// Tag stamped on every message sent from this client.
    pub platform: String,
    pub poll_interval: Duration,
    /// Skips the name prompt when set.
    pub name: Option<String>,
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("MURMUR_DB_PATH")
            .unwrap_or_else(|| DEFAULT_DB_PATH.into())
            .into();
        let platform = lookup("MURMUR_PLATFORM").unwrap_or_else(|| std::env::consts::OS.into());
        let poll_ms = match lookup("MURMUR_POLL_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("MURMUR_POLL_MS must be a number of milliseconds, got '{}'", raw))?,
            None => DEFAULT_POLL_MS,
        };
        let name = lookup("MURMUR_NAME").filter(|name| !name.is_empty());

        Ok(Self {
            db_path,
            platform,
            poll_interval: Duration::from_millis(poll_ms.max(1)),
            name,
        })
    }
}
