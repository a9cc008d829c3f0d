use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use natter_bot::BotConfig;
use natter_bot::openai::DEFAULT_BASE_URL;
use natter_bot::responder::{DEFAULT_BOT_USERNAME, DEFAULT_MODEL, DEFAULT_PREAMBLE};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub bot: BotConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = var("NATTER_PORT", "3000")
            .parse()
            .context("NATTER_PORT must be a port number")?;
        let timeout_secs: u64 = var("NATTER_BOT_TIMEOUT_SECS", "30")
            .parse()
            .context("NATTER_BOT_TIMEOUT_SECS must be a whole number of seconds")?;
        let max_history_turns = var("NATTER_BOT_MAX_TURNS", "40")
            .parse()
            .context("NATTER_BOT_MAX_TURNS must be a whole number")?;

        Ok(Self {
            host: var("NATTER_HOST", "0.0.0.0"),
            port,
            db_path: var("NATTER_DB_PATH", "natter.db").into(),
            openai_api_key: var("OPENAI_API_KEY", ""),
            openai_base_url: var("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            bot: BotConfig {
                username: var("NATTER_BOT_USERNAME", DEFAULT_BOT_USERNAME),
                model: var("NATTER_BOT_MODEL", DEFAULT_MODEL),
                preamble: DEFAULT_PREAMBLE.to_string(),
                timeout: Duration::from_secs(timeout_secs),
                max_history_turns,
            },
        })
    }
}
