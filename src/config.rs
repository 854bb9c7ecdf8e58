use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::evaluator::EvaluatorSettings;

const DEFAULT_DATABASE_URL: &str = "sqlite:database/alerts.db";
const DEFAULT_MARKET_API_URL: &str = "https://api.simcotools.com/v1/realms/0/market/prices";
const DEFAULT_CHECK_SCHEDULE: &str = "0 * * * * *";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub database_url: String,
    pub market_api_url: String,
    /// Cron expression (with seconds) for alert checks.
    pub check_schedule: String,
    pub fetch_timeout: Duration,
    pub send_timeout: Duration,
    pub snapshot_ttl: Duration,
    pub cooldown: Option<Duration>,
    pub admin_chat_ids: HashSet<String>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // dotenvy loads .env, but doesn't override already-set env vars
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let telegram_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let cooldown_secs: u64 = parse_var(&lookup, "ALERT_COOLDOWN_SECS", 0)?;

        let admin_chat_ids = lookup("ADMIN_CHAT_IDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            telegram_token,
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            market_api_url: get("MARKET_API_URL", DEFAULT_MARKET_API_URL),
            check_schedule: get("CHECK_SCHEDULE", DEFAULT_CHECK_SCHEDULE),
            fetch_timeout: Duration::from_secs(parse_var(&lookup, "FETCH_TIMEOUT_SECS", 10)?),
            send_timeout: Duration::from_secs(parse_var(&lookup, "SEND_TIMEOUT_SECS", 10)?),
            snapshot_ttl: Duration::from_secs(parse_var(&lookup, "SNAPSHOT_TTL_SECS", 20)?),
            cooldown: (cooldown_secs > 0).then(|| Duration::from_secs(cooldown_secs)),
            admin_chat_ids,
            log_level: get("RUST_LOG", "info"),
        })
    }

    pub fn evaluator_settings(&self) -> EvaluatorSettings {
        EvaluatorSettings {
            fetch_timeout: self.fetch_timeout,
            send_timeout: self.send_timeout,
            cooldown: self.cooldown,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}
