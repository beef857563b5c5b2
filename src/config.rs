use std::env;

use anyhow::{Context, bail};
use chrono::{FixedOffset, Offset, Utc, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Withdrawal window: closed all day on `rest_day` and from `cutoff_hour` until midnight.
#[derive(Debug, Clone)]
pub struct WithdrawalPolicy {
    pub min_amount: i64,
    pub rest_day: Weekday,
    pub cutoff_hour: u32,
    pub utc_offset: FixedOffset,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            min_amount: 100,
            rest_day: Weekday::Sun,
            cutoff_hour: 20,
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin_phone: Option<String>,
    pub upload_dir: String,
    pub public_base_url: String,
    pub notification_buffer: usize,
    pub withdrawal: WithdrawalPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => bail!("unknown STORE_BACKEND `{other}`"),
        };
        let database_url = env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required for the postgres backend");
        }
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let defaults = WithdrawalPolicy::default();
        let rest_day = match env::var("WITHDRAWAL_REST_DAY") {
            Ok(day) => day
                .parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("invalid WITHDRAWAL_REST_DAY `{day}`"))?,
            Err(_) => defaults.rest_day,
        };
        let offset_hours: i32 = parse_or("SERVICE_UTC_OFFSET_HOURS", 0);
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .context("SERVICE_UTC_OFFSET_HOURS out of range")?;

        Ok(Self {
            backend,
            database_url,
            host,
            port,
            jwt_secret,
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", 24),
            admin_phone: env::var("ADMIN_PHONE").ok().filter(|p| !p.trim().is_empty()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            public_base_url,
            notification_buffer: parse_or("NOTIFICATION_BUFFER", 64),
            withdrawal: WithdrawalPolicy {
                min_amount: parse_or("WITHDRAWAL_MIN_AMOUNT", defaults.min_amount),
                rest_day,
                cutoff_hour: parse_or("WITHDRAWAL_CUTOFF_HOUR", defaults.cutoff_hour),
                utc_offset,
            },
        })
    }

    /// Configuration for tests and local runs against the in-memory store.
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: jwt_secret.into(),
            token_ttl_hours: 24,
            admin_phone: None,
            upload_dir: "uploads".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            notification_buffer: 64,
            withdrawal: WithdrawalPolicy::default(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
