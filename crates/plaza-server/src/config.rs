use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

const STORY_TTL_HOURS: RangeInclusive<i64> = 1..=24 * 365;
const TOKEN_DAYS: RangeInclusive<i64> = 1..=3650;

/// Reads `key` as an integer inside `range`, or `default` when unset.
fn bounded(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
    range: RangeInclusive<i64>,
) -> anyhow::Result<i64> {
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let value: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} '{raw}' is not a whole number"))?;
    if !range.contains(&value) {
        bail!("{key} must be between {} and {}, got {value}", range.start(), range.end());
    }
    Ok(value)
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub story_ttl_hours: i64,
    pub story_sweep_secs: u64,
    pub token_days: i64,
    /// Accounts granted the admin role at startup and on registration.
    pub admin_usernames: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("PLAZA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PLAZA_JWT_SECRET is unset or still a placeholder.");
        }

        let port = match get("PLAZA_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("PLAZA_PORT '{raw}' is not a port"))?,
            None => 3000,
        };

        Ok(Self {
            jwt_secret,
            db_path: get("PLAZA_DB_PATH").unwrap_or_else(|| "plaza.db".into()).into(),
            host: get("PLAZA_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            story_ttl_hours: bounded(&get, "PLAZA_STORY_TTL_HOURS", 24, STORY_TTL_HOURS)?,
            story_sweep_secs: get("PLAZA_STORY_SWEEP_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(300),
            token_days: bounded(&get, "PLAZA_TOKEN_DAYS", 30, TOKEN_DAYS)?,
            admin_usernames: get("PLAZA_ADMIN_USERNAMES")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
