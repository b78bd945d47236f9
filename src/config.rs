use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Meals are kept in memory when unset.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    /// Zone used for "today" when a request does not send its own offset.
    pub default_tz_offset_minutes: i32,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Unset means UTC. Anything else must parse and be a valid UTC offset.
fn default_tz_offset(raw: Option<&str>) -> anyhow::Result<i32> {
    let Some(raw) = raw else {
        return Ok(0);
    };
    let minutes: i32 = raw
        .trim()
        .parse()
        .with_context(|| format!("DEFAULT_TZ_OFFSET_MINUTES is not an integer: {raw:?}"))?;
    minutes
        .checked_mul(60)
        .and_then(|secs| time::UtcOffset::from_whole_seconds(secs).ok())
        .with_context(|| format!("DEFAULT_TZ_OFFSET_MINUTES out of range: {minutes}"))?;
    Ok(minutes)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: env_or("JWT_ISSUER", "snapmeal"),
            audience: env_or("JWT_AUDIENCE", "snapmeal-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
        };
        let storage = StorageConfig {
            endpoint: env_or("S3_ENDPOINT", "http://localhost:9000"),
            bucket: env_or("S3_BUCKET", "meal-photos"),
            access_key: env_or("S3_ACCESS_KEY", "minioadmin"),
            secret_key: env_or("S3_SECRET_KEY", "minioadmin"),
            region: env_or("S3_REGION", "us-east-1"),
            url_ttl_secs: env_parse("PHOTO_URL_TTL_SECS", 30 * 60),
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
            default_tz_offset_minutes: default_tz_offset(
                std::env::var("DEFAULT_TZ_OFFSET_MINUTES")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .as_deref(),
            )?,
        })
    }
}
