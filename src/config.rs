use serde::Deserialize;

/// Token-signing settings. Issuer, audience and TTL have serviceable
/// defaults; the secret must come from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl JwtConfig {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "goaltrack"),
            audience: env_or("JWT_AUDIENCE", "goaltrack-users"),
            ttl_minutes: parse_env_or("JWT_TTL_MINUTES", 60),
        })
    }
}

/// Everything the process reads from the environment, gathered once at
/// startup. Listen host/port are resolved at serve time instead.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            jwt: JwtConfig::from_env()?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_env_or(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}
