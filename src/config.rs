use std::str::FromStr;

use serde::Deserialize;

/// Deployment mode. Controls error verbosity and request logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("unknown APP_ENV: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: Environment,
    pub host: String,
    pub port: u16,
    /// Base URL embedded in outbound links (password reset emails).
    pub public_base_url: String,
    pub database_url: String,
    pub body_limit_bytes: usize,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".into())
            .parse::<Environment>()?;
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));
        let database_url = std::env::var("DATABASE_URL")?;
        let body_limit_bytes = std::env::var("BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10 * 1024);

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            expires_in_days: std::env::var("JWT_EXPIRES_IN_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(90),
        };

        let rate_limit = RateLimitConfig {
            max_requests: std::env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(100),
            window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(3600),
        };

        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(2525),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Tourista <no-reply@tourista.dev>".into()),
        };

        Ok(Self {
            env,
            host,
            port,
            public_base_url,
            database_url,
            body_limit_bytes,
            jwt,
            rate_limit,
            smtp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_known_values() {
        assert_eq!(
            "development".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert_eq!(
            "Production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
    }
}
