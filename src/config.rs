use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::domain::Role;

/// Address reserved for the single super-admin identity unless overridden.
pub const DEFAULT_SUPER_ADMIN_EMAIL: &str = "superadmin@knowledge-hub.local";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: IpAddr,
    pub server_port: u16,
    pub environment: Environment,
    pub log_level: String,
    pub frontend_url: String,
    pub super_admin_email: String,
    pub cache_ttl: Duration,
    pub session_timeout: Duration,
    pub auto_approve_users: bool,
    pub default_user_role: Role,
}

/// Deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `DATABASE_URL`
    /// Optional with defaults: `SERVER_HOST`, `SERVER_PORT`, `ENVIRONMENT`, `LOG_LEVEL`,
    /// `FRONTEND_URL`, `SUPER_ADMIN_EMAIL`, `CACHE_TTL_SECS`, `SESSION_TIMEOUT_MINUTES`,
    /// `AUTO_APPROVE_USERS`, `DEFAULT_USER_ROLE`
    ///
    /// `PORT` overrides `SERVER_PORT` and host defaults to `0.0.0.0` in production.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is not set, or if any optional variable holds a
    /// value that cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let environment = match std::env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .as_str()
        {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        };

        let server_port = std::env::var("PORT")
            .or_else(|_| std::env::var("SERVER_PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("SERVER_PORT / PORT must be a valid u16"))?;

        let default_host = if environment == Environment::Production {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        let server_host = std::env::var("SERVER_HOST")
            .unwrap_or_else(|_| default_host.to_string())
            .parse::<IpAddr>()
            .map_err(|_| anyhow::anyhow!("SERVER_HOST must be a valid IP address"))?;

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());

        let super_admin_email = std::env::var("SUPER_ADMIN_EMAIL")
            .unwrap_or_else(|_| DEFAULT_SUPER_ADMIN_EMAIL.to_string())
            .trim()
            .to_lowercase();
        if super_admin_email.is_empty() {
            anyhow::bail!("SUPER_ADMIN_EMAIL must not be empty");
        }

        let cache_ttl_secs = std::env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("CACHE_TTL_SECS must be a number of seconds"))?;

        let session_timeout_minutes = std::env::var("SESSION_TIMEOUT_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("SESSION_TIMEOUT_MINUTES must be a number of minutes"))?;

        let auto_approve_users = match std::env::var("AUTO_APPROVE_USERS") {
            Ok(raw) => parse_flag(&raw)
                .ok_or_else(|| anyhow::anyhow!("AUTO_APPROVE_USERS must be true or false"))?,
            Err(_) => false,
        };

        let default_user_role = match std::env::var("DEFAULT_USER_ROLE") {
            Ok(raw) => parse_default_role(&raw)
                .ok_or_else(|| anyhow::anyhow!("DEFAULT_USER_ROLE must be `user` or `viewer`"))?,
            Err(_) => Role::User,
        };

        Ok(Self {
            database_url,
            server_host,
            server_port,
            environment,
            log_level,
            frontend_url,
            super_admin_email,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            session_timeout: Duration::from_secs(session_timeout_minutes * 60),
            auto_approve_users,
            default_user_role,
        })
    }

    /// Build the socket address for the server to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_host, self.server_port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Only unprivileged roles may be handed out on sign-up.
fn parse_default_role(raw: &str) -> Option<Role> {
    match Role::from_str(raw.trim())? {
        role @ (Role::User | Role::Viewer) => Some(role),
        _ => None,
    }
}
