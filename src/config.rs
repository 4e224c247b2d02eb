//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::error::{Result, ServerError};

/// Longest accepted token lifetime (ten years)
const MAX_TOKEN_TTL_MINUTES: u64 = 10 * 365 * 24 * 60;

/// Runtime settings for the portal server.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub token_ttl: Duration,
    pub upload_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    /// Roll number and password of an admin account created at startup when absent.
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    /// Build the configuration from environment variables, applying defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "mysql://{}:{}@{}/{}",
                get("DB_USER", "app_user"),
                get("DB_PASSWORD", "password"),
                get("DB_HOST", "localhost"),
                get("DB_NAME", "lost_found_portal"),
            ),
        };

        let algorithm = parse_algorithm(&get("ALGORITHM", "HS256"))?;

        let minutes: u64 = get("ACCESS_TOKEN_EXPIRE_MINUTES", "60")
            .parse()
            .ok()
            .filter(|m| *m <= MAX_TOKEN_TTL_MINUTES)
            .ok_or_else(|| invalid("ACCESS_TOKEN_EXPIRE_MINUTES"))?;

        let bind_addr = get("BIND_ADDR", "127.0.0.1:8000")
            .parse()
            .map_err(|_| invalid("BIND_ADDR"))?;

        let bootstrap_admin = match (lookup("ADMIN_ROLL_NUMBER"), lookup("ADMIN_PASSWORD")) {
            (Some(roll), Some(password)) if !roll.trim().is_empty() => {
                Some((roll.trim().to_string(), password))
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            secret_key: get("SECRET_KEY", "secret"),
            algorithm,
            token_ttl: Duration::from_secs(minutes * 60),
            upload_dir: PathBuf::from(get("UPLOAD_DIR", "./uploads")),
            bind_addr,
            cors_origin: get("CORS_ORIGIN", "http://localhost:3000"),
            bootstrap_admin,
        })
    }
}

/// Only HMAC algorithms work with a shared secret.
fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(invalid("ALGORITHM")),
    }
}

fn invalid(key: &str) -> ServerError {
    ServerError::Validation(format!("Invalid value for {}", key))
}
