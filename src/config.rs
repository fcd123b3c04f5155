use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND: {other}"),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Empty for the memory backend.
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

// The URL carries credentials, keep it out of logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let backend: StoreBackend = var_or("STORE_BACKEND", "postgres").parse()?;
        let url = match backend {
            StoreBackend::Postgres => database_url(&lookup)?,
            StoreBackend::Memory => String::new(),
        };

        let secret = lookup("ACCESS_TOKEN_SECRET").unwrap_or_default();
        if secret.is_empty() {
            bail!("ACCESS_TOKEN_SECRET must be set");
        }

        Ok(Self {
            server: ServerConfig {
                port: var_or("PORT", "5000").parse().context("PORT must be a port number")?,
                host: var_or("HOST", "0.0.0.0"),
                cors_allowed_origins: var_or("ALLOWED_ORIGINS", "http://localhost:5173")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                backend,
                url,
                max_connections: var_or("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("DB_MAX_CONNECTIONS must be an integer")?,
                min_connections: var_or("DB_MIN_CONNECTIONS", "1")
                    .parse()
                    .context("DB_MIN_CONNECTIONS must be an integer")?,
            },
            auth: AuthConfig { secret },
        })
    }
}

fn database_url<F>(lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
        return Ok(url);
    }

    match (lookup("DB_USER"), lookup("DB_PASS")) {
        (Some(user), Some(pass)) => {
            let host = lookup("DB_HOST").unwrap_or_else(|| "localhost:5432".to_string());
            let name = lookup("DB_NAME").unwrap_or_else(|| "car_doctor".to_string());
            Ok(format!("postgres://{user}:{pass}@{host}/{name}"))
        }
        _ => bail!("DATABASE_URL or DB_USER and DB_PASS must be set"),
    }
}
