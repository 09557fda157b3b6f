use anyhow::Context;
use std::env;

/// Configuración del Wallet Service, leída del ambiente (.env en local).
#[derive(Debug, Clone)]
pub struct WalletServiceConfig {
    pub host: String,
    pub port: String,
    pub database_url: String,
    pub max_connections: u32,
}

impl WalletServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "3001".to_string()),
            database_url,
            max_connections,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
