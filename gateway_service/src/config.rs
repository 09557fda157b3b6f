use anyhow::Context;
use std::env;

/// Configuración del gateway, leída del ambiente (.env en local).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: String,
    /// Ruta al PEM con la llave pública RS256 del emisor de tokens.
    pub jwt_public_key_path: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub payment_service_url: String,
    pub wallet_service_url: String,
    pub auth_service_url: String,
    pub breaker_failure_threshold: u32,
    pub breaker_reset_secs: u64,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_public_key_path =
            env::var("JWT_PUBLIC_KEY_PATH").context("JWT_PUBLIC_KEY_PATH must be set")?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()),
            jwt_public_key_path,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
            jwt_audience: env::var("JWT_AUDIENCE").ok(),
            payment_service_url: env::var("PAYMENT_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3002".to_string()),
            wallet_service_url: env::var("WALLET_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3001".to_string()),
            auth_service_url: env::var("AUTH_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3003".to_string()),
            breaker_failure_threshold: env::var("BREAKER_FAILURE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            breaker_reset_secs: env::var("BREAKER_RESET_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
