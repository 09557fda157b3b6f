use crate::infrastructure::providers::mock_provider::{MockProviderConfig, TokenBehavior};
use anyhow::Context;
use std::collections::HashMap;
use std::env;

/// Configuración del Payment Service, leída del ambiente (.env en local).
#[derive(Debug, Clone)]
pub struct PaymentServiceConfig {
    pub host: String,
    pub port: String,
    pub database_url: String,
    pub max_connections: u32,
    /// URL base del Wallet Service; sin ella se usa el gateway fake.
    pub wallet_service_url: Option<String>,
    pub provider: MockProviderConfig,
    /// Intervalo del job de conciliación.
    pub reconcile_interval_secs: u64,
    /// Antigüedad mínima de una reserva PENDING para conciliarla.
    pub stale_after_minutes: i64,
}

impl PaymentServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let parse_or = |key: &str, default: f64| {
            env::var(key)
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(default)
        };
        let parse_u64 = |key: &str, default: u64| {
            env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        // Tokens de prueba adicionales, opcionales, como JSON:
        // {"tok_custom": {"Fail": "CARD_DECLINED"}}
        let mut test_token_outcomes = MockProviderConfig::default_tokens();
        if let Ok(raw) = env::var("PROVIDER_TEST_TOKEN_OUTCOMES") {
            let extra: HashMap<String, TokenBehavior> =
                serde_json::from_str(&raw).context("PROVIDER_TEST_TOKEN_OUTCOMES is not valid")?;
            test_token_outcomes.extend(extra);
        }

        let provider = MockProviderConfig {
            success_rate: parse_or("PROVIDER_SUCCESS_RATE", 0.9).clamp(0.0, 1.0),
            min_latency_ms: parse_u64("PROVIDER_MIN_LATENCY_MS", 50),
            max_latency_ms: parse_u64("PROVIDER_MAX_LATENCY_MS", 200),
            test_token_outcomes,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "3002".to_string()),
            database_url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            wallet_service_url: env::var("WALLET_SERVICE_URL").ok(),
            provider,
            reconcile_interval_secs: parse_u64("RECONCILE_INTERVAL_SECS", 60),
            stale_after_minutes: env::var("RECONCILE_STALE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
