use crate::domain::provider::{
    ChargeOutcome, ChargeRequest, PaymentProvider, ProviderError, ProviderFailureCode,
};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const PROVIDER_NAME: &str = "MOCK";

/// Comportamiento determinista asociado a un token de prueba.
///
/// Las tres clases reintentables se levantan como excepción de canal en
/// lugar de regresar un outcome FAILED: así los tests ejercitan ambas rutas
/// de la política de reintentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenBehavior {
    Succeed,
    Pend,
    Fail(ProviderFailureCode),
    Raise(ProviderFailureCode),
}

/// Configuración del proveedor simulado.
#[derive(Debug, Clone)]
pub struct MockProviderConfig {
    /// Probabilidad de éxito para tokens sin comportamiento asignado.
    pub success_rate: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub test_token_outcomes: HashMap<String, TokenBehavior>,
}

impl MockProviderConfig {
    /// Tabla de tokens de prueba con la que arranca el proveedor.
    pub fn default_tokens() -> HashMap<String, TokenBehavior> {
        HashMap::from([
            ("tok_visa_success".to_string(), TokenBehavior::Succeed),
            ("tok_pending".to_string(), TokenBehavior::Pend),
            (
                "tok_card_declined".to_string(),
                TokenBehavior::Fail(ProviderFailureCode::CARD_DECLINED),
            ),
            (
                "tok_insufficient_funds".to_string(),
                TokenBehavior::Fail(ProviderFailureCode::INSUFFICIENT_FUNDS),
            ),
            (
                "tok_expired_card".to_string(),
                TokenBehavior::Fail(ProviderFailureCode::EXPIRED_CARD),
            ),
            (
                "tok_invalid_card".to_string(),
                TokenBehavior::Fail(ProviderFailureCode::INVALID_CARD),
            ),
            (
                "tok_fraud_suspected".to_string(),
                TokenBehavior::Fail(ProviderFailureCode::FRAUD_SUSPECTED),
            ),
            (
                "tok_network_error".to_string(),
                TokenBehavior::Raise(ProviderFailureCode::NETWORK_ERROR),
            ),
            (
                "tok_provider_unavailable".to_string(),
                TokenBehavior::Raise(ProviderFailureCode::PROVIDER_UNAVAILABLE),
            ),
            (
                "tok_rate_limited".to_string(),
                TokenBehavior::Raise(ProviderFailureCode::RATE_LIMITED),
            ),
        ])
    }
}

impl Default for MockProviderConfig {
    fn default() -> Self {
        Self {
            success_rate: 0.9,
            min_latency_ms: 50,
            max_latency_ms: 200,
            test_token_outcomes: Self::default_tokens(),
        }
    }
}

/// Proveedor de pagos simulado con latencia y resultados configurables.
///
/// Todos los outcomes con valor quedan registrados por id de transacción
/// del proveedor, de modo que `transaction_status` los reproduzca igual que
/// lo haría un proveedor real.
pub struct MockPaymentProvider {
    config: MockProviderConfig,
    outcomes: RwLock<HashMap<String, ChargeOutcome>>,
}

impl MockPaymentProvider {
    pub fn new(config: MockProviderConfig) -> Self {
        Self {
            config,
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    fn next_transaction_id() -> String {
        format!("mock_{}", Uuid::new_v4())
    }

    async fn simulate_latency(&self) {
        let (min, max) = (self.config.min_latency_ms, self.config.max_latency_ms);
        if max == 0 {
            return;
        }
        // El RNG se suelta antes del await.
        let millis = {
            let mut rng = rand::rng();
            rng.random_range(min..=max.max(min))
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Reparto de fallos para tokens sin comportamiento fijo:
    /// CARD_DECLINED 40%, INSUFFICIENT_FUNDS 20%, NETWORK_ERROR 20%,
    /// PROVIDER_UNAVAILABLE 20%.
    fn roll_failure_code() -> ProviderFailureCode {
        let roll: f64 = rand::rng().random();
        if roll < 0.4 {
            ProviderFailureCode::CARD_DECLINED
        } else if roll < 0.6 {
            ProviderFailureCode::INSUFFICIENT_FUNDS
        } else if roll < 0.8 {
            ProviderFailureCode::NETWORK_ERROR
        } else {
            ProviderFailureCode::PROVIDER_UNAVAILABLE
        }
    }

    fn record(&self, outcome: &ChargeOutcome) {
        if let Some(tx_id) = &outcome.provider_transaction_id {
            self.outcomes
                .write()
                .expect("mock outcome store poisoned")
                .insert(tx_id.clone(), outcome.clone());
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        self.simulate_latency().await;

        // 1. Comportamiento determinista del token, si existe.
        if let Some(behavior) = self
            .config
            .test_token_outcomes
            .get(&request.payment_method_token)
        {
            let outcome = match behavior {
                TokenBehavior::Succeed => {
                    ChargeOutcome::success(PROVIDER_NAME, Self::next_transaction_id())
                }
                TokenBehavior::Pend => {
                    ChargeOutcome::pending(PROVIDER_NAME, Self::next_transaction_id())
                }
                TokenBehavior::Fail(code) => ChargeOutcome::failed(
                    PROVIDER_NAME,
                    Some(Self::next_transaction_id()),
                    *code,
                    format!("Deterministic outcome for token {}", request.payment_method_token),
                ),
                TokenBehavior::Raise(code) => {
                    return Err(ProviderError::new(
                        *code,
                        format!("Simulated transport fault ({})", code),
                    ));
                }
            };

            info!(
                "Mock provider resolved token {} as {:?}",
                request.payment_method_token, outcome.status
            );
            self.record(&outcome);
            return Ok(outcome);
        }

        // 2. Token desconocido: tirada contra success_rate.
        let success_roll: f64 = rand::rng().random();
        let outcome = if success_roll < self.config.success_rate {
            ChargeOutcome::success(PROVIDER_NAME, Self::next_transaction_id())
        } else {
            let code = Self::roll_failure_code();
            ChargeOutcome::failed(
                PROVIDER_NAME,
                Some(Self::next_transaction_id()),
                code,
                format!("Randomized failure ({})", code),
            )
        };

        self.record(&outcome);
        Ok(outcome)
    }

    async fn transaction_status(
        &self,
        provider_transaction_id: &str,
    ) -> Result<ChargeOutcome, ProviderError> {
        self.simulate_latency().await;

        let stored = self
            .outcomes
            .read()
            .expect("mock outcome store poisoned")
            .get(provider_transaction_id)
            .cloned();

        match stored {
            Some(outcome) => Ok(outcome),
            None => Ok(ChargeOutcome::failed(
                PROVIDER_NAME,
                Some(provider_transaction_id.to_string()),
                ProviderFailureCode::TRANSACTION_NOT_FOUND,
                "Unknown provider transaction",
            )),
        }
    }
}
