use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Códigos de fallo del proveedor externo de pagos.
///
/// La retryabilidad es intrínseca al código: solo los fallos de transporte
/// (`NETWORK_ERROR`, `PROVIDER_UNAVAILABLE`, `RATE_LIMITED`) admiten
/// reintento automático sin riesgo de doble cobro — combinados con la llave
/// de idempotencia que viaja en cada cargo.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderFailureCode {
    CARD_DECLINED,
    INSUFFICIENT_FUNDS,
    EXPIRED_CARD,
    INVALID_CARD,
    FRAUD_SUSPECTED,
    NETWORK_ERROR,
    PROVIDER_UNAVAILABLE,
    RATE_LIMITED,
    TRANSACTION_NOT_FOUND,
}

impl ProviderFailureCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderFailureCode::NETWORK_ERROR
                | ProviderFailureCode::PROVIDER_UNAVAILABLE
                | ProviderFailureCode::RATE_LIMITED
        )
    }
}

impl fmt::Display for ProviderFailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for ProviderFailureCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARD_DECLINED" => Ok(ProviderFailureCode::CARD_DECLINED),
            "INSUFFICIENT_FUNDS" => Ok(ProviderFailureCode::INSUFFICIENT_FUNDS),
            "EXPIRED_CARD" => Ok(ProviderFailureCode::EXPIRED_CARD),
            "INVALID_CARD" => Ok(ProviderFailureCode::INVALID_CARD),
            "FRAUD_SUSPECTED" => Ok(ProviderFailureCode::FRAUD_SUSPECTED),
            "NETWORK_ERROR" => Ok(ProviderFailureCode::NETWORK_ERROR),
            "PROVIDER_UNAVAILABLE" => Ok(ProviderFailureCode::PROVIDER_UNAVAILABLE),
            "RATE_LIMITED" => Ok(ProviderFailureCode::RATE_LIMITED),
            "TRANSACTION_NOT_FOUND" => Ok(ProviderFailureCode::TRANSACTION_NOT_FOUND),
            other => Err(format!("Unknown provider failure code: {}", other)),
        }
    }
}

/// Falla inesperada del canal con el proveedor (transporte, timeout).
///
/// Los rechazos de negocio (tarjeta declinada, fraude) NO viajan por aquí:
/// regresan como [`ChargeOutcome`] con status `Failed`. El error se reserva
/// para fallos en los que ni siquiera hubo una respuesta clasificable.
#[derive(Error, Debug, Clone)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: ProviderFailureCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: ProviderFailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// Estado de un intento de cobro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    Success,
    Pending,
    Failed,
}

/// Solicitud de cobro hacia el proveedor.
///
/// La llave de idempotencia por defecto es el id del pago: un reintento del
/// mismo pago nunca puede producir un segundo cargo.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method_token: String,
    pub description: String,
    pub idempotency_key: String,
}

impl ChargeRequest {
    pub fn new(
        payment_id: Uuid,
        amount: Decimal,
        currency: impl Into<String>,
        payment_method_token: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            payment_id,
            amount,
            currency: currency.into(),
            payment_method_token: payment_method_token.into(),
            description: description.into(),
            idempotency_key: payment_id.to_string(),
        }
    }
}

/// Resultado de un cargo o de una consulta de estado.
///
/// Variante etiquetada en lugar de excepciones-como-control-de-flujo: el
/// orquestador hace pattern matching sobre `status` y decide confirmar,
/// esperar o cancelar la reserva.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub status: ChargeStatus,
    pub provider: String,
    pub provider_transaction_id: Option<String>,
    pub failure_code: Option<ProviderFailureCode>,
    pub message: Option<String>,
    pub retryable: bool,
    pub processed_at: DateTime<Utc>,
}

impl ChargeOutcome {
    pub fn success(provider: impl Into<String>, provider_transaction_id: impl Into<String>) -> Self {
        Self {
            status: ChargeStatus::Success,
            provider: provider.into(),
            provider_transaction_id: Some(provider_transaction_id.into()),
            failure_code: None,
            message: None,
            retryable: false,
            processed_at: Utc::now(),
        }
    }

    pub fn pending(provider: impl Into<String>, provider_transaction_id: impl Into<String>) -> Self {
        Self {
            status: ChargeStatus::Pending,
            provider: provider.into(),
            provider_transaction_id: Some(provider_transaction_id.into()),
            failure_code: None,
            message: None,
            retryable: false,
            processed_at: Utc::now(),
        }
    }

    /// Rechazo clasificado; la retryabilidad sale del propio código.
    pub fn failed(
        provider: impl Into<String>,
        provider_transaction_id: Option<String>,
        code: ProviderFailureCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: ChargeStatus::Failed,
            provider: provider.into(),
            provider_transaction_id,
            failure_code: Some(code),
            message: Some(message.into()),
            retryable: code.is_retryable(),
            processed_at: Utc::now(),
        }
    }

    /// Fallo sintetizado a partir de una excepción del canal. Se marca como
    /// no reintentable: quien lo construye ya agotó (o descartó) los
    /// reintentos.
    pub fn from_provider_error(provider: impl Into<String>, err: &ProviderError) -> Self {
        Self {
            status: ChargeStatus::Failed,
            provider: provider.into(),
            provider_transaction_id: None,
            failure_code: Some(err.code),
            message: Some(err.message.clone()),
            retryable: false,
            processed_at: Utc::now(),
        }
    }
}

// Interface (Port) hacia el proveedor externo de pagos.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Nombre con el que el proveedor queda registrado en cada pago.
    fn name(&self) -> &str;

    /// Cobro sincrónico. Los rechazos de negocio son `Ok(Failed)`; el `Err`
    /// queda para fallos de canal sin respuesta clasificable.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ProviderError>;

    /// Consulta del estado de un cargo previo por su id de transacción.
    async fn transaction_status(
        &self,
        provider_transaction_id: &str,
    ) -> Result<ChargeOutcome, ProviderError>;
}
