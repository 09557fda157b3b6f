use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error_codes::ErrorCode;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::types::UserId;

#[cfg(test)]
use mockall::automock;

/// Recibo de una reserva de fondos en el ledger.
#[derive(Debug, Clone)]
pub struct ReservationReceipt {
    pub wallet_transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub amount_reserved: Decimal,
    pub remaining_balance: Decimal,
}

/// Reserva atascada reportada por el feed de conciliación del ledger.
#[derive(Debug, Clone)]
pub struct StaleReservation {
    pub wallet_transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    pub payment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Falla de una llamada al Wallet Service.
///
/// `Rejected` viene del sobre de error estándar (el código numérico se
/// mapeó de vuelta al catálogo); `Unavailable` es transporte o una
/// respuesta sin sobre parseable.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Wallet service rejected the call: {message}")]
    Rejected { code: ErrorCode, message: String },

    #[error("Wallet service unavailable: {0}")]
    Unavailable(String),
}

// Interface (Port) hacia el Wallet Ledger. El orquestador es el único
// componente que conoce a la vez al ledger y al proveedor.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// Fase 1: aparta fondos. Idempotente por `payment_id`.
    async fn reserve_funds(
        &self,
        user_id: UserId,
        wallet_id: Uuid,
        amount: Decimal,
        currency: &str,
        payment_id: Uuid,
    ) -> Result<ReservationReceipt, GatewayError>;

    /// Fase 2 (commit). Idempotente en el ledger.
    async fn confirm_reservation(
        &self,
        user_id: UserId,
        wallet_id: Uuid,
        wallet_transaction_id: Uuid,
        provider_transaction_id: &str,
        provider: &str,
    ) -> Result<(), GatewayError>;

    /// Fase 2 (abort). Idempotente en el ledger.
    async fn cancel_reservation(
        &self,
        user_id: UserId,
        wallet_id: Uuid,
        wallet_transaction_id: Uuid,
    ) -> Result<(), GatewayError>;

    /// Reservas PENDING más viejas que el umbral, para conciliación.
    async fn list_stale_reservations(
        &self,
        older_than_minutes: i64,
    ) -> Result<Vec<StaleReservation>, GatewayError>;
}
