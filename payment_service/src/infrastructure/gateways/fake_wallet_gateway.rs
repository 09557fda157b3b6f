use crate::domain::gateways::{
    GatewayError, ReservationReceipt, StaleReservation, WalletGateway,
};
use crate::domain::types::UserId;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// Implementación fake del gateway de Wallet para desarrollo local.
///
/// Aprueba todas las operaciones y loguea cada llamada. Útil para probar el
/// flujo del orquestador sin levantar el Wallet Service.
pub struct FakeWalletGateway;

impl FakeWalletGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FakeWalletGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletGateway for FakeWalletGateway {
    async fn reserve_funds(
        &self,
        _user_id: UserId,
        wallet_id: Uuid,
        amount: Decimal,
        currency: &str,
        payment_id: Uuid,
    ) -> Result<ReservationReceipt, GatewayError> {
        info!(
            " [FakeWalletGateway] Reserving {} {} on wallet {} for payment {}",
            amount, currency, wallet_id, payment_id
        );

        // Simulamos un pequeño delay de red
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        info!(" [FakeWalletGateway] Reservation APPROVED");
        Ok(ReservationReceipt {
            wallet_transaction_id: Uuid::new_v4(),
            wallet_id,
            amount_reserved: amount,
            remaining_balance: Decimal::ZERO,
        })
    }

    async fn confirm_reservation(
        &self,
        _user_id: UserId,
        wallet_id: Uuid,
        wallet_transaction_id: Uuid,
        provider_transaction_id: &str,
        provider: &str,
    ) -> Result<(), GatewayError> {
        info!(
            " [FakeWalletGateway] Confirming transaction {} on wallet {} ({} tx {})",
            wallet_transaction_id, wallet_id, provider, provider_transaction_id
        );
        Ok(())
    }

    async fn cancel_reservation(
        &self,
        _user_id: UserId,
        wallet_id: Uuid,
        wallet_transaction_id: Uuid,
    ) -> Result<(), GatewayError> {
        info!(
            " [FakeWalletGateway] Cancelling transaction {} on wallet {}",
            wallet_transaction_id, wallet_id
        );
        Ok(())
    }

    async fn list_stale_reservations(
        &self,
        _older_than_minutes: i64,
    ) -> Result<Vec<StaleReservation>, GatewayError> {
        Ok(Vec::new())
    }
}
