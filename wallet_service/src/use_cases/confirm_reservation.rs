use crate::domain::entities::TransactionStatus;
use crate::domain::error::WalletError;
use crate::domain::repository::{WalletRepository, WalletTransactionRepository};
use crate::domain::types::{UserId, WalletId, WalletTransactionId};
use std::sync::Arc;
use tracing::info;

/// Fase 2 (commit) del protocolo de reservas: liquida una reserva tras el
/// cobro exitoso del proveedor externo.
///
/// Idempotente: confirmar un movimiento ya `COMPLETED` es un no-op exitoso.
/// Esto es lo que permite al orquestador y al job de conciliación reintentar
/// la confirmación sin miedo a descontar dos veces.
pub struct ConfirmReservationUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
    transaction_repo: Arc<dyn WalletTransactionRepository>,
}

impl ConfirmReservationUseCase {
    pub fn new(
        wallet_repo: Arc<dyn WalletRepository>,
        transaction_repo: Arc<dyn WalletTransactionRepository>,
    ) -> Self {
        Self {
            wallet_repo,
            transaction_repo,
        }
    }

    /// Ejecuta la confirmación: `balance -= amount`,
    /// `reserved_balance -= amount`, movimiento a `COMPLETED`.
    #[tracing::instrument(name = "ConfirmReservationUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
        provider_transaction_id: String,
        provider: String,
    ) -> Result<(), WalletError> {
        let entry = self
            .transaction_repo
            .find_by_id(transaction_id)
            .await?
            .ok_or(WalletError::TransactionNotFound(transaction_id))?;

        if entry.wallet_id != wallet_id {
            return Err(WalletError::InvalidInput(
                "Transaction does not belong to this wallet".to_string(),
            ));
        }

        let wallet = self
            .wallet_repo
            .find_by_id(wallet_id)
            .await?
            .ok_or(WalletError::NotFound(wallet_id))?;

        if wallet.user_id() != user_id {
            return Err(WalletError::AccessDenied);
        }

        match entry.status {
            // Replay de una confirmación ya aplicada: éxito sin efectos.
            TransactionStatus::COMPLETED => {
                info!(
                    "Transaction {} already COMPLETED, confirm replayed as no-op",
                    transaction_id
                );
                Ok(())
            }
            TransactionStatus::PENDING => {
                self.wallet_repo
                    .apply_confirmation(wallet_id, transaction_id, entry.amount)
                    .await?;
                info!(
                    "Confirmed reservation {} on wallet {} (provider {} tx {})",
                    transaction_id, wallet_id, provider, provider_transaction_id
                );
                Ok(())
            }
            TransactionStatus::CANCELLED => Err(WalletError::InvalidState(format!(
                "Cannot confirm transaction {} from status CANCELLED",
                transaction_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Wallet, WalletTransaction};
    use crate::domain::repository::{MockWalletRepository, MockWalletTransactionRepository};
    use chrono::Utc;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn owned_wallet(wallet_id: WalletId, user_id: UserId) -> Wallet {
        Wallet::reconstitute(
            wallet_id,
            user_id,
            Decimal::from_str("100.00").unwrap(),
            Decimal::from_str("25.00").unwrap(),
            "SGD".to_string(),
            2,
            Utc::now(),
            Utc::now(),
        )
        .unwrap()
    }

    fn pending_entry(wallet_id: WalletId) -> WalletTransaction {
        WalletTransaction::pending_debit(
            wallet_id,
            Decimal::from_str("25.00").unwrap(),
            Uuid::new_v4(),
            "Reservation",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_confirm_pending_reservation() {
        // Arrange
        let mut wallet_repo = MockWalletRepository::new();
        let mut tx_repo = MockWalletTransactionRepository::new();

        let user_id = UserId::new();
        let wallet_id = WalletId::new();
        let entry = pending_entry(wallet_id);
        let entry_id = entry.id;

        tx_repo
            .expect_find_by_id()
            .with(eq(entry_id))
            .returning(move |_| Ok(Some(entry.clone())));
        wallet_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(owned_wallet(wallet_id, user_id))));
        wallet_repo
            .expect_apply_confirmation()
            .with(
                eq(wallet_id),
                eq(entry_id),
                eq(Decimal::from_str("25.00").unwrap()),
            )
            .times(1)
            .returning(|_, _, _| Ok(()));

        let use_case = ConfirmReservationUseCase::new(Arc::new(wallet_repo), Arc::new(tx_repo));

        // Act
        let result = use_case
            .execute(
                user_id,
                wallet_id,
                entry_id,
                "prov_tx_1".to_string(),
                "MOCK".to_string(),
            )
            .await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_already_completed_is_idempotent() {
        // Un segundo confirm (reintento del orquestador o conciliación de un
        // pago que ya ganó su carrera) no debe tocar los saldos.
        let mut wallet_repo = MockWalletRepository::new();
        let mut tx_repo = MockWalletTransactionRepository::new();

        let user_id = UserId::new();
        let wallet_id = WalletId::new();
        let mut entry = pending_entry(wallet_id);
        entry.status = TransactionStatus::COMPLETED;
        let entry_id = entry.id;

        tx_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entry.clone())));
        wallet_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(owned_wallet(wallet_id, user_id))));
        wallet_repo.expect_apply_confirmation().times(0);

        let use_case = ConfirmReservationUseCase::new(Arc::new(wallet_repo), Arc::new(tx_repo));

        let result = use_case
            .execute(
                user_id,
                wallet_id,
                entry_id,
                "prov_tx_1".to_string(),
                "MOCK".to_string(),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_confirm_cancelled_reservation_fails() {
        let mut wallet_repo = MockWalletRepository::new();
        let mut tx_repo = MockWalletTransactionRepository::new();

        let user_id = UserId::new();
        let wallet_id = WalletId::new();
        let mut entry = pending_entry(wallet_id);
        entry.status = TransactionStatus::CANCELLED;
        let entry_id = entry.id;

        tx_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entry.clone())));
        wallet_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(owned_wallet(wallet_id, user_id))));

        let use_case = ConfirmReservationUseCase::new(Arc::new(wallet_repo), Arc::new(tx_repo));

        let result = use_case
            .execute(
                user_id,
                wallet_id,
                entry_id,
                "prov_tx_1".to_string(),
                "MOCK".to_string(),
            )
            .await;

        assert!(matches!(result, Err(WalletError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_confirm_foreign_wallet_is_denied() {
        let mut wallet_repo = MockWalletRepository::new();
        let mut tx_repo = MockWalletTransactionRepository::new();

        let owner = UserId::new();
        let intruder = UserId::new();
        let wallet_id = WalletId::new();
        let entry = pending_entry(wallet_id);
        let entry_id = entry.id;

        tx_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entry.clone())));
        wallet_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(owned_wallet(wallet_id, owner))));

        let use_case = ConfirmReservationUseCase::new(Arc::new(wallet_repo), Arc::new(tx_repo));

        let result = use_case
            .execute(
                intruder,
                wallet_id,
                entry_id,
                "prov_tx_1".to_string(),
                "MOCK".to_string(),
            )
            .await;

        assert!(matches!(result, Err(WalletError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_confirm_wrong_wallet_is_invalid_input() {
        let mut wallet_repo = MockWalletRepository::new();
        let mut tx_repo = MockWalletTransactionRepository::new();

        let user_id = UserId::new();
        let wallet_id = WalletId::new();
        let other_wallet = WalletId::new();
        let entry = pending_entry(other_wallet);
        let entry_id = entry.id;

        tx_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entry.clone())));
        wallet_repo.expect_find_by_id().times(0);

        let use_case = ConfirmReservationUseCase::new(Arc::new(wallet_repo), Arc::new(tx_repo));

        let result = use_case
            .execute(
                user_id,
                wallet_id,
                entry_id,
                "prov_tx_1".to_string(),
                "MOCK".to_string(),
            )
            .await;

        assert!(matches!(result, Err(WalletError::InvalidInput(_))));
    }
}
