use crate::domain::entities::TransactionStatus;
use crate::domain::error::WalletError;
use crate::domain::repository::{WalletRepository, WalletTransactionRepository};
use crate::domain::types::{UserId, WalletId, WalletTransactionId};
use std::sync::Arc;
use tracing::info;

/// Fase 2 (abort) del protocolo de reservas: libera los fondos apartados
/// cuando el cobro externo falló o el pago expiró.
///
/// Idempotente sobre `CANCELLED`; nunca se permite desde `COMPLETED` (los
/// fondos ya se liquidaron, revertirlos sería inventar dinero).
pub struct CancelReservationUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
    transaction_repo: Arc<dyn WalletTransactionRepository>,
}

impl CancelReservationUseCase {
    pub fn new(
        wallet_repo: Arc<dyn WalletRepository>,
        transaction_repo: Arc<dyn WalletTransactionRepository>,
    ) -> Self {
        Self {
            wallet_repo,
            transaction_repo,
        }
    }

    /// Ejecuta la cancelación: `reserved_balance -= amount`, el `balance`
    /// queda intacto y el movimiento pasa a `CANCELLED`.
    #[tracing::instrument(name = "CancelReservationUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
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
            TransactionStatus::CANCELLED => {
                info!(
                    "Transaction {} already CANCELLED, cancel replayed as no-op",
                    transaction_id
                );
                Ok(())
            }
            TransactionStatus::PENDING => {
                self.wallet_repo
                    .apply_cancellation(wallet_id, transaction_id, entry.amount)
                    .await?;
                info!(
                    "Cancelled reservation {} on wallet {}, released {}",
                    transaction_id, wallet_id, entry.amount
                );
                Ok(())
            }
            TransactionStatus::COMPLETED => Err(WalletError::InvalidState(format!(
                "Cannot cancel transaction {} from status COMPLETED",
                transaction_id
            ))),
        }
    }
}
