use crate::domain::entities::WalletTransaction;
use crate::domain::error::WalletError;
use crate::domain::repository::{WalletRepository, WalletTransactionRepository};
use crate::domain::types::{UserId, WalletId};
use std::sync::Arc;

/// Historial paginado de movimientos de una billetera propia.
///
/// Páginas 1-based de 10 elementos, lo más reciente primero.
pub struct GetTransactionHistoryUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
    transaction_repo: Arc<dyn WalletTransactionRepository>,
}

impl GetTransactionHistoryUseCase {
    pub fn new(
        wallet_repo: Arc<dyn WalletRepository>,
        transaction_repo: Arc<dyn WalletTransactionRepository>,
    ) -> Self {
        Self {
            wallet_repo,
            transaction_repo,
        }
    }

    #[tracing::instrument(name = "GetTransactionHistoryUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        wallet_id: WalletId,
        page: u32,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        if page == 0 {
            return Err(WalletError::InvalidInput(
                "Page index is 1-based".to_string(),
            ));
        }

        let wallet = self
            .wallet_repo
            .find_by_id(wallet_id)
            .await?
            .ok_or(WalletError::NotFound(wallet_id))?;

        if wallet.user_id() != user_id {
            return Err(WalletError::NotFound(wallet_id));
        }

        self.transaction_repo.find_history(wallet_id, page).await
    }
}
