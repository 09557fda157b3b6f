use crate::domain::{entities::Wallet, error::WalletError, repository::WalletRepository};
use crate::domain::types::{UserId, WalletId};
use std::sync::Arc;

/// Consulta de saldo de una billetera propia.
///
/// Las billeteras ajenas se reportan como inexistentes.
pub struct GetBalanceUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
}

impl GetBalanceUseCase {
    pub fn new(wallet_repo: Arc<dyn WalletRepository>) -> Self {
        Self { wallet_repo }
    }

    #[tracing::instrument(name = "GetBalanceUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        wallet_id: WalletId,
    ) -> Result<Wallet, WalletError> {
        let wallet = self
            .wallet_repo
            .find_by_id(wallet_id)
            .await?
            .ok_or(WalletError::NotFound(wallet_id))?;

        if wallet.user_id() != user_id {
            return Err(WalletError::NotFound(wallet_id));
        }

        Ok(wallet)
    }
}
