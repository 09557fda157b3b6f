use crate::domain::entities::{ReferenceType, Wallet, WalletTransaction};
use crate::domain::error::WalletError;
use crate::domain::repository::{CasResult, WalletRepository};
use crate::domain::types::{UserId, WalletId};
use crate::use_cases::{OPTIMISTIC_ATTEMPTS, OPTIMISTIC_BACKOFF};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Abono directo de fondos a una billetera propia.
///
/// El crédito se aplica con optimistic locking sobre `version` y escribe un
/// movimiento CREDIT ya `COMPLETED` (no hay fase de reserva: el dinero entra
/// liquidado). Ante conflictos de versión se reintenta hasta 3 veces con
/// 100ms de espera.
pub struct TopUpUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
}

impl TopUpUseCase {
    pub fn new(wallet_repo: Arc<dyn WalletRepository>) -> Self {
        Self { wallet_repo }
    }

    #[tracing::instrument(name = "TopUpUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidInput(
                "Top-up amount must be positive".to_string(),
            ));
        }

        let mut attempt = 1;
        loop {
            let wallet = self
                .wallet_repo
                .find_by_id(wallet_id)
                .await?
                .ok_or(WalletError::NotFound(wallet_id))?;

            if wallet.user_id() != user_id {
                return Err(WalletError::NotFound(wallet_id));
            }

            let entry = WalletTransaction::completed_credit(
                wallet_id,
                amount,
                None,
                ReferenceType::TOPUP,
                "Wallet top-up",
            )?;

            match self
                .wallet_repo
                .apply_credit(wallet_id, wallet.version(), entry)
                .await?
            {
                CasResult::Applied(updated) => {
                    info!(
                        "Topped up wallet {} with {} (new balance {})",
                        wallet_id,
                        amount,
                        updated.balance()
                    );
                    return Ok(updated);
                }
                CasResult::Conflict => {
                    if attempt >= OPTIMISTIC_ATTEMPTS {
                        warn!(
                            "Top-up on wallet {} lost the version race {} times, giving up",
                            wallet_id, attempt
                        );
                        return Err(WalletError::ConcurrentModification(wallet_id));
                    }
                    attempt += 1;
                    tokio::time::sleep(OPTIMISTIC_BACKOFF).await;
                }
            }
        }
    }
}
