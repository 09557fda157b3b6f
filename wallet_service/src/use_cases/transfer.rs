use crate::domain::entities::{ReferenceType, Wallet, WalletTransaction};
use crate::domain::error::WalletError;
use crate::domain::repository::{CasResult, WalletRepository};
use crate::domain::types::{UserId, WalletId};
use crate::use_cases::{OPTIMISTIC_ATTEMPTS, OPTIMISTIC_BACKOFF};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Transferencia entre dos billeteras de la plataforma.
///
/// Debita al pagador (con guardia de saldo disponible y CAS sobre su
/// versión) y acredita al receptor en una sola transacción SQL, escribiendo
/// las dos entradas COMPLETED del diario, cada una referenciando la
/// billetera del otro lado con tipo `TRANSFER`.
pub struct TransferUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
}

impl TransferUseCase {
    pub fn new(wallet_repo: Arc<dyn WalletRepository>) -> Self {
        Self { wallet_repo }
    }

    /// Ejecuta la transferencia y devuelve la billetera pagadora resultante.
    #[tracing::instrument(name = "TransferUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        payer_wallet_id: WalletId,
        recipient_wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidInput(
                "Transfer amount must be positive".to_string(),
            ));
        }
        if payer_wallet_id == recipient_wallet_id {
            return Err(WalletError::InvalidInput(
                "Cannot transfer to the same wallet".to_string(),
            ));
        }

        let mut attempt = 1;
        loop {
            let payer = self
                .wallet_repo
                .find_by_id(payer_wallet_id)
                .await?
                .ok_or(WalletError::NotFound(payer_wallet_id))?;

            if payer.user_id() != user_id {
                return Err(WalletError::NotFound(payer_wallet_id));
            }

            let recipient = self
                .wallet_repo
                .find_by_id(recipient_wallet_id)
                .await?
                .ok_or(WalletError::NotFound(recipient_wallet_id))?;

            if payer.currency() != recipient.currency() {
                return Err(WalletError::InvalidInput(format!(
                    "Currency mismatch: {} -> {}",
                    payer.currency(),
                    recipient.currency()
                )));
            }

            if payer.available_balance() < amount {
                return Err(WalletError::InsufficientBalance(payer_wallet_id));
            }

            let debit = WalletTransaction::completed_debit(
                payer_wallet_id,
                amount,
                Some(recipient_wallet_id.0),
                ReferenceType::TRANSFER,
                format!("Transfer to wallet {}", recipient_wallet_id),
            )?;
            let credit = WalletTransaction::completed_credit(
                recipient_wallet_id,
                amount,
                Some(payer_wallet_id.0),
                ReferenceType::TRANSFER,
                format!("Transfer from wallet {}", payer_wallet_id),
            )?;

            match self
                .wallet_repo
                .apply_transfer(
                    payer_wallet_id,
                    payer.version(),
                    recipient_wallet_id,
                    amount,
                    debit,
                    credit,
                )
                .await?
            {
                CasResult::Applied(updated_payer) => {
                    info!(
                        "Transferred {} from wallet {} to wallet {}",
                        amount, payer_wallet_id, recipient_wallet_id
                    );
                    return Ok(updated_payer);
                }
                CasResult::Conflict => {
                    if attempt >= OPTIMISTIC_ATTEMPTS {
                        warn!(
                            "Transfer from wallet {} lost the version race {} times, giving up",
                            payer_wallet_id, attempt
                        );
                        return Err(WalletError::ConcurrentModification(payer_wallet_id));
                    }
                    attempt += 1;
                    tokio::time::sleep(OPTIMISTIC_BACKOFF).await;
                }
            }
        }
    }
}
