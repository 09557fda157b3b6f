use crate::domain::entities::{Wallet, WalletTransaction};
use crate::domain::error::WalletError;
use crate::domain::repository::{CasResult, WalletRepository, WalletTransactionRepository};
use crate::domain::types::{UserId, WalletId, WalletTransactionId};
use crate::use_cases::{OPTIMISTIC_ATTEMPTS, OPTIMISTIC_BACKOFF};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Resultado de una reserva de fondos (fase 1 del two-phase commit).
#[derive(Debug, Clone, Serialize)]
pub struct ReservationReceipt {
    pub wallet_transaction_id: WalletTransactionId,
    pub wallet_id: WalletId,
    pub amount_reserved: Decimal,
    pub remaining_balance: Decimal,
}

/// Caso de uso central del protocolo de reservas: aparta fondos de una
/// billetera para un pago en vuelo.
///
/// La operación es idempotente por `payment_id`: si ya existe un movimiento
/// con la referencia `(payment_id, PAYMENT)`, se devuelve ese movimiento con
/// el saldo disponible actual, sin reservar dos veces. Esto hace seguros los
/// reintentos del orquestador y del job de conciliación.
pub struct ReserveFundsUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
    transaction_repo: Arc<dyn WalletTransactionRepository>,
}

impl ReserveFundsUseCase {
    pub fn new(
        wallet_repo: Arc<dyn WalletRepository>,
        transaction_repo: Arc<dyn WalletTransactionRepository>,
    ) -> Self {
        Self {
            wallet_repo,
            transaction_repo,
        }
    }

    /// Ejecuta la reserva.
    ///
    /// Flujo: replay idempotente -> validación de propiedad y saldo ->
    /// compare-and-set con guardia de saldo -> clasificación del conflicto.
    /// Cero filas afectadas nunca se adivina: se re-lee la billetera y se
    /// decide entre `INSUFFICIENT_BALANCE` (los fondos ya no alcanzan) y un
    /// reintento por conflicto de versión (hasta 3, con 100ms de espera).
    #[tracing::instrument(name = "ReserveFundsUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        wallet_id: WalletId,
        amount: Decimal,
        currency: Option<String>,
        payment_id: Uuid,
    ) -> Result<ReservationReceipt, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidInput(
                "Reservation amount must be positive".to_string(),
            ));
        }

        // 1. Replay idempotente: la reserva de este pago puede ya existir.
        if let Some(existing) = self
            .transaction_repo
            .find_by_payment_reference(payment_id)
            .await?
        {
            info!(
                "Reservation for payment {} already exists as transaction {}, replaying",
                payment_id, existing.id
            );
            let wallet = self.load_owned_wallet(user_id, wallet_id).await?;
            return Ok(Self::receipt(&existing, &wallet));
        }

        // 2. CAS con clasificación de conflictos y reintento acotado.
        let mut attempt = 1;
        loop {
            let wallet = self.load_owned_wallet(user_id, wallet_id).await?;

            if let Some(requested) = currency.as_deref() {
                if !requested.eq_ignore_ascii_case(wallet.currency()) {
                    return Err(WalletError::InvalidInput(format!(
                        "Currency mismatch: wallet holds {}",
                        wallet.currency()
                    )));
                }
            }

            if wallet.available_balance() < amount {
                return Err(WalletError::InsufficientBalance(wallet_id));
            }

            let entry = WalletTransaction::pending_debit(
                wallet_id,
                amount,
                payment_id,
                format!("Reservation for payment {}", payment_id),
            )?;
            let entry_id = entry.id;

            match self
                .wallet_repo
                .apply_reservation(wallet_id, wallet.version(), entry)
                .await?
            {
                CasResult::Applied(updated) => {
                    info!(
                        "Reserved {} on wallet {} for payment {} (remaining {})",
                        amount,
                        wallet_id,
                        payment_id,
                        updated.available_balance()
                    );
                    return Ok(ReservationReceipt {
                        wallet_transaction_id: entry_id,
                        wallet_id,
                        amount_reserved: amount,
                        remaining_balance: updated.available_balance(),
                    });
                }
                CasResult::Conflict => {
                    // El conflicto puede venir de otra reserva del MISMO pago
                    // que ganó la carrera: en ese caso la respuesta correcta
                    // es el replay idempotente, no un error.
                    if let Some(existing) = self
                        .transaction_repo
                        .find_by_payment_reference(payment_id)
                        .await?
                    {
                        let wallet = self.load_owned_wallet(user_id, wallet_id).await?;
                        return Ok(Self::receipt(&existing, &wallet));
                    }

                    let reread = self.load_owned_wallet(user_id, wallet_id).await?;
                    if reread.available_balance() < amount {
                        return Err(WalletError::InsufficientBalance(wallet_id));
                    }

                    if attempt >= OPTIMISTIC_ATTEMPTS {
                        warn!(
                            "Reservation on wallet {} lost the version race {} times, giving up",
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

    /// Carga la billetera verificando pertenencia. Una billetera ajena se
    /// reporta como inexistente para no revelar su existencia.
    async fn load_owned_wallet(
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

    fn receipt(entry: &WalletTransaction, wallet: &Wallet) -> ReservationReceipt {
        ReservationReceipt {
            wallet_transaction_id: entry.id,
            wallet_id: entry.wallet_id,
            amount_reserved: entry.amount,
            remaining_balance: wallet.available_balance(),
        }
    }
}
