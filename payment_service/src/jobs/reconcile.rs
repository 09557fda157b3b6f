use crate::domain::entities::PaymentStatus;
use crate::domain::error::PaymentError;
use crate::domain::gateways::{StaleReservation, WalletGateway};
use crate::domain::provider::{ChargeStatus, PaymentProvider};
use crate::domain::repository::PaymentRepository;
use crate::domain::types::PaymentId;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Job en segundo plano que resuelve reservas atascadas.
///
/// Una reserva queda PENDING más allá del umbral cuando una confirmación o
/// cancelación se perdió (caída del servicio, fallo de red tras un cargo
/// exitoso). El job pide al ledger su feed de reservas viejas, busca el
/// pago dueño por `reference_id` y liquida:
///
/// * pago `SUCCESS`  -> confirm (el dinero ya se cobró afuera)
/// * pago `FAILED` o `EXPIRED` -> cancel (libera los fondos)
/// * pago `PENDING`  -> se consulta al proveedor y se liquida según diga
///
/// Correr el job repetidamente es seguro: confirm y cancel son idempotentes
/// en el ledger.
pub struct ReconciliationJob {
    payment_repo: Arc<dyn PaymentRepository>,
    wallet_gateway: Arc<dyn WalletGateway>,
    provider: Arc<dyn PaymentProvider>,
    stale_after_minutes: i64,
}

impl ReconciliationJob {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        wallet_gateway: Arc<dyn WalletGateway>,
        provider: Arc<dyn PaymentProvider>,
        stale_after_minutes: i64,
    ) -> Self {
        Self {
            payment_repo,
            wallet_gateway,
            provider,
            stale_after_minutes,
        }
    }

    /// Ejecuta una pasada de conciliación.
    pub async fn run(&self) {
        info!("Starting ReconciliationJob...");

        let stale = match self
            .wallet_gateway
            .list_stale_reservations(self.stale_after_minutes)
            .await
        {
            Ok(stale) => stale,
            Err(e) => {
                error!("Failed to fetch stale reservations: {:?}", e);
                return;
            }
        };

        if stale.is_empty() {
            return;
        }

        info!("Found {} stale reservations. Reconciling...", stale.len());

        for reservation in stale {
            if let Err(e) = self.reconcile_one(&reservation).await {
                error!(
                    "Failed to reconcile reservation {}: {:?}",
                    reservation.wallet_transaction_id, e
                );
            }
        }
    }

    async fn reconcile_one(&self, reservation: &StaleReservation) -> Result<(), PaymentError> {
        let payment_id = PaymentId(reservation.payment_id);
        let Some(payment) = self.payment_repo.find_by_id(payment_id).await? else {
            warn!(
                "Stale reservation {} references unknown payment {}",
                reservation.wallet_transaction_id, payment_id
            );
            return Ok(());
        };

        match payment.status {
            PaymentStatus::SUCCESS => {
                info!(
                    "Reconciling reservation {} of successful payment {}: issuing confirm",
                    reservation.wallet_transaction_id, payment_id
                );
                self.wallet_gateway
                    .confirm_reservation(
                        payment.user_id,
                        reservation.wallet_id,
                        reservation.wallet_transaction_id,
                        payment.provider_transaction_id.as_deref().unwrap_or_default(),
                        payment.provider.as_deref().unwrap_or("UNKNOWN"),
                    )
                    .await?;
                Ok(())
            }
            PaymentStatus::FAILED | PaymentStatus::EXPIRED => {
                info!(
                    "Reconciling reservation {} of {:?} payment {}: issuing cancel",
                    reservation.wallet_transaction_id, payment.status, payment_id
                );
                self.wallet_gateway
                    .cancel_reservation(
                        payment.user_id,
                        reservation.wallet_id,
                        reservation.wallet_transaction_id,
                    )
                    .await?;
                Ok(())
            }
            PaymentStatus::PENDING => self.poll_and_settle(reservation).await,
            PaymentStatus::INITIATED => {
                // El procesamiento puede seguir en vuelo; nada que decidir aún.
                Ok(())
            }
        }
    }

    /// Pago aún PENDING: el proveedor es la fuente de verdad.
    async fn poll_and_settle(&self, reservation: &StaleReservation) -> Result<(), PaymentError> {
        let payment_id = PaymentId(reservation.payment_id);

        // Re-lectura bajo candado para excluir un status check concurrente.
        let Some(mut payment) = self.payment_repo.lock_for_processing(payment_id).await? else {
            return Ok(());
        };
        if payment.status != PaymentStatus::PENDING {
            return Ok(());
        }

        let Some(provider_tx_id) = payment.provider_transaction_id.clone() else {
            warn!(
                "PENDING payment {} has no provider transaction id, cannot poll",
                payment_id
            );
            return Ok(());
        };

        let outcome = self
            .provider
            .transaction_status(&provider_tx_id)
            .await
            .map_err(|e| PaymentError::ProviderUnavailable(e.to_string()))?;

        match outcome.status {
            ChargeStatus::Pending => Ok(()),
            ChargeStatus::Success => {
                self.wallet_gateway
                    .confirm_reservation(
                        payment.user_id,
                        reservation.wallet_id,
                        reservation.wallet_transaction_id,
                        &provider_tx_id,
                        &outcome.provider,
                    )
                    .await?;
                payment.mark_success(
                    outcome.provider.clone(),
                    Some(provider_tx_id),
                    Some(reservation.wallet_transaction_id),
                )?;
                self.payment_repo.update_with_version(&payment).await?;
                Ok(())
            }
            ChargeStatus::Failed => {
                self.wallet_gateway
                    .cancel_reservation(
                        payment.user_id,
                        reservation.wallet_id,
                        reservation.wallet_transaction_id,
                    )
                    .await?;
                payment.mark_failed(outcome.failure_code, outcome.message.clone())?;
                self.payment_repo.update_with_version(&payment).await?;
                Ok(())
            }
        }
    }
}
