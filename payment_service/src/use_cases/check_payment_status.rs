use crate::domain::entities::PaymentStatus;
use crate::domain::error::PaymentError;
use crate::domain::gateways::WalletGateway;
use crate::domain::provider::{ChargeStatus, PaymentProvider};
use crate::domain::repository::PaymentRepository;
use crate::domain::types::{PaymentId, UserId};
use crate::use_cases::process_payment::PaymentReceipt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Conciliación de estado para pagos `PENDING`.
///
/// Toma el candado pesimista del pago (excluye verificaciones concurrentes
/// y confirmaciones dobles), consulta al proveedor y liquida la reserva en
/// consecuencia. Para cualquier estado distinto de `PENDING` devuelve el
/// estado actual sin tocar nada.
pub struct CheckPaymentStatusUseCase {
    payment_repo: Arc<dyn PaymentRepository>,
    wallet_gateway: Arc<dyn WalletGateway>,
    provider: Arc<dyn PaymentProvider>,
}

impl CheckPaymentStatusUseCase {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        wallet_gateway: Arc<dyn WalletGateway>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            payment_repo,
            wallet_gateway,
            provider,
        }
    }

    #[tracing::instrument(name = "CheckPaymentStatusUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        payment_id: PaymentId,
    ) -> Result<PaymentReceipt, PaymentError> {
        let mut payment = self
            .payment_repo
            .lock_for_processing(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;

        if payment.user_id != user_id {
            return Err(PaymentError::AccessDenied);
        }

        // Solo los PENDING se consultan contra el proveedor.
        if payment.status != PaymentStatus::PENDING {
            return Ok(PaymentReceipt::from_payment(&payment));
        }

        let provider_tx_id = payment
            .provider_transaction_id
            .clone()
            .ok_or_else(|| {
                PaymentError::InvalidState(format!(
                    "PENDING payment {} has no provider transaction id",
                    payment_id
                ))
            })?;

        let outcome = self
            .provider
            .transaction_status(&provider_tx_id)
            .await
            .map_err(|e| PaymentError::ProviderUnavailable(e.to_string()))?;

        match outcome.status {
            ChargeStatus::Pending => {
                info!("Payment {} is still pending at the provider", payment_id);
                Ok(PaymentReceipt::from_payment(&payment))
            }
            ChargeStatus::Success => {
                // Confirmación best-effort: si el ledger no responde, el pago
                // igual queda SUCCESS y la conciliación termina el trabajo.
                if let Some(wallet_tx) = payment.wallet_transaction_id {
                    if let Err(e) = self
                        .wallet_gateway
                        .confirm_reservation(
                            user_id,
                            payment.wallet_id,
                            wallet_tx,
                            &provider_tx_id,
                            &outcome.provider,
                        )
                        .await
                    {
                        error!(
                            "Confirmation failed during status check of payment {}: {}",
                            payment_id, e
                        );
                    }
                } else {
                    warn!(
                        "Payment {} succeeded at provider but has no wallet transaction id",
                        payment_id
                    );
                }

                payment.mark_success(
                    outcome.provider.clone(),
                    Some(provider_tx_id),
                    payment.wallet_transaction_id,
                )?;
                let updated = self.payment_repo.update_with_version(&payment).await?;
                Ok(PaymentReceipt::from_payment(&updated))
            }
            ChargeStatus::Failed => {
                if let Some(wallet_tx) = payment.wallet_transaction_id {
                    if let Err(e) = self
                        .wallet_gateway
                        .cancel_reservation(user_id, payment.wallet_id, wallet_tx)
                        .await
                    {
                        warn!(
                            "Best-effort cancellation failed during status check of payment {}: {}",
                            payment_id, e
                        );
                    }
                }

                payment.mark_failed(outcome.failure_code, outcome.message.clone())?;
                let updated = self.payment_repo.update_with_version(&payment).await?;
                Ok(PaymentReceipt::from_payment(&updated))
            }
        }
    }
}
