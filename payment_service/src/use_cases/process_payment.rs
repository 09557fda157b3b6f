use crate::domain::entities::{Payment, PaymentStatus};
use crate::domain::error::PaymentError;
use crate::domain::gateways::WalletGateway;
use crate::domain::provider::{ChargeRequest, ChargeStatus, PaymentProvider};
use crate::domain::repository::PaymentRepository;
use crate::domain::types::{PaymentId, UserId};
use crate::use_cases::retry_policy::ChargeRetryPolicy;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Vista del pago que regresa a los clientes tras procesar o consultar.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub message: String,
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn from_payment(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            status: payment.status,
            message: describe(payment),
            amount: payment.amount,
            currency: payment.currency.clone(),
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

fn describe(payment: &Payment) -> String {
    match payment.status {
        PaymentStatus::SUCCESS => "Payment processed successfully".to_string(),
        PaymentStatus::PENDING => "Payment is pending provider confirmation".to_string(),
        PaymentStatus::INITIATED => "Payment has not been processed yet".to_string(),
        PaymentStatus::EXPIRED => "Payment expired before processing".to_string(),
        PaymentStatus::FAILED => {
            let detail = payment
                .failure_message
                .clone()
                .or_else(|| payment.failure_code.map(|c| c.to_string()))
                .unwrap_or_else(|| "rejected by provider".to_string());
            match payment.failure_code {
                Some(code) if code.is_retryable() => {
                    format!("Payment provider unavailable: {}", detail)
                }
                _ => format!("Payment charge failed: {}", detail),
            }
        }
    }
}

/// Two-phase commit del procesamiento de pagos.
///
/// Fase 1 reserva fondos en el ledger; la fase 2 confirma o cancela según
/// el resultado del cobro externo. Las asimetrías son deliberadas:
///
/// * Un cobro `SUCCESS` cuya confirmación falla NO se revierte: el cargo ya
///   comprometió dinero en el proveedor y revertir nuestro registro nos
///   separaría de la realidad. La reserva atascada la resuelve el job de
///   conciliación gracias a la idempotencia del confirm.
/// * Un rechazo definitivo NO se lanza como error: el pago se persiste
///   `FAILED` y la respuesta sale 200 con el estado, de modo que el commit
///   que guarda el fallo nunca se deshaga por un rollback del handler.
pub struct ProcessPaymentUseCase {
    payment_repo: Arc<dyn PaymentRepository>,
    wallet_gateway: Arc<dyn WalletGateway>,
    provider: Arc<dyn PaymentProvider>,
    retry_policy: ChargeRetryPolicy,
}

impl ProcessPaymentUseCase {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        wallet_gateway: Arc<dyn WalletGateway>,
        provider: Arc<dyn PaymentProvider>,
        retry_policy: ChargeRetryPolicy,
    ) -> Self {
        Self {
            payment_repo,
            wallet_gateway,
            provider,
            retry_policy,
        }
    }

    #[tracing::instrument(name = "ProcessPaymentUseCase::execute", skip(self, payment_method_token))]
    pub async fn execute(
        &self,
        user_id: UserId,
        payment_id: PaymentId,
        payment_method_token: String,
    ) -> Result<PaymentReceipt, PaymentError> {
        // 1. Candado pesimista del pago para la verificación de entrada.
        // El candado no se sostiene a través del cobro: las transiciones
        // posteriores van protegidas por el CAS de `version`, y tanto la
        // reserva como el cargo son idempotentes por id de pago.
        let mut payment = self
            .payment_repo
            .lock_for_processing(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;

        if payment.user_id != user_id {
            return Err(PaymentError::AccessDenied);
        }
        if payment.status != PaymentStatus::INITIATED {
            return Err(PaymentError::InvalidStatusTransition(format!(
                "Payment {} is {:?}, only INITIATED payments can be processed",
                payment.id, payment.status
            )));
        }

        // 2. Fase 1: reserva de fondos en el ledger. Si falla, el pago queda
        // INITIATED y el error sube tal cual: nada externo se comprometió.
        let reservation = self
            .wallet_gateway
            .reserve_funds(
                user_id,
                payment.wallet_id,
                payment.amount,
                &payment.currency,
                payment.id.0,
            )
            .await?;

        info!(
            "Reserved {} for payment {} (wallet transaction {})",
            reservation.amount_reserved, payment.id, reservation.wallet_transaction_id
        );

        // 3. Cobro externo con reintentos. La llave de idempotencia es el
        // id del pago, así que los reintentos no pueden duplicar el cargo.
        let request = ChargeRequest::new(
            payment.id.0,
            payment.amount,
            payment.currency.clone(),
            payment_method_token,
            format!("Payment {}", payment.id),
        );
        let outcome = self.retry_policy.charge(self.provider.as_ref(), &request).await;

        // 4. Fase 2 según el resultado.
        match outcome.status {
            ChargeStatus::Success => {
                if let Err(e) = self
                    .wallet_gateway
                    .confirm_reservation(
                        user_id,
                        payment.wallet_id,
                        reservation.wallet_transaction_id,
                        outcome.provider_transaction_id.as_deref().unwrap_or_default(),
                        &outcome.provider,
                    )
                    .await
                {
                    // El cargo ya comprometió en el proveedor: no se revierte.
                    // La reserva queda PENDING y la recoge la conciliación.
                    error!(
                        "Confirmation failed after successful charge for payment {}: {}. \
                         Leaving reservation {} for reconciliation",
                        payment.id, e, reservation.wallet_transaction_id
                    );
                }
                payment.mark_success(
                    outcome.provider.clone(),
                    outcome.provider_transaction_id.clone(),
                    Some(reservation.wallet_transaction_id),
                )?;
            }
            ChargeStatus::Pending => {
                // Ni confirmar ni cancelar: el proveedor aún no decide.
                payment.mark_pending(
                    outcome.provider.clone(),
                    outcome.provider_transaction_id.clone(),
                    Some(reservation.wallet_transaction_id),
                )?;
            }
            ChargeStatus::Failed => {
                if let Err(e) = self
                    .wallet_gateway
                    .cancel_reservation(
                        user_id,
                        payment.wallet_id,
                        reservation.wallet_transaction_id,
                    )
                    .await
                {
                    warn!(
                        "Best-effort cancellation failed for payment {}: {}",
                        payment.id, e
                    );
                }
                payment.mark_failed(outcome.failure_code, outcome.message.clone())?;
            }
        }

        let updated = self.payment_repo.update_with_version(&payment).await?;
        Ok(PaymentReceipt::from_payment(&updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateways::{
        GatewayError, MockWalletGateway, ReservationReceipt,
    };
    use crate::domain::provider::{
        ChargeOutcome, MockPaymentProvider, ProviderError, ProviderFailureCode,
    };
    use crate::domain::repository::MockPaymentRepository;
    use common::error_codes::ErrorCode;
    use std::str::FromStr;
    use std::time::Duration;
    use uuid::Uuid;

    fn initiated_payment(user_id: UserId) -> Payment {
        Payment::new(
            user_id,
            Decimal::from_str("25.00").unwrap(),
            None,
            Uuid::new_v4(),
            "abc".to_string(),
            None,
        )
        .unwrap()
    }

    fn receipt_for(wallet_id: Uuid) -> ReservationReceipt {
        ReservationReceipt {
            wallet_transaction_id: Uuid::new_v4(),
            wallet_id,
            amount_reserved: Decimal::from_str("25.00").unwrap(),
            remaining_balance: Decimal::from_str("75.00").unwrap(),
        }
    }

    fn fast_policy() -> ChargeRetryPolicy {
        ChargeRetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_happy_path_reserves_charges_and_confirms() {
        // Arrange
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockWalletGateway::new();
        let mut provider = MockPaymentProvider::new();

        let user_id = UserId::new();
        let payment = initiated_payment(user_id);
        let payment_id = payment.id;
        let wallet_id = payment.wallet_id;
        let reservation = receipt_for(wallet_id);
        let reservation_tx = reservation.wallet_transaction_id;

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));

        gateway
            .expect_reserve_funds()
            .withf(move |u, w, amount, currency, pid| {
                *u == user_id
                    && *w == wallet_id
                    && *amount == Decimal::from_str("25.00").unwrap()
                    && currency == "SGD"
                    && *pid == payment_id.0
            })
            .times(1)
            .returning(move |_, _, _, _, _| Ok(reservation.clone()));

        provider.expect_name().return_const("MOCK".to_string());
        provider
            .expect_charge()
            .withf(move |req| req.idempotency_key == payment_id.0.to_string())
            .times(1)
            .returning(|_| Ok(ChargeOutcome::success("MOCK", "prov_tx_1")));

        gateway
            .expect_confirm_reservation()
            .withf(move |_, w, tx, prov_tx, prov| {
                *w == wallet_id && *tx == reservation_tx && prov_tx == "prov_tx_1" && prov == "MOCK"
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));

        repo.expect_update_with_version()
            .withf(move |p| {
                p.status == PaymentStatus::SUCCESS
                    && p.provider_transaction_id.as_deref() == Some("prov_tx_1")
                    && p.wallet_transaction_id == Some(reservation_tx)
            })
            .times(1)
            .returning(|p| Ok(p.clone()));

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        // Act
        let receipt = use_case
            .execute(user_id, payment_id, "tok_visa_success".to_string())
            .await
            .unwrap();

        // Assert
        assert_eq!(receipt.status, PaymentStatus::SUCCESS);
        assert_eq!(receipt.amount, Decimal::from_str("25.00").unwrap());
    }

    #[tokio::test]
    async fn test_declined_charge_cancels_and_returns_failed_response() {
        // El rechazo definitivo NO es un error: respuesta normal con FAILED.
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockWalletGateway::new();
        let mut provider = MockPaymentProvider::new();

        let user_id = UserId::new();
        let payment = initiated_payment(user_id);
        let payment_id = payment.id;
        let reservation = receipt_for(payment.wallet_id);
        let reservation_tx = reservation.wallet_transaction_id;

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));
        gateway
            .expect_reserve_funds()
            .returning(move |_, _, _, _, _| Ok(reservation.clone()));

        provider.expect_name().return_const("MOCK".to_string());
        provider.expect_charge().times(1).returning(|_| {
            Ok(ChargeOutcome::failed(
                "MOCK",
                Some("prov_tx_declined".to_string()),
                ProviderFailureCode::CARD_DECLINED,
                "Card declined",
            ))
        });

        gateway
            .expect_cancel_reservation()
            .withf(move |_, _, tx| *tx == reservation_tx)
            .times(1)
            .returning(|_, _, _| Ok(()));
        gateway.expect_confirm_reservation().times(0);

        repo.expect_update_with_version()
            .withf(|p| {
                p.status == PaymentStatus::FAILED
                    && p.failure_code == Some(ProviderFailureCode::CARD_DECLINED)
            })
            .times(1)
            .returning(|p| Ok(p.clone()));

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        let receipt = use_case
            .execute(user_id, payment_id, "tok_card_declined".to_string())
            .await
            .unwrap();

        assert_eq!(receipt.status, PaymentStatus::FAILED);
        assert!(receipt.message.contains("Payment charge failed"));
    }

    #[tokio::test]
    async fn test_confirmation_failure_does_not_revert_success() {
        // El cargo comprometió externamente: la confirmación fallida se
        // tolera y el pago igual queda SUCCESS.
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockWalletGateway::new();
        let mut provider = MockPaymentProvider::new();

        let user_id = UserId::new();
        let payment = initiated_payment(user_id);
        let payment_id = payment.id;
        let reservation = receipt_for(payment.wallet_id);

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));
        gateway
            .expect_reserve_funds()
            .returning(move |_, _, _, _, _| Ok(reservation.clone()));

        provider.expect_name().return_const("MOCK".to_string());
        provider
            .expect_charge()
            .returning(|_| Ok(ChargeOutcome::success("MOCK", "prov_tx_1")));

        gateway
            .expect_confirm_reservation()
            .times(1)
            .returning(|_, _, _, _, _| {
                Err(GatewayError::Unavailable("connection reset".to_string()))
            });
        gateway.expect_cancel_reservation().times(0);

        repo.expect_update_with_version()
            .withf(|p| p.status == PaymentStatus::SUCCESS)
            .times(1)
            .returning(|p| Ok(p.clone()));

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        let receipt = use_case
            .execute(user_id, payment_id, "tok_visa_success".to_string())
            .await
            .unwrap();

        assert_eq!(receipt.status, PaymentStatus::SUCCESS);
    }

    #[tokio::test]
    async fn test_retry_then_succeed_confirms_exactly_once() {
        // NETWORK_ERROR en los intentos 1 y 2, SUCCESS en el 3: un solo confirm.
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockWalletGateway::new();
        let mut provider = MockPaymentProvider::new();

        let user_id = UserId::new();
        let payment = initiated_payment(user_id);
        let payment_id = payment.id;
        let reservation = receipt_for(payment.wallet_id);

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));
        gateway
            .expect_reserve_funds()
            .times(1)
            .returning(move |_, _, _, _, _| Ok(reservation.clone()));

        provider.expect_name().return_const("MOCK".to_string());
        let mut calls = 0;
        provider.expect_charge().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(ProviderError::new(
                    ProviderFailureCode::NETWORK_ERROR,
                    "socket reset",
                ))
            } else {
                Ok(ChargeOutcome::success("MOCK", "prov_tx_retry"))
            }
        });

        gateway
            .expect_confirm_reservation()
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));

        repo.expect_update_with_version()
            .withf(|p| p.status == PaymentStatus::SUCCESS)
            .returning(|p| Ok(p.clone()));

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        let receipt = use_case
            .execute(user_id, payment_id, "tok_flaky".to_string())
            .await
            .unwrap();

        assert_eq!(receipt.status, PaymentStatus::SUCCESS);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_cancels_reservation() {
        // Tres NETWORK_ERROR: reserva cancelada, pago FAILED y mensaje de
        // proveedor no disponible.
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockWalletGateway::new();
        let mut provider = MockPaymentProvider::new();

        let user_id = UserId::new();
        let payment = initiated_payment(user_id);
        let payment_id = payment.id;
        let reservation = receipt_for(payment.wallet_id);

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));
        gateway
            .expect_reserve_funds()
            .returning(move |_, _, _, _, _| Ok(reservation.clone()));

        provider.expect_name().return_const("MOCK".to_string());
        provider.expect_charge().times(3).returning(|_| {
            Err(ProviderError::new(
                ProviderFailureCode::NETWORK_ERROR,
                "socket reset",
            ))
        });

        gateway
            .expect_cancel_reservation()
            .times(1)
            .returning(|_, _, _| Ok(()));

        repo.expect_update_with_version()
            .withf(|p| {
                p.status == PaymentStatus::FAILED
                    && p.failure_code == Some(ProviderFailureCode::NETWORK_ERROR)
            })
            .returning(|p| Ok(p.clone()));

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        let receipt = use_case
            .execute(user_id, payment_id, "tok_network_error".to_string())
            .await
            .unwrap();

        assert_eq!(receipt.status, PaymentStatus::FAILED);
        assert!(receipt.message.contains("Payment provider unavailable"));
    }

    #[tokio::test]
    async fn test_reservation_failure_leaves_payment_initiated() {
        // Sin fondos no hay cargo: el error sube y el proveedor nunca se llama.
        let mut repo = MockPaymentRepository::new();
        let mut gateway = MockWalletGateway::new();
        let mut provider = MockPaymentProvider::new();

        let user_id = UserId::new();
        let payment = initiated_payment(user_id);
        let payment_id = payment.id;

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));
        gateway.expect_reserve_funds().returning(|_, _, _, _, _| {
            Err(GatewayError::Rejected {
                code: ErrorCode::InsufficientBalance,
                message: "Insufficient balance".to_string(),
            })
        });

        provider.expect_charge().times(0);
        repo.expect_update_with_version().times(0);

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        let result = use_case
            .execute(user_id, payment_id, "tok_visa_success".to_string())
            .await;

        assert!(matches!(result, Err(PaymentError::InsufficientBalance(_))));
    }

    #[tokio::test]
    async fn test_foreign_payment_is_denied() {
        let mut repo = MockPaymentRepository::new();
        let gateway = MockWalletGateway::new();
        let provider = MockPaymentProvider::new();

        let owner = UserId::new();
        let payment = initiated_payment(owner);
        let payment_id = payment.id;

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        let result = use_case
            .execute(UserId::new(), payment_id, "tok".to_string())
            .await;

        assert!(matches!(result, Err(PaymentError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_non_initiated_payment_is_rejected() {
        let mut repo = MockPaymentRepository::new();
        let gateway = MockWalletGateway::new();
        let provider = MockPaymentProvider::new();

        let user_id = UserId::new();
        let mut payment = initiated_payment(user_id);
        payment
            .mark_success("MOCK".to_string(), Some("tx".to_string()), None)
            .unwrap();
        let payment_id = payment.id;

        repo.expect_lock_for_processing()
            .returning(move |_| Ok(Some(payment.clone())));

        let use_case = ProcessPaymentUseCase::new(
            Arc::new(repo),
            Arc::new(gateway),
            Arc::new(provider),
            fast_policy(),
        );

        let result = use_case
            .execute(user_id, payment_id, "tok".to_string())
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::InvalidStatusTransition(_))
        ));
    }
}
