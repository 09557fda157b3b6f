use crate::domain::entities::{Payment, PaymentStatus};
use crate::domain::error::PaymentError;
use crate::domain::repository::PaymentRepository;
use crate::domain::types::UserId;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Solicitud de iniciación de un pago.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub wallet_id: Uuid,
    pub client_request_id: String,
    pub provider: Option<String>,
}

/// Resultado de la iniciación: el pago y si la fila es nueva (`201`) o un
/// replay idempotente (`200`).
#[derive(Debug, Clone)]
pub struct InitiationOutcome {
    pub payment: Payment,
    pub is_new: bool,
}

/// Iniciación idempotente del pago sobre `(client_request_id, usuario)`.
///
/// Reglas:
/// 1. Si ya existe y no está `EXPIRED`, replay: los valores almacenados
///    ganan y la respuesta no es nueva.
/// 2. Si existe `EXPIRED`, se reinicia en sitio: la última solicitud es la
///    autoritativa sobre monto/divisa/billetera y las referencias de
///    proveedor y ledger se limpian.
/// 3. Si no existe, se inserta en `INITIATED`.
/// 4. Si la inserción choca con el unique por una carrera, NUNCA se adivina:
///    se re-lee en un contexto transaccional fresco (la transacción que
///    recibió la violación está envenenada) y se aplican las reglas 1/2.
pub struct InitiatePaymentUseCase {
    payment_repo: Arc<dyn PaymentRepository>,
}

impl InitiatePaymentUseCase {
    pub fn new(payment_repo: Arc<dyn PaymentRepository>) -> Self {
        Self { payment_repo }
    }

    #[tracing::instrument(name = "InitiatePaymentUseCase::execute", skip(self, command))]
    pub async fn execute(
        &self,
        user_id: UserId,
        command: InitiatePaymentCommand,
    ) -> Result<InitiationOutcome, PaymentError> {
        // 1. Replay idempotente antes de intentar insertar.
        if let Some(existing) = self
            .payment_repo
            .find_by_client_request(user_id, &command.client_request_id)
            .await?
        {
            return self.resolve_existing(existing, command).await;
        }

        // 2. Inserción del pago nuevo.
        let payment = Payment::new(
            user_id,
            command.amount,
            command.currency.clone(),
            command.wallet_id,
            command.client_request_id.clone(),
            command.provider.clone(),
        )?;

        match self.payment_repo.insert(payment).await {
            Ok(saved) => {
                info!(
                    "Initiated payment {} for client request '{}'",
                    saved.id, saved.client_request_id
                );
                Ok(InitiationOutcome {
                    payment: saved,
                    is_new: true,
                })
            }
            // 3. Carrera perdida contra otra iniciación idéntica: la fila ya
            // existe. Re-leemos en una conexión fresca y resolvemos igual
            // que un replay.
            Err(PaymentError::DuplicateClientRequest) => {
                info!(
                    "Concurrent initiation for client request '{}', re-reading in a fresh context",
                    command.client_request_id
                );
                let existing = self
                    .payment_repo
                    .find_by_client_request(user_id, &command.client_request_id)
                    .await?
                    .ok_or_else(|| {
                        PaymentError::RepositoryError(
                            "Unique violation reported but no row found on re-read".to_string(),
                        )
                    })?;
                self.resolve_existing(existing, command).await
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_existing(
        &self,
        mut existing: Payment,
        command: InitiatePaymentCommand,
    ) -> Result<InitiationOutcome, PaymentError> {
        if existing.status != PaymentStatus::EXPIRED {
            // Replay: los valores almacenados ganan sobre los de la solicitud.
            return Ok(InitiationOutcome {
                payment: existing,
                is_new: false,
            });
        }

        // Reutilización de un pago expirado: la reescritura de monto/divisa/
        // billetera es intencional y queda registrada.
        warn!(
            "Reusing EXPIRED payment {}: amount {} -> {}, wallet {} -> {}",
            existing.id, existing.amount, command.amount, existing.wallet_id, command.wallet_id
        );

        existing.reset_for_reuse(
            command.amount,
            command.currency,
            command.wallet_id,
            command.provider,
        )?;
        let updated = self.payment_repo.update_with_version(&existing).await?;

        Ok(InitiationOutcome {
            payment: updated,
            is_new: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockPaymentRepository;
    use mockall::predicate::eq;
    use std::str::FromStr;

    fn command(client_request_id: &str) -> InitiatePaymentCommand {
        InitiatePaymentCommand {
            amount: Decimal::from_str("25.00").unwrap(),
            currency: None,
            wallet_id: Uuid::new_v4(),
            client_request_id: client_request_id.to_string(),
            provider: None,
        }
    }

    fn stored_payment(user_id: UserId, client_request_id: &str, status: PaymentStatus) -> Payment {
        let mut p = Payment::new(
            user_id,
            Decimal::from_str("25.00").unwrap(),
            None,
            Uuid::new_v4(),
            client_request_id.to_string(),
            None,
        )
        .unwrap();
        p.status = status;
        p
    }

    #[tokio::test]
    async fn test_new_request_inserts_payment() {
        let mut repo = MockPaymentRepository::new();
        let user_id = UserId::new();

        repo.expect_find_by_client_request()
            .with(eq(user_id), eq("abc"))
            .times(1)
            .returning(|_, _| Ok(None));
        repo.expect_insert().times(1).returning(|p| Ok(p));

        let use_case = InitiatePaymentUseCase::new(Arc::new(repo));
        let outcome = use_case.execute(user_id, command("abc")).await.unwrap();

        assert!(outcome.is_new);
        assert_eq!(outcome.payment.status, PaymentStatus::INITIATED);
        assert_eq!(outcome.payment.client_request_id, "abc");
    }

    #[tokio::test]
    async fn test_duplicate_request_replays_existing_payment() {
        // L1: la segunda iniciación devuelve el mismo pago con is_new=false
        // y los valores almacenados ganan sobre los del nuevo request.
        let mut repo = MockPaymentRepository::new();
        let user_id = UserId::new();
        let existing = stored_payment(user_id, "dup", PaymentStatus::INITIATED);
        let existing_id = existing.id;

        repo.expect_find_by_client_request()
            .returning(move |_, _| Ok(Some(existing.clone())));
        repo.expect_insert().times(0);

        let use_case = InitiatePaymentUseCase::new(Arc::new(repo));

        let mut cmd = command("dup");
        cmd.amount = Decimal::from_str("999.00").unwrap();
        let outcome = use_case.execute(user_id, cmd).await.unwrap();

        assert!(!outcome.is_new);
        assert_eq!(outcome.payment.id, existing_id);
        assert_eq!(outcome.payment.amount, Decimal::from_str("25.00").unwrap());
    }

    #[tokio::test]
    async fn test_expired_payment_is_reset_in_place() {
        let mut repo = MockPaymentRepository::new();
        let user_id = UserId::new();
        let mut expired = stored_payment(user_id, "exp", PaymentStatus::EXPIRED);
        expired.provider_transaction_id = Some("old_tx".to_string());
        expired.wallet_transaction_id = Some(Uuid::new_v4());
        let expired_id = expired.id;

        repo.expect_find_by_client_request()
            .returning(move |_, _| Ok(Some(expired.clone())));
        repo.expect_update_with_version()
            .withf(move |p| {
                p.id == expired_id
                    && p.status == PaymentStatus::INITIATED
                    && p.amount == Decimal::from_str("40.00").unwrap()
                    && p.provider_transaction_id.is_none()
                    && p.wallet_transaction_id.is_none()
            })
            .times(1)
            .returning(|p| Ok(p.clone()));

        let use_case = InitiatePaymentUseCase::new(Arc::new(repo));

        let mut cmd = command("exp");
        cmd.amount = Decimal::from_str("40.00").unwrap();
        let outcome = use_case.execute(user_id, cmd).await.unwrap();

        assert!(outcome.is_new);
        assert_eq!(outcome.payment.id, expired_id);
    }

    #[tokio::test]
    async fn test_unique_violation_recovers_by_re_reading() {
        // La inserción pierde la carrera; la recuperación re-lee y hace replay.
        let mut repo = MockPaymentRepository::new();
        let user_id = UserId::new();
        let winner = stored_payment(user_id, "race", PaymentStatus::INITIATED);
        let winner_id = winner.id;

        let mut reads = 0;
        repo.expect_find_by_client_request().returning(move |_, _| {
            reads += 1;
            if reads == 1 {
                // Primera lectura: la fila del competidor aún no es visible.
                Ok(None)
            } else {
                Ok(Some(winner.clone()))
            }
        });
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(PaymentError::DuplicateClientRequest));

        let use_case = InitiatePaymentUseCase::new(Arc::new(repo));
        let outcome = use_case.execute(user_id, command("race")).await.unwrap();

        assert!(!outcome.is_new);
        assert_eq!(outcome.payment.id, winner_id);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let mut repo = MockPaymentRepository::new();
        repo.expect_find_by_client_request().returning(|_, _| Ok(None));

        let use_case = InitiatePaymentUseCase::new(Arc::new(repo));
        let mut cmd = command("bad");
        cmd.amount = Decimal::ZERO;

        let result = use_case.execute(UserId::new(), cmd).await;
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }
}
