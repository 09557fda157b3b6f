use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::PaymentError;
use crate::domain::provider::ProviderFailureCode;
use crate::domain::types::{PaymentId, UserId};

/// Divisa por defecto cuando la solicitud no trae una.
pub const DEFAULT_CURRENCY: &str = "SGD";

/// Estado del ciclo de vida de un pago.
///
/// Transiciones legales:
///
/// * `INITIATED -> PENDING | SUCCESS | FAILED | EXPIRED`
/// * `PENDING -> SUCCESS | FAILED`
/// * `EXPIRED -> INITIATED` (solo vía reutilización, refrescando la solicitud)
///
/// `SUCCESS` y `FAILED` son terminales: nunca transicionan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    INITIATED,
    PENDING,
    SUCCESS,
    FAILED,
    EXPIRED,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::SUCCESS | PaymentStatus::FAILED)
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::INITIATED, PaymentStatus::PENDING)
                | (PaymentStatus::INITIATED, PaymentStatus::SUCCESS)
                | (PaymentStatus::INITIATED, PaymentStatus::FAILED)
                | (PaymentStatus::INITIATED, PaymentStatus::EXPIRED)
                | (PaymentStatus::PENDING, PaymentStatus::SUCCESS)
                | (PaymentStatus::PENDING, PaymentStatus::FAILED)
                | (PaymentStatus::EXPIRED, PaymentStatus::INITIATED)
        )
    }
}

/// Modelo de Entidad: Payment.
///
/// Registro del orquestador para un intento de pago. La unicidad de
/// `(client_request_id, user_id)` es la llave de idempotencia de la
/// iniciación; `version` protege cada transición con compare-and-set.
///
/// Las referencias cruzadas (billetera, movimiento del ledger, transacción
/// del proveedor) son identificadores opacos: este servicio nunca lee las
/// tablas del ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub client_request_id: String,
    pub wallet_id: Uuid,
    pub status: PaymentStatus,
    pub version: i32,
    pub provider: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub wallet_transaction_id: Option<Uuid>,
    pub failure_code: Option<ProviderFailureCode>,
    pub failure_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Crea un pago nuevo en `INITIATED`, validando la solicitud.
    pub fn new(
        user_id: UserId,
        amount: Decimal,
        currency: Option<String>,
        wallet_id: Uuid,
        client_request_id: String,
        provider: Option<String>,
    ) -> Result<Self, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }
        if client_request_id.trim().is_empty() {
            return Err(PaymentError::Validation(
                "clientRequestId must not be blank".to_string(),
            ));
        }

        let currency = normalize_currency(currency)?;

        let now = Utc::now();
        Ok(Self {
            id: PaymentId::new(),
            user_id,
            amount,
            currency,
            client_request_id,
            wallet_id,
            status: PaymentStatus::INITIATED,
            version: 0,
            provider,
            provider_transaction_id: None,
            wallet_transaction_id: None,
            failure_code: None,
            failure_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition_to(&mut self, next: PaymentStatus) -> Result<(), PaymentError> {
        if !self.status.can_transition_to(next) {
            return Err(PaymentError::InvalidStatusTransition(format!(
                "Cannot transition payment {} from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cobro comprometido externamente: el pago queda `SUCCESS` con las
    /// referencias del proveedor y del movimiento del ledger.
    pub fn mark_success(
        &mut self,
        provider: String,
        provider_transaction_id: Option<String>,
        wallet_transaction_id: Option<Uuid>,
    ) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::SUCCESS)?;
        self.provider = Some(provider);
        self.provider_transaction_id = provider_transaction_id;
        self.wallet_transaction_id = wallet_transaction_id;
        self.failure_code = None;
        self.failure_message = None;
        Ok(())
    }

    /// El proveedor aceptó el cargo pero aún no lo liquida.
    pub fn mark_pending(
        &mut self,
        provider: String,
        provider_transaction_id: Option<String>,
        wallet_transaction_id: Option<Uuid>,
    ) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::PENDING)?;
        self.provider = Some(provider);
        self.provider_transaction_id = provider_transaction_id;
        self.wallet_transaction_id = wallet_transaction_id;
        Ok(())
    }

    /// Rechazo definitivo: el pago queda `FAILED` con su clasificación.
    pub fn mark_failed(
        &mut self,
        failure_code: Option<ProviderFailureCode>,
        failure_message: Option<String>,
    ) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::FAILED)?;
        self.failure_code = failure_code;
        self.failure_message = failure_message;
        Ok(())
    }

    pub fn mark_expired(&mut self) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::EXPIRED)
    }

    /// Reutilización de un pago `EXPIRED`: vuelve a `INITIATED` con los
    /// campos de la nueva solicitud y las referencias de proveedor/ledger
    /// limpias. La última solicitud es la autoritativa sobre monto, divisa
    /// y billetera.
    pub fn reset_for_reuse(
        &mut self,
        amount: Decimal,
        currency: Option<String>,
        wallet_id: Uuid,
        provider: Option<String>,
    ) -> Result<(), PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        self.transition_to(PaymentStatus::INITIATED)?;
        self.amount = amount;
        self.currency = normalize_currency(currency)?;
        self.wallet_id = wallet_id;
        self.provider = provider;
        self.provider_transaction_id = None;
        self.wallet_transaction_id = None;
        self.failure_code = None;
        self.failure_message = None;
        Ok(())
    }
}

fn normalize_currency(currency: Option<String>) -> Result<String, PaymentError> {
    let currency = currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
        .trim()
        .to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PaymentError::Validation(
            "Currency must be a 3-letter ISO code".to_string(),
        ));
    }
    Ok(currency)
}
