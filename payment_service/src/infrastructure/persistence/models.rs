use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::entities::{Payment, PaymentStatus};
use crate::domain::provider::ProviderFailureCode;
use crate::domain::types::{PaymentId, UserId};

// Modelo de Base de Datos para Payment (específico de SQLx).
// Representa la tabla 'payments' en PostgreSQL. El código de fallo se
// persiste como texto para no acoplar el enum del proveedor a un tipo de BD.
#[derive(Debug, FromRow)]
pub struct PaymentModel {
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
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentModel {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            amount: p.amount,
            currency: p.currency.clone(),
            client_request_id: p.client_request_id.clone(),
            wallet_id: p.wallet_id,
            status: p.status,
            version: p.version,
            provider: p.provider.clone(),
            provider_transaction_id: p.provider_transaction_id.clone(),
            wallet_transaction_id: p.wallet_transaction_id,
            failure_code: p.failure_code.map(|c| c.to_string()),
            failure_message: p.failure_message.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

// Reconstrucción falible: un código de fallo desconocido en BD es un dato
// corrupto y se reporta, no se ignora.
impl TryFrom<PaymentModel> for Payment {
    type Error = String;

    fn try_from(m: PaymentModel) -> Result<Self, Self::Error> {
        let failure_code = m
            .failure_code
            .as_deref()
            .map(ProviderFailureCode::from_str)
            .transpose()?;

        Ok(Self {
            id: m.id,
            user_id: m.user_id,
            amount: m.amount,
            currency: m.currency,
            client_request_id: m.client_request_id,
            wallet_id: m.wallet_id,
            status: m.status,
            version: m.version,
            provider: m.provider,
            provider_transaction_id: m.provider_transaction_id,
            wallet_transaction_id: m.wallet_transaction_id,
            failure_code,
            failure_message: m.failure_message,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}
