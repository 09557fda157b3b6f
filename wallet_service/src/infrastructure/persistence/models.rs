use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::entities::{
    ReferenceType, TransactionStatus, TransactionType, Wallet, WalletTransaction,
};
use crate::domain::error::WalletError;
use crate::domain::types::{UserId, WalletId, WalletTransactionId};

// Modelo de Base de Datos para Wallet (específico de SQLx).
// Representa la tabla 'wallets' en PostgreSQL.
#[derive(Debug, FromRow)]
pub struct WalletModel {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: Decimal,
    pub reserved_balance: Decimal,
    pub currency: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Conversión Dominio -> Modelo (Move Semantics, sin clones costosos).
impl From<Wallet> for WalletModel {
    fn from(w: Wallet) -> Self {
        Self {
            id: w.id(),
            user_id: w.user_id(),
            balance: w.balance(),
            reserved_balance: w.reserved_balance(),
            currency: w.currency().to_string(),
            version: w.version(),
            created_at: w.created_at(),
            updated_at: w.updated_at(),
        }
    }
}

// Conversión Modelo -> Dominio.
// Es falible: la reconstitución re-valida los invariantes de la billetera,
// de modo que un estado imposible en BD no se propague en silencio.
impl TryFrom<WalletModel> for Wallet {
    type Error = WalletError;

    fn try_from(m: WalletModel) -> Result<Self, Self::Error> {
        Wallet::reconstitute(
            m.id,
            m.user_id,
            m.balance,
            m.reserved_balance,
            m.currency,
            m.version,
            m.created_at,
            m.updated_at,
        )
    }
}

// Modelo de Base de Datos para WalletTransaction.
// Representa la tabla 'wallet_transactions'.
#[derive(Debug, FromRow)]
pub struct WalletTransactionModel {
    pub id: WalletTransactionId,
    pub wallet_id: WalletId,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&WalletTransaction> for WalletTransactionModel {
    fn from(t: &WalletTransaction) -> Self {
        Self {
            id: t.id,
            wallet_id: t.wallet_id,
            amount: t.amount,
            transaction_type: t.transaction_type,
            status: t.status,
            reference_id: t.reference_id,
            reference_type: t.reference_type,
            description: t.description.clone(),
            created_at: t.created_at,
        }
    }
}

impl From<WalletTransactionModel> for WalletTransaction {
    fn from(m: WalletTransactionModel) -> Self {
        Self {
            id: m.id,
            wallet_id: m.wallet_id,
            amount: m.amount,
            transaction_type: m.transaction_type,
            status: m.status,
            reference_id: m.reference_id,
            reference_type: m.reference_type,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

// Fila del agregado mensual (SUMs con FILTER en SQL).
#[derive(Debug, FromRow)]
pub struct MonthlySummaryRow {
    pub total_credit: Decimal,
    pub total_debit: Decimal,
}
