use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::WalletError;
use crate::domain::types::{UserId, WalletId, WalletTransactionId};

/// Divisa por defecto de la plataforma cuando el cliente no especifica una.
pub const DEFAULT_CURRENCY: &str = "SGD";

/// Tipo de movimiento sobre una billetera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    CREDIT,
    DEBIT,
}

/// Estado de un movimiento del diario.
///
/// Las transiciones legales son `PENDING -> COMPLETED` y
/// `PENDING -> CANCELLED`; los estados terminales nunca cambian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    PENDING,
    COMPLETED,
    CANCELLED,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::COMPLETED | TransactionStatus::CANCELLED)
    }

    /// Valida la máquina de estados del diario.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::PENDING, TransactionStatus::COMPLETED)
                | (TransactionStatus::PENDING, TransactionStatus::CANCELLED)
        )
    }
}

/// Naturaleza de la referencia externa de un movimiento.
///
/// Para `PAYMENT`, el par `(reference_id, reference_type)` es único: es la
/// llave de idempotencia del protocolo de reservas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_reference_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    TOPUP,
    TRANSFER,
    PAYMENT,
}

/// Modelo de Entidad: Wallet.
///
/// Billetera de un usuario con saldo y saldo reservado, protegida con
/// optimistic locking (`version`). Invariantes en reposo:
///
/// * `reserved_balance >= 0`
/// * `balance - reserved_balance >= 0` (el saldo disponible nunca es negativo)
/// * `version` crece estrictamente con cada mutación
///
/// # Examples
/// ```
/// use wallet_service::domain::entities::Wallet;
/// use wallet_service::domain::types::UserId;
///
/// let wallet = Wallet::builder()
///     .user_id(UserId::new())
///     .currency("SGD".to_string())
///     .build();
/// assert!(wallet.is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    id: WalletId,
    user_id: UserId,
    balance: Decimal,
    reserved_balance: Decimal,
    currency: String,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Inicia la construcción de una instancia `Wallet` con el patrón Builder.
    pub fn builder() -> WalletBuilder {
        WalletBuilder::default()
    }

    /// Reconstruye una billetera cargada desde la persistencia.
    ///
    /// Valida los invariantes de dominio: si la base de datos contiene un
    /// estado imposible (reservado negativo, disponible negativo), el error
    /// se reporta en lugar de propagar datos corruptos.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: WalletId,
        user_id: UserId,
        balance: Decimal,
        reserved_balance: Decimal,
        currency: String,
        version: i32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, WalletError> {
        if reserved_balance < Decimal::ZERO {
            return Err(WalletError::InvalidData(
                "La reserva de la billetera no puede ser negativa".into(),
            ));
        }
        if balance - reserved_balance < Decimal::ZERO {
            return Err(WalletError::InvalidData(
                "El saldo disponible de la billetera no puede ser negativo".into(),
            ));
        }

        let currency = currency.trim().to_uppercase();
        if currency.len() != 3 {
            return Err(WalletError::InvalidData(
                "La divisa debe ser un código ISO de 3 letras".into(),
            ));
        }

        Ok(Self {
            id,
            user_id,
            balance,
            reserved_balance,
            currency,
            version,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn reserved_balance(&self) -> Decimal {
        self.reserved_balance
    }

    /// Saldo disponible: `balance - reserved_balance`. Es la cantidad que
    /// puede gastarse o reservarse de nuevo.
    pub fn available_balance(&self) -> Decimal {
        self.balance - self.reserved_balance
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Builder para asegurar que toda `Wallet` nueva nace con estado válido.
///
/// # Examples
/// ```
/// use wallet_service::domain::entities::WalletBuilder;
/// use wallet_service::domain::types::UserId;
///
/// let wallet = WalletBuilder::default()
///     .user_id(UserId::new())
///     .build()
///     .unwrap();
/// assert_eq!(wallet.currency(), "SGD");
/// ```
#[derive(Default)]
pub struct WalletBuilder {
    user_id: Option<UserId>,
    currency: Option<String>,
}

impl WalletBuilder {
    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn currency(mut self, currency: String) -> Self {
        self.currency = Some(currency);
        self
    }

    /// Construye y valida la entidad. La divisa omitida cae a `SGD`; los
    /// saldos nacen en cero y la versión en cero.
    pub fn build(self) -> Result<Wallet, WalletError> {
        let user_id = self
            .user_id
            .ok_or_else(|| WalletError::InvalidData("El campo user_id es obligatorio".into()))?;

        let currency = self
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
            .trim()
            .to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(WalletError::InvalidData(
                "La divisa debe ser un código ISO de 3 letras".into(),
            ));
        }

        let now = Utc::now();
        Ok(Wallet {
            id: WalletId::new(),
            user_id,
            balance: Decimal::ZERO,
            reserved_balance: Decimal::ZERO,
            currency,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Modelo de Entidad: WalletTransaction.
///
/// Entrada del diario de una billetera. Inmutable salvo por el `status`:
/// una reserva nace `PENDING` y solo puede completarse o cancelarse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
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

impl WalletTransaction {
    /// Reserva de fondos: débito `PENDING` referenciando el pago que la causó.
    pub fn pending_debit(
        wallet_id: WalletId,
        amount: Decimal,
        payment_id: Uuid,
        description: impl Into<String>,
    ) -> Result<Self, WalletError> {
        Self::new(
            wallet_id,
            amount,
            TransactionType::DEBIT,
            TransactionStatus::PENDING,
            Some(payment_id),
            Some(ReferenceType::PAYMENT),
            description.into(),
        )
    }

    /// Abono directo ya liquidado (top-up o pata receptora de un transfer).
    pub fn completed_credit(
        wallet_id: WalletId,
        amount: Decimal,
        reference_id: Option<Uuid>,
        reference_type: ReferenceType,
        description: impl Into<String>,
    ) -> Result<Self, WalletError> {
        Self::new(
            wallet_id,
            amount,
            TransactionType::CREDIT,
            TransactionStatus::COMPLETED,
            reference_id,
            Some(reference_type),
            description.into(),
        )
    }

    /// Débito ya liquidado (pata pagadora de un transfer).
    pub fn completed_debit(
        wallet_id: WalletId,
        amount: Decimal,
        reference_id: Option<Uuid>,
        reference_type: ReferenceType,
        description: impl Into<String>,
    ) -> Result<Self, WalletError> {
        Self::new(
            wallet_id,
            amount,
            TransactionType::DEBIT,
            TransactionStatus::COMPLETED,
            reference_id,
            Some(reference_type),
            description.into(),
        )
    }

    fn new(
        wallet_id: WalletId,
        amount: Decimal,
        transaction_type: TransactionType,
        status: TransactionStatus,
        reference_id: Option<Uuid>,
        reference_type: Option<ReferenceType>,
        description: String,
    ) -> Result<Self, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidData(
                "El monto de un movimiento debe ser positivo".into(),
            ));
        }

        Ok(Self {
            id: WalletTransactionId::new(),
            wallet_id,
            amount,
            transaction_type,
            status,
            reference_id,
            reference_type,
            description,
            created_at: Utc::now(),
        })
    }
}

/// Agregado mensual de movimientos COMPLETED de un usuario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub total_credit: Decimal,
    pub total_debit: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_builder_defaults_currency_to_sgd() {
        let wallet = Wallet::builder().user_id(UserId::new()).build().unwrap();
        assert_eq!(wallet.currency(), "SGD");
        assert_eq!(wallet.balance(), Decimal::ZERO);
        assert_eq!(wallet.reserved_balance(), Decimal::ZERO);
        assert_eq!(wallet.version(), 0);
    }

    #[test]
    fn test_builder_rejects_bad_currency() {
        let result = Wallet::builder()
            .user_id(UserId::new())
            .currency("SGDX".to_string())
            .build();
        assert!(matches!(result, Err(WalletError::InvalidData(_))));
    }

    #[test]
    fn test_reconstitute_rejects_negative_available_balance() {
        let result = Wallet::reconstitute(
            WalletId::new(),
            UserId::new(),
            Decimal::from(50),
            Decimal::from(80),
            "SGD".to_string(),
            3,
            Utc::now(),
            Utc::now(),
        );
        assert!(matches!(result, Err(WalletError::InvalidData(_))));
    }

    #[test]
    fn test_available_balance() {
        let wallet = Wallet::reconstitute(
            WalletId::new(),
            UserId::new(),
            Decimal::from_str("100.00").unwrap(),
            Decimal::from_str("25.00").unwrap(),
            "SGD".to_string(),
            1,
            Utc::now(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(wallet.available_balance(), Decimal::from_str("75.00").unwrap());
    }

    #[test]
    fn test_transaction_rejects_non_positive_amount() {
        let result = WalletTransaction::pending_debit(
            WalletId::new(),
            Decimal::ZERO,
            Uuid::new_v4(),
            "reserva",
        );
        assert!(matches!(result, Err(WalletError::InvalidData(_))));
    }

    #[test]
    fn test_status_transitions() {
        assert!(TransactionStatus::PENDING.can_transition_to(TransactionStatus::COMPLETED));
        assert!(TransactionStatus::PENDING.can_transition_to(TransactionStatus::CANCELLED));
        assert!(!TransactionStatus::COMPLETED.can_transition_to(TransactionStatus::CANCELLED));
        assert!(!TransactionStatus::CANCELLED.can_transition_to(TransactionStatus::COMPLETED));
        assert!(TransactionStatus::COMPLETED.is_terminal());
    }
}
