use crate::domain::entities::{MonthlySummary, Wallet, WalletTransaction};
use crate::domain::error::WalletError;
use crate::domain::types::{UserId, WalletId, WalletTransactionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// Resultado de una mutación compare-and-set sobre la billetera.
///
/// `Conflict` significa cero filas afectadas: o la versión esperada cambió
/// bajo nuestros pies, o la guardia de saldo disponible dejó de cumplirse.
/// El caso de uso debe re-leer para distinguir ambas situaciones.
#[derive(Debug, Clone)]
pub enum CasResult {
    /// La mutación aplicó; contiene el estado posterior de la billetera.
    Applied(Wallet),
    Conflict,
}

// Interface (Port) for Wallet persistence.
//
// Las mutaciones del ledger son métodos compuestos: cada uno es UNA
// transacción SQL en la implementación, de modo que el ajuste de saldos y
// la escritura del diario nunca se separen.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Wallet>, WalletError>;

    async fn create(&self, wallet: Wallet) -> Result<Wallet, WalletError>;

    /// Fase 1 del two-phase commit: `reserved_balance += amount` con CAS
    /// sobre `version` y guardia `balance - reserved_balance >= amount`,
    /// más el débito PENDING en el diario. Todo o nada.
    async fn apply_reservation(
        &self,
        wallet_id: WalletId,
        expected_version: i32,
        entry: WalletTransaction,
    ) -> Result<CasResult, WalletError>;

    /// Fase 2 (commit): `balance -= amount`, `reserved_balance -= amount`,
    /// movimiento a COMPLETED. Falla con `InvalidState` si la reserva ya no
    /// respalda la resta.
    async fn apply_confirmation(
        &self,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
        amount: Decimal,
    ) -> Result<(), WalletError>;

    /// Fase 2 (abort): `reserved_balance -= amount`, movimiento a
    /// CANCELLED. El `balance` no se toca.
    async fn apply_cancellation(
        &self,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
        amount: Decimal,
    ) -> Result<(), WalletError>;

    /// Top-up: `balance += amount` con CAS sobre `version`, más el crédito
    /// COMPLETED en el diario.
    async fn apply_credit(
        &self,
        wallet_id: WalletId,
        expected_version: i32,
        entry: WalletTransaction,
    ) -> Result<CasResult, WalletError>;

    /// Transferencia: débito CAS sobre la billetera pagadora (con guardia
    /// de saldo disponible), crédito sobre la receptora y las dos entradas
    /// COMPLETED del diario, en una sola transacción.
    async fn apply_transfer(
        &self,
        payer_id: WalletId,
        payer_expected_version: i32,
        recipient_id: WalletId,
        amount: Decimal,
        debit_entry: WalletTransaction,
        credit_entry: WalletTransaction,
    ) -> Result<CasResult, WalletError>;
}

// Interface (Port) for the transaction journal (read side).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WalletTransactionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError>;

    /// Búsqueda por la llave de idempotencia `(reference_id, PAYMENT)`.
    async fn find_by_payment_reference(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<WalletTransaction>, WalletError>;

    /// Historial paginado (página 1-based, 10 elementos, más reciente primero).
    async fn find_history(
        &self,
        wallet_id: WalletId,
        page: u32,
    ) -> Result<Vec<WalletTransaction>, WalletError>;

    /// Agregado mensual de créditos/débitos COMPLETED de un usuario.
    async fn monthly_summary(
        &self,
        user_id: UserId,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, WalletError>;

    /// Reservas PENDING más viejas que el corte, para conciliación.
    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, WalletError>;
}
