//! Tests de las leyes del protocolo del ledger contra una implementación
//! en memoria de los puertos de persistencia.
//!
//! El fake reproduce la semántica de las queries reales (compare-and-set
//! sobre `version`, guardia de saldo disponible, unicidad de la referencia
//! de pago) para poder afirmar las propiedades de punta a punta:
//! reservar N veces deja UNA reserva, reserve+cancel restaura los saldos,
//! reserve+confirm descuenta, y la versión avanza de uno en uno.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wallet_service::domain::entities::{
    TransactionStatus, TransactionType, Wallet, WalletTransaction,
};
use wallet_service::domain::error::WalletError;
use wallet_service::domain::repository::{
    CasResult, WalletRepository, WalletTransactionRepository,
};
use wallet_service::domain::types::{UserId, WalletId, WalletTransactionId};
use wallet_service::use_cases::cancel_reservation::CancelReservationUseCase;
use wallet_service::use_cases::confirm_reservation::ConfirmReservationUseCase;
use wallet_service::use_cases::reserve_funds::ReserveFundsUseCase;
use wallet_service::use_cases::top_up::TopUpUseCase;
use wallet_service::use_cases::transfer::TransferUseCase;

/// Ledger en memoria con la misma semántica de guardias que el Postgres real.
#[derive(Default)]
struct InMemoryLedger {
    wallets: Mutex<HashMap<WalletId, Wallet>>,
    entries: Mutex<HashMap<WalletTransactionId, WalletTransaction>>,
}

impl InMemoryLedger {
    fn seed_wallet(&self, user_id: UserId, balance: &str) -> WalletId {
        let wallet_id = WalletId::new();
        let wallet = Wallet::reconstitute(
            wallet_id,
            user_id,
            Decimal::from_str(balance).unwrap(),
            Decimal::ZERO,
            "SGD".to_string(),
            1,
            Utc::now(),
            Utc::now(),
        )
        .unwrap();
        self.wallets.lock().unwrap().insert(wallet_id, wallet);
        wallet_id
    }

    fn wallet(&self, id: WalletId) -> Wallet {
        self.wallets.lock().unwrap().get(&id).cloned().unwrap()
    }

    fn entries_for(&self, wallet_id: WalletId) -> Vec<WalletTransaction> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect()
    }

    fn rebuild(
        wallet: &Wallet,
        balance: Decimal,
        reserved: Decimal,
        version: i32,
    ) -> Result<Wallet, WalletError> {
        Wallet::reconstitute(
            wallet.id(),
            wallet.user_id(),
            balance,
            reserved,
            wallet.currency().to_string(),
            version,
            wallet.created_at(),
            Utc::now(),
        )
    }
}

#[async_trait]
impl WalletRepository for InMemoryLedger {
    async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        Ok(self.wallets.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Wallet>, WalletError> {
        Ok(self
            .wallets
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, wallet: Wallet) -> Result<Wallet, WalletError> {
        self.wallets.lock().unwrap().insert(wallet.id(), wallet.clone());
        Ok(wallet)
    }

    async fn apply_reservation(
        &self,
        wallet_id: WalletId,
        expected_version: i32,
        entry: WalletTransaction,
    ) -> Result<CasResult, WalletError> {
        let mut wallets = self.wallets.lock().unwrap();
        let Some(wallet) = wallets.get(&wallet_id) else {
            return Ok(CasResult::Conflict);
        };
        // Mismas guardias que el UPDATE real.
        if wallet.version() != expected_version
            || wallet.balance() - wallet.reserved_balance() < entry.amount
        {
            return Ok(CasResult::Conflict);
        }
        // Unicidad de (reference_id, PAYMENT).
        let mut entries = self.entries.lock().unwrap();
        if entries.values().any(|t| {
            t.reference_id == entry.reference_id && t.reference_type == entry.reference_type
        }) {
            return Ok(CasResult::Conflict);
        }

        let updated = Self::rebuild(
            wallet,
            wallet.balance(),
            wallet.reserved_balance() + entry.amount,
            wallet.version() + 1,
        )?;
        wallets.insert(wallet_id, updated.clone());
        entries.insert(entry.id, entry);
        Ok(CasResult::Applied(updated))
    }

    async fn apply_confirmation(
        &self,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let mut wallets = self.wallets.lock().unwrap();
        let wallet = wallets
            .get(&wallet_id)
            .ok_or(WalletError::NotFound(wallet_id))?;
        if wallet.reserved_balance() < amount {
            return Err(WalletError::InvalidState(
                "Reserved balance does not cover the confirmation".to_string(),
            ));
        }

        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&transaction_id)
            .ok_or(WalletError::TransactionNotFound(transaction_id))?;
        if entry.status != TransactionStatus::PENDING {
            return Err(WalletError::InvalidState(
                "Wallet transaction is not PENDING".to_string(),
            ));
        }

        entry.status = TransactionStatus::COMPLETED;
        let updated = Self::rebuild(
            wallet,
            wallet.balance() - amount,
            wallet.reserved_balance() - amount,
            wallet.version() + 1,
        )?;
        wallets.insert(wallet_id, updated);
        Ok(())
    }

    async fn apply_cancellation(
        &self,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let mut wallets = self.wallets.lock().unwrap();
        let wallet = wallets
            .get(&wallet_id)
            .ok_or(WalletError::NotFound(wallet_id))?;
        if wallet.reserved_balance() < amount {
            return Err(WalletError::InvalidState(
                "Reserved balance does not cover the cancellation".to_string(),
            ));
        }

        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&transaction_id)
            .ok_or(WalletError::TransactionNotFound(transaction_id))?;
        if entry.status != TransactionStatus::PENDING {
            return Err(WalletError::InvalidState(
                "Wallet transaction is not PENDING".to_string(),
            ));
        }

        entry.status = TransactionStatus::CANCELLED;
        let updated = Self::rebuild(
            wallet,
            wallet.balance(),
            wallet.reserved_balance() - amount,
            wallet.version() + 1,
        )?;
        wallets.insert(wallet_id, updated);
        Ok(())
    }

    async fn apply_credit(
        &self,
        wallet_id: WalletId,
        expected_version: i32,
        entry: WalletTransaction,
    ) -> Result<CasResult, WalletError> {
        let mut wallets = self.wallets.lock().unwrap();
        let Some(wallet) = wallets.get(&wallet_id) else {
            return Ok(CasResult::Conflict);
        };
        if wallet.version() != expected_version {
            return Ok(CasResult::Conflict);
        }

        let updated = Self::rebuild(
            wallet,
            wallet.balance() + entry.amount,
            wallet.reserved_balance(),
            wallet.version() + 1,
        )?;
        wallets.insert(wallet_id, updated.clone());
        self.entries.lock().unwrap().insert(entry.id, entry);
        Ok(CasResult::Applied(updated))
    }

    async fn apply_transfer(
        &self,
        payer_id: WalletId,
        payer_expected_version: i32,
        recipient_id: WalletId,
        amount: Decimal,
        debit_entry: WalletTransaction,
        credit_entry: WalletTransaction,
    ) -> Result<CasResult, WalletError> {
        let mut wallets = self.wallets.lock().unwrap();
        let Some(payer) = wallets.get(&payer_id) else {
            return Ok(CasResult::Conflict);
        };
        if payer.version() != payer_expected_version
            || payer.balance() - payer.reserved_balance() < amount
        {
            return Ok(CasResult::Conflict);
        }
        let recipient = wallets
            .get(&recipient_id)
            .ok_or(WalletError::NotFound(recipient_id))?
            .clone();

        let updated_payer = Self::rebuild(
            payer,
            payer.balance() - amount,
            payer.reserved_balance(),
            payer.version() + 1,
        )?;
        let updated_recipient = Self::rebuild(
            &recipient,
            recipient.balance() + amount,
            recipient.reserved_balance(),
            recipient.version() + 1,
        )?;
        wallets.insert(payer_id, updated_payer.clone());
        wallets.insert(recipient_id, updated_recipient);

        let mut entries = self.entries.lock().unwrap();
        entries.insert(debit_entry.id, debit_entry);
        entries.insert(credit_entry.id, credit_entry);
        Ok(CasResult::Applied(updated_payer))
    }
}

#[async_trait]
impl WalletTransactionRepository for InMemoryLedger {
    async fn find_by_id(
        &self,
        id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        Ok(self.entries.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_payment_reference(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .find(|t| {
                t.reference_id == Some(payment_id)
                    && t.reference_type
                        == Some(wallet_service::domain::entities::ReferenceType::PAYMENT)
            })
            .cloned())
    }

    async fn find_history(
        &self,
        wallet_id: WalletId,
        _page: u32,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect())
    }

    async fn monthly_summary(
        &self,
        _user_id: UserId,
        year: i32,
        month: u32,
    ) -> Result<wallet_service::domain::entities::MonthlySummary, WalletError> {
        Ok(wallet_service::domain::entities::MonthlySummary {
            year,
            month,
            total_credit: Decimal::ZERO,
            total_debit: Decimal::ZERO,
        })
    }

    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TransactionStatus::PENDING && t.created_at < cutoff)
            .cloned()
            .collect())
    }
}

fn use_cases(
    ledger: &Arc<InMemoryLedger>,
) -> (
    ReserveFundsUseCase,
    ConfirmReservationUseCase,
    CancelReservationUseCase,
) {
    let wallet_repo: Arc<dyn WalletRepository> = ledger.clone();
    let tx_repo: Arc<dyn WalletTransactionRepository> = ledger.clone();
    (
        ReserveFundsUseCase::new(wallet_repo.clone(), tx_repo.clone()),
        ConfirmReservationUseCase::new(wallet_repo.clone(), tx_repo.clone()),
        CancelReservationUseCase::new(wallet_repo, tx_repo),
    )
}

#[tokio::test]
async fn test_reserve_is_idempotent_across_replays() {
    // Arrange
    let ledger = Arc::new(InMemoryLedger::default());
    let user_id = UserId::new();
    let wallet_id = ledger.seed_wallet(user_id, "100.00");
    let payment_id = Uuid::new_v4();
    let (reserve, _, _) = use_cases(&ledger);
    let amount = Decimal::from_str("25.00").unwrap();

    // Act: misma reserva tres veces.
    let first = reserve
        .execute(user_id, wallet_id, amount, None, payment_id)
        .await
        .unwrap();
    let second = reserve
        .execute(user_id, wallet_id, amount, None, payment_id)
        .await
        .unwrap();
    let third = reserve
        .execute(user_id, wallet_id, amount, None, payment_id)
        .await
        .unwrap();

    // Assert: una sola entrada PENDING y un solo delta de reserva.
    assert_eq!(first.wallet_transaction_id, second.wallet_transaction_id);
    assert_eq!(second.wallet_transaction_id, third.wallet_transaction_id);

    let wallet = ledger.wallet(wallet_id);
    assert_eq!(wallet.reserved_balance(), amount);
    assert_eq!(wallet.balance(), Decimal::from_str("100.00").unwrap());
    assert_eq!(ledger.entries_for(wallet_id).len(), 1);
}

#[tokio::test]
async fn test_reserve_then_cancel_restores_pre_reserve_state() {
    // Arrange
    let ledger = Arc::new(InMemoryLedger::default());
    let user_id = UserId::new();
    let wallet_id = ledger.seed_wallet(user_id, "100.00");
    let payment_id = Uuid::new_v4();
    let (reserve, _, cancel) = use_cases(&ledger);

    // Act
    let receipt = reserve
        .execute(
            user_id,
            wallet_id,
            Decimal::from_str("25.00").unwrap(),
            None,
            payment_id,
        )
        .await
        .unwrap();
    cancel
        .execute(user_id, wallet_id, receipt.wallet_transaction_id)
        .await
        .unwrap();

    // Assert: balance y reserva como antes; versión avanzó 1 por mutación.
    let wallet = ledger.wallet(wallet_id);
    assert_eq!(wallet.balance(), Decimal::from_str("100.00").unwrap());
    assert_eq!(wallet.reserved_balance(), Decimal::ZERO);
    assert_eq!(wallet.version(), 3);

    let entries = ledger.entries_for(wallet_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, TransactionStatus::CANCELLED);
}

#[tokio::test]
async fn test_reserve_then_confirm_settles_the_debit() {
    // Escenario feliz del ledger: 100.00 - 25.00 y reserva en cero.
    let ledger = Arc::new(InMemoryLedger::default());
    let user_id = UserId::new();
    let wallet_id = ledger.seed_wallet(user_id, "100.00");
    let payment_id = Uuid::new_v4();
    let (reserve, confirm, _) = use_cases(&ledger);

    let receipt = reserve
        .execute(
            user_id,
            wallet_id,
            Decimal::from_str("25.00").unwrap(),
            None,
            payment_id,
        )
        .await
        .unwrap();
    confirm
        .execute(
            user_id,
            wallet_id,
            receipt.wallet_transaction_id,
            "prov_tx_1".to_string(),
            "MOCK".to_string(),
        )
        .await
        .unwrap();

    let wallet = ledger.wallet(wallet_id);
    assert_eq!(wallet.balance(), Decimal::from_str("75.00").unwrap());
    assert_eq!(wallet.reserved_balance(), Decimal::ZERO);
    assert_eq!(wallet.version(), 3);

    let entries = ledger.entries_for(wallet_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, TransactionStatus::COMPLETED);
    assert_eq!(entries[0].transaction_type, TransactionType::DEBIT);
    assert_eq!(entries[0].reference_id, Some(payment_id));
}

#[tokio::test]
async fn test_confirm_and_cancel_are_idempotent_noops_on_terminal_entries() {
    let ledger = Arc::new(InMemoryLedger::default());
    let user_id = UserId::new();
    let wallet_id = ledger.seed_wallet(user_id, "100.00");
    let (reserve, confirm, cancel) = use_cases(&ledger);

    let receipt = reserve
        .execute(
            user_id,
            wallet_id,
            Decimal::from_str("25.00").unwrap(),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    confirm
        .execute(
            user_id,
            wallet_id,
            receipt.wallet_transaction_id,
            "prov_tx_1".to_string(),
            "MOCK".to_string(),
        )
        .await
        .unwrap();

    // Segundo confirm: no-op exitoso, los saldos no se mueven.
    confirm
        .execute(
            user_id,
            wallet_id,
            receipt.wallet_transaction_id,
            "prov_tx_1".to_string(),
            "MOCK".to_string(),
        )
        .await
        .unwrap();

    let wallet = ledger.wallet(wallet_id);
    assert_eq!(wallet.balance(), Decimal::from_str("75.00").unwrap());
    assert_eq!(wallet.version(), 3);

    // Cancelar un COMPLETED sí es un error de estado.
    let result = cancel
        .execute(user_id, wallet_id, receipt.wallet_transaction_id)
        .await;
    assert!(matches!(result, Err(WalletError::InvalidState(_))));
}

#[tokio::test]
async fn test_exact_available_balance_boundary() {
    let ledger = Arc::new(InMemoryLedger::default());
    let user_id = UserId::new();
    let wallet_id = ledger.seed_wallet(user_id, "30.00");
    let (reserve, _, _) = use_cases(&ledger);

    // Primera reserva deja disponible exactamente 10.00.
    reserve
        .execute(
            user_id,
            wallet_id,
            Decimal::from_str("20.00").unwrap(),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    // Reservar exactamente lo disponible pasa...
    let receipt = reserve
        .execute(
            user_id,
            wallet_id,
            Decimal::from_str("10.00").unwrap(),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.remaining_balance, Decimal::ZERO);

    // ...y un centavo más falla con INSUFFICIENT_BALANCE.
    let result = reserve
        .execute(
            user_id,
            wallet_id,
            Decimal::from_str("0.01").unwrap(),
            None,
            Uuid::new_v4(),
        )
        .await;
    assert!(matches!(result, Err(WalletError::InsufficientBalance(_))));
}

#[tokio::test]
async fn test_concurrent_reserves_race_for_the_last_funds() {
    // Dos reservas de 20 sobre un saldo de 30: exactamente una gana.
    let ledger = Arc::new(InMemoryLedger::default());
    let user_id = UserId::new();
    let wallet_id = ledger.seed_wallet(user_id, "30.00");

    let ledger_a = ledger.clone();
    let ledger_b = ledger.clone();
    let amount = Decimal::from_str("20.00").unwrap();

    let task = |l: Arc<InMemoryLedger>| {
        let (reserve, _, _) = use_cases(&l);
        async move {
            reserve
                .execute(user_id, wallet_id, amount, None, Uuid::new_v4())
                .await
        }
    };

    let (a, b) = tokio::join!(task(ledger_a), task(ledger_b));

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one reserve must win the race");

    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser,
        Err(WalletError::InsufficientBalance(_)) | Err(WalletError::ConcurrentModification(_))
    ));

    // El invariante I1 se sostiene: reservado <= balance.
    let wallet = ledger.wallet(wallet_id);
    assert!(wallet.reserved_balance() <= wallet.balance());
    assert_eq!(wallet.reserved_balance(), amount);
}

#[tokio::test]
async fn test_top_up_and_transfer_write_completed_entries() {
    let ledger = Arc::new(InMemoryLedger::default());
    let user_id = UserId::new();
    let payer_id = ledger.seed_wallet(user_id, "50.00");
    let recipient_id = ledger.seed_wallet(UserId::new(), "0.00");

    let wallet_repo: Arc<dyn WalletRepository> = ledger.clone();
    let top_up = TopUpUseCase::new(wallet_repo.clone());
    let transfer = TransferUseCase::new(wallet_repo);

    top_up
        .execute(user_id, payer_id, Decimal::from_str("50.00").unwrap())
        .await
        .unwrap();
    transfer
        .execute(
            user_id,
            payer_id,
            recipient_id,
            Decimal::from_str("40.00").unwrap(),
        )
        .await
        .unwrap();

    let payer = ledger.wallet(payer_id);
    let recipient = ledger.wallet(recipient_id);
    assert_eq!(payer.balance(), Decimal::from_str("60.00").unwrap());
    assert_eq!(recipient.balance(), Decimal::from_str("40.00").unwrap());

    // Las dos patas del transfer se referencian mutuamente.
    let debit = ledger
        .entries_for(payer_id)
        .into_iter()
        .find(|t| t.transaction_type == TransactionType::DEBIT)
        .unwrap();
    let credit = ledger
        .entries_for(recipient_id)
        .into_iter()
        .find(|t| t.transaction_type == TransactionType::CREDIT)
        .unwrap();
    assert_eq!(debit.reference_id, Some(recipient_id.0));
    assert_eq!(credit.reference_id, Some(payer_id.0));
    assert_eq!(debit.status, TransactionStatus::COMPLETED);
    assert_eq!(credit.status, TransactionStatus::COMPLETED);
}
