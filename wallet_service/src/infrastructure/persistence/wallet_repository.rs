use crate::domain::entities::{Wallet, WalletTransaction};
use crate::domain::error::WalletError;
use crate::domain::repository::{CasResult, WalletRepository};
use crate::domain::types::{UserId, WalletId, WalletTransactionId};
use crate::infrastructure::persistence::models::{WalletModel, WalletTransactionModel};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

/// Repositorio de Billeteras basado en PostgreSQL.
///
/// Cada mutación del ledger es una transacción SQL completa: el ajuste de
/// saldos y la escritura del diario comparten commit. Las guardias de
/// concurrencia viven en el `WHERE` de los UPDATE (compare-and-set sobre
/// `version` más la condición de saldo disponible), siguiendo la regla de
/// que cero filas afectadas nunca se interpreta: se re-lee.
pub struct PostgresWalletRepository {
    pool: PgPool,
}

impl PostgresWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserta una entrada del diario dentro de la transacción dada.
    async fn insert_entry(
        tx: &mut Transaction<'_, Postgres>,
        entry: &WalletTransaction,
    ) -> Result<(), sqlx::Error> {
        let model = WalletTransactionModel::from(entry);
        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (
                id, wallet_id, amount, transaction_type, status,
                reference_id, reference_type, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(model.id)
        .bind(model.wallet_id)
        .bind(model.amount)
        .bind(model.transaction_type)
        .bind(model.status)
        .bind(model.reference_id)
        .bind(model.reference_type)
        .bind(model.description)
        .bind(model.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

fn map_db_err(e: sqlx::Error) -> WalletError {
    WalletError::RepositoryError(e.to_string())
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    /// Busca una billetera por su ID.
    async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        let model_opt = sqlx::query_as::<_, WalletModel>(
            r#"
            SELECT * FROM wallets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        model_opt.map(Wallet::try_from).transpose()
    }

    /// Busca todas las billeteras asociadas a un usuario.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Wallet>, WalletError> {
        let models = sqlx::query_as::<_, WalletModel>(
            r#"
            SELECT * FROM wallets
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        models.into_iter().map(Wallet::try_from).collect()
    }

    /// Crea una nueva billetera.
    async fn create(&self, wallet: Wallet) -> Result<Wallet, WalletError> {
        let model = WalletModel::from(wallet);

        let saved = sqlx::query_as::<_, WalletModel>(
            r#"
            INSERT INTO wallets (
                id, user_id, balance, reserved_balance, currency, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(model.id)
        .bind(model.user_id)
        .bind(model.balance)
        .bind(model.reserved_balance)
        .bind(model.currency)
        .bind(model.version)
        .bind(model.created_at)
        .bind(model.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Wallet::try_from(saved)
    }

    async fn apply_reservation(
        &self,
        wallet_id: WalletId,
        expected_version: i32,
        entry: WalletTransaction,
    ) -> Result<CasResult, WalletError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        // CAS: versión esperada + guardia de saldo disponible en el WHERE.
        let updated = sqlx::query_as::<_, WalletModel>(
            r#"
            UPDATE wallets
            SET reserved_balance = reserved_balance + $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2
              AND version = $3
              AND balance - reserved_balance >= $1
            RETURNING *
            "#,
        )
        .bind(entry.amount)
        .bind(wallet_id)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let Some(model) = updated else {
            tx.rollback().await.map_err(map_db_err)?;
            return Ok(CasResult::Conflict);
        };

        if let Err(e) = Self::insert_entry(&mut tx, &entry).await {
            tx.rollback().await.map_err(map_db_err)?;
            // Violación del unique (reference_id, reference_type): otra
            // petición reservó el mismo pago en paralelo. Se reporta como
            // conflicto para que el caso de uso re-lea y responda idempotente.
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                return Ok(CasResult::Conflict);
            }
            return Err(map_db_err(e));
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(CasResult::Applied(Wallet::try_from(model)?))
    }

    async fn apply_confirmation(
        &self,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        // La guardia `reserved_balance >= amount` es el chequeo de sanidad:
        // tras la resta la reserva no puede quedar negativa.
        let wallet_rows = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance - $1,
                reserved_balance = reserved_balance - $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2
              AND reserved_balance >= $1
            "#,
        )
        .bind(amount)
        .bind(wallet_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if wallet_rows.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_err)?;
            return Err(WalletError::InvalidState(
                "Reserved balance does not cover the confirmation".to_string(),
            ));
        }

        let entry_rows = sqlx::query(
            r#"
            UPDATE wallet_transactions
            SET status = 'COMPLETED'
            WHERE id = $1
              AND status = 'PENDING'
            "#,
        )
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if entry_rows.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_err)?;
            return Err(WalletError::InvalidState(
                "Wallet transaction is not PENDING".to_string(),
            ));
        }

        tx.commit().await.map_err(map_db_err)
    }

    async fn apply_cancellation(
        &self,
        wallet_id: WalletId,
        transaction_id: WalletTransactionId,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let wallet_rows = sqlx::query(
            r#"
            UPDATE wallets
            SET reserved_balance = reserved_balance - $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2
              AND reserved_balance >= $1
            "#,
        )
        .bind(amount)
        .bind(wallet_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if wallet_rows.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_err)?;
            return Err(WalletError::InvalidState(
                "Reserved balance does not cover the cancellation".to_string(),
            ));
        }

        let entry_rows = sqlx::query(
            r#"
            UPDATE wallet_transactions
            SET status = 'CANCELLED'
            WHERE id = $1
              AND status = 'PENDING'
            "#,
        )
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if entry_rows.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_err)?;
            return Err(WalletError::InvalidState(
                "Wallet transaction is not PENDING".to_string(),
            ));
        }

        tx.commit().await.map_err(map_db_err)
    }

    async fn apply_credit(
        &self,
        wallet_id: WalletId,
        expected_version: i32,
        entry: WalletTransaction,
    ) -> Result<CasResult, WalletError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let updated = sqlx::query_as::<_, WalletModel>(
            r#"
            UPDATE wallets
            SET balance = balance + $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2
              AND version = $3
            RETURNING *
            "#,
        )
        .bind(entry.amount)
        .bind(wallet_id)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let Some(model) = updated else {
            tx.rollback().await.map_err(map_db_err)?;
            return Ok(CasResult::Conflict);
        };

        Self::insert_entry(&mut tx, &entry).await.map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(CasResult::Applied(Wallet::try_from(model)?))
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
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        // Débito del pagador: CAS + guardia de saldo disponible.
        let payer = sqlx::query_as::<_, WalletModel>(
            r#"
            UPDATE wallets
            SET balance = balance - $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2
              AND version = $3
              AND balance - reserved_balance >= $1
            RETURNING *
            "#,
        )
        .bind(amount)
        .bind(payer_id)
        .bind(payer_expected_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let Some(payer_model) = payer else {
            tx.rollback().await.map_err(map_db_err)?;
            return Ok(CasResult::Conflict);
        };

        // Crédito del receptor: incremento simple, la versión igual avanza.
        let recipient_rows = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance + $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(amount)
        .bind(recipient_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if recipient_rows.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_err)?;
            return Err(WalletError::NotFound(recipient_id));
        }

        Self::insert_entry(&mut tx, &debit_entry)
            .await
            .map_err(map_db_err)?;
        Self::insert_entry(&mut tx, &credit_entry)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(CasResult::Applied(Wallet::try_from(payer_model)?))
    }
}
