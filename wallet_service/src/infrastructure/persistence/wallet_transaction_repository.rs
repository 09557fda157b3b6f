use crate::domain::entities::{MonthlySummary, WalletTransaction};
use crate::domain::error::WalletError;
use crate::domain::repository::WalletTransactionRepository;
use crate::domain::types::{UserId, WalletId, WalletTransactionId};
use crate::infrastructure::persistence::models::{MonthlySummaryRow, WalletTransactionModel};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Tamaño de página del historial de movimientos.
const HISTORY_PAGE_SIZE: i64 = 10;

/// Lado de lectura del diario de movimientos, implementado para PostgreSQL.
///
/// Utiliza consultas SQL parametrizadas directas con `sqlx` y
/// `sqlx::query_as` para mapear automáticamente a `WalletTransactionModel`.
pub struct PostgresWalletTransactionRepository {
    pool: sqlx::PgPool,
}

impl PostgresWalletTransactionRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_err(e: sqlx::Error) -> WalletError {
    WalletError::RepositoryError(e.to_string())
}

#[async_trait]
impl WalletTransactionRepository for PostgresWalletTransactionRepository {
    /// Busca un movimiento por su ID único.
    async fn find_by_id(
        &self,
        id: WalletTransactionId,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let model_opt = sqlx::query_as::<_, WalletTransactionModel>(
            r#"SELECT * FROM wallet_transactions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(model_opt.map(|m| m.into()))
    }

    /// Busca por la llave de idempotencia de reservas.
    ///
    /// Permite verificar si una reserva ya fue procesada anteriormente para
    /// evitar duplicados en los reintentos del orquestador.
    async fn find_by_payment_reference(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<WalletTransaction>, WalletError> {
        let model_opt = sqlx::query_as::<_, WalletTransactionModel>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE reference_id = $1 AND reference_type = 'PAYMENT'
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(model_opt.map(|m| m.into()))
    }

    /// Historial de movimientos de una billetera.
    ///
    /// Página 1-based de 10 elementos, ordenada por fecha de creación
    /// descendente (lo más reciente primero).
    async fn find_history(
        &self,
        wallet_id: WalletId,
        page: u32,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let offset = (i64::from(page.max(1)) - 1) * HISTORY_PAGE_SIZE;

        let models = sqlx::query_as::<_, WalletTransactionModel>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(wallet_id)
        .bind(HISTORY_PAGE_SIZE)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    /// Suma de créditos y débitos COMPLETED de un usuario en un mes.
    async fn monthly_summary(
        &self,
        user_id: UserId,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, WalletError> {
        let (from, to) = month_window(year, month)?;

        let row = sqlx::query_as::<_, MonthlySummaryRow>(
            r#"
            SELECT
                COALESCE(SUM(t.amount) FILTER (WHERE t.transaction_type = 'CREDIT'), 0) AS total_credit,
                COALESCE(SUM(t.amount) FILTER (WHERE t.transaction_type = 'DEBIT'), 0) AS total_debit
            FROM wallet_transactions t
            JOIN wallets w ON w.id = t.wallet_id
            WHERE w.user_id = $1
              AND t.status = 'COMPLETED'
              AND t.created_at >= $2
              AND t.created_at < $3
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(MonthlySummary {
            year,
            month,
            total_credit: row.total_credit,
            total_debit: row.total_debit,
        })
    }

    /// Reservas PENDING anteriores al corte, candidatas a conciliación.
    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let models = sqlx::query_as::<_, WalletTransactionModel>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE status = 'PENDING'
              AND reference_type = 'PAYMENT'
              AND created_at < $1
            ORDER BY created_at ASC
            LIMIT 50
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }
}

/// Ventana `[inicio de mes, inicio del mes siguiente)` en UTC.
fn month_window(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), WalletError> {
    if !(1..=12).contains(&month) {
        return Err(WalletError::InvalidInput(format!(
            "Month out of range: {}",
            month
        )));
    }

    let from = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| WalletError::InvalidInput(format!("Invalid month: {}-{}", year, month)))?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let to = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| WalletError::InvalidInput(format!("Invalid month: {}-{}", year, month)))?;

    Ok((from, to))
}
