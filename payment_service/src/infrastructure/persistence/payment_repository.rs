use crate::domain::entities::Payment;
use crate::domain::error::PaymentError;
use crate::domain::repository::PaymentRepository;
use crate::domain::types::{PaymentId, UserId};
use crate::infrastructure::persistence::models::PaymentModel;
use async_trait::async_trait;
use sqlx::PgPool;

/// Repositorio de pagos implementado para PostgreSQL.
///
/// Consultas SQL parametrizadas directas con `sqlx` y mapeo automático a
/// `PaymentModel`. La disciplina de concurrencia vive aquí: candado
/// pesimista corto (`SELECT ... FOR UPDATE`) para la verificación de
/// entrada y compare-and-set sobre `version` para toda transición.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_err(e: sqlx::Error) -> PaymentError {
    PaymentError::RepositoryError(e.to_string())
}

fn into_payment(model: PaymentModel) -> Result<Payment, PaymentError> {
    Payment::try_from(model).map_err(PaymentError::RepositoryError)
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    /// Inserta el pago nuevo (INSERT). El choque con el unique
    /// `(client_request_id, user_id)` se traduce a la señal de duplicado
    /// para que el caso de uso recupere re-leyendo.
    async fn insert(&self, payment: Payment) -> Result<Payment, PaymentError> {
        let model = PaymentModel::from(&payment);

        let saved = sqlx::query_as::<_, PaymentModel>(
            r#"
            INSERT INTO payments (
                id, user_id, amount, currency, client_request_id, wallet_id,
                status, version, provider, provider_transaction_id,
                wallet_transaction_id, failure_code, failure_message,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(model.id)
        .bind(model.user_id)
        .bind(model.amount)
        .bind(model.currency)
        .bind(model.client_request_id)
        .bind(model.wallet_id)
        .bind(model.status)
        .bind(model.version)
        .bind(model.provider)
        .bind(model.provider_transaction_id)
        .bind(model.wallet_transaction_id)
        .bind(model.failure_code)
        .bind(model.failure_message)
        .bind(model.created_at)
        .bind(model.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                PaymentError::DuplicateClientRequest
            } else {
                map_db_err(e)
            }
        })?;

        into_payment(saved)
    }

    /// Busca un pago por su ID único.
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, PaymentError> {
        let model_opt =
            sqlx::query_as::<_, PaymentModel>(r#"SELECT * FROM payments WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_db_err)?;

        model_opt.map(into_payment).transpose()
    }

    /// Búsqueda por la llave de idempotencia `(client_request_id, user_id)`.
    ///
    /// Cada llamada adquiere su propia conexión del pool: es el contexto
    /// transaccional fresco que exige la recuperación post-violación (la
    /// transacción que chocó con el unique quedó envenenada y no puede
    /// reutilizarse para leer).
    async fn find_by_client_request(
        &self,
        user_id: UserId,
        client_request_id: &str,
    ) -> Result<Option<Payment>, PaymentError> {
        let model_opt = sqlx::query_as::<_, PaymentModel>(
            r#"
            SELECT * FROM payments
            WHERE user_id = $1 AND client_request_id = $2
            "#,
        )
        .bind(user_id)
        .bind(client_request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        model_opt.map(into_payment).transpose()
    }

    /// Candado pesimista corto: `SELECT ... FOR UPDATE` en una transacción
    /// propia que se cierra al devolver la instantánea. Serializa las
    /// verificaciones de entrada de procesamiento/consulta de estado sin
    /// sostener el candado a través de llamadas de red.
    async fn lock_for_processing(&self, id: PaymentId) -> Result<Option<Payment>, PaymentError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let model_opt = sqlx::query_as::<_, PaymentModel>(
            r#"SELECT * FROM payments WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;

        model_opt.map(into_payment).transpose()
    }

    /// Transición con compare-and-set: `version = version + 1` condicionado
    /// a la versión leída. Cero filas es una violación real de concurrencia.
    async fn update_with_version(&self, payment: &Payment) -> Result<Payment, PaymentError> {
        let model = PaymentModel::from(payment);

        let updated = sqlx::query_as::<_, PaymentModel>(
            r#"
            UPDATE payments
            SET amount = $1,
                currency = $2,
                wallet_id = $3,
                status = $4,
                provider = $5,
                provider_transaction_id = $6,
                wallet_transaction_id = $7,
                failure_code = $8,
                failure_message = $9,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $10
              AND version = $11
            RETURNING *
            "#,
        )
        .bind(model.amount)
        .bind(model.currency)
        .bind(model.wallet_id)
        .bind(model.status)
        .bind(model.provider)
        .bind(model.provider_transaction_id)
        .bind(model.wallet_transaction_id)
        .bind(model.failure_code)
        .bind(model.failure_message)
        .bind(model.id)
        .bind(model.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        match updated {
            Some(m) => into_payment(m),
            None => Err(PaymentError::ConcurrentModification(payment.id)),
        }
    }
}
