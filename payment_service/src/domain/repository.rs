use crate::domain::entities::Payment;
use crate::domain::error::PaymentError;
use crate::domain::types::{PaymentId, UserId};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

// Interface (Port) for Payment persistence.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserta un pago nuevo. Un choque con el unique
    /// `(client_request_id, user_id)` se reporta como
    /// [`PaymentError::DuplicateClientRequest`] para que la iniciación
    /// re-lea en un contexto transaccional fresco.
    async fn insert(&self, payment: Payment) -> Result<Payment, PaymentError>;

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, PaymentError>;

    /// Búsqueda por la llave de idempotencia. La implementación adquiere
    /// una conexión fresca del pool en cada llamada: tras una violación de
    /// unicidad la transacción original está envenenada y la recuperación
    /// debe leer en un contexto independiente.
    async fn find_by_client_request(
        &self,
        user_id: UserId,
        client_request_id: &str,
    ) -> Result<Option<Payment>, PaymentError>;

    /// Toma el candado pesimista del pago (`SELECT ... FOR UPDATE`) en una
    /// transacción corta, solo para la verificación de entrada: el candado
    /// NO se sostiene a través de llamadas al proveedor ni de esperas de
    /// reintento. Las transiciones posteriores van protegidas por el CAS de
    /// `version`.
    async fn lock_for_processing(&self, id: PaymentId) -> Result<Option<Payment>, PaymentError>;

    /// Persiste el estado del pago con compare-and-set sobre `version`
    /// (`version = version + 1 WHERE version = esperado`). Cero filas
    /// afectadas es una violación real de concurrencia y se reporta como
    /// `CONCURRENT_MODIFICATION`; nunca se reintenta internamente.
    async fn update_with_version(&self, payment: &Payment) -> Result<Payment, PaymentError>;
}
