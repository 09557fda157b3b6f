use crate::domain::entities::WalletTransaction;
use crate::domain::error::WalletError;
use crate::domain::repository::WalletTransactionRepository;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Alimenta al job de conciliación del orquestador: reservas que siguen
/// PENDING después del umbral de antigüedad.
///
/// El ledger expone este contrato para que ningún otro servicio lea sus
/// tablas directamente.
pub struct ListStaleReservationsUseCase {
    transaction_repo: Arc<dyn WalletTransactionRepository>,
}

impl ListStaleReservationsUseCase {
    pub fn new(transaction_repo: Arc<dyn WalletTransactionRepository>) -> Self {
        Self { transaction_repo }
    }

    #[tracing::instrument(name = "ListStaleReservationsUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        older_than_minutes: i64,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        if older_than_minutes < 1 {
            return Err(WalletError::InvalidInput(
                "Age threshold must be at least one minute".to_string(),
            ));
        }

        let cutoff = Utc::now() - Duration::minutes(older_than_minutes);
        self.transaction_repo.find_stale_pending(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockWalletTransactionRepository;
    use crate::domain::types::WalletId;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_stale_reservations_cutoff_in_the_past() {
        let mut tx_repo = MockWalletTransactionRepository::new();

        tx_repo
            .expect_find_stale_pending()
            .withf(|cutoff| *cutoff < Utc::now())
            .times(1)
            .returning(|_| {
                Ok(vec![WalletTransaction::pending_debit(
                    WalletId::new(),
                    Decimal::from(10),
                    Uuid::new_v4(),
                    "Reservation",
                )
                .unwrap()])
            });

        let use_case = ListStaleReservationsUseCase::new(Arc::new(tx_repo));
        let stale = use_case.execute(15).await.unwrap();

        assert_eq!(stale.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_reservations_rejects_zero_threshold() {
        let use_case =
            ListStaleReservationsUseCase::new(Arc::new(MockWalletTransactionRepository::new()));
        let result = use_case.execute(0).await;
        assert!(matches!(result, Err(WalletError::InvalidInput(_))));
    }
}
