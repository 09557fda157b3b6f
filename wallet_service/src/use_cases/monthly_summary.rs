use crate::domain::entities::MonthlySummary;
use crate::domain::error::WalletError;
use crate::domain::repository::WalletTransactionRepository;
use crate::domain::types::UserId;
use std::sync::Arc;

/// Agregado mensual de créditos y débitos COMPLETED de un usuario, sumando
/// todas sus billeteras.
pub struct MonthlySummaryUseCase {
    transaction_repo: Arc<dyn WalletTransactionRepository>,
}

impl MonthlySummaryUseCase {
    pub fn new(transaction_repo: Arc<dyn WalletTransactionRepository>) -> Self {
        Self { transaction_repo }
    }

    #[tracing::instrument(name = "MonthlySummaryUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, WalletError> {
        if !(1..=12).contains(&month) {
            return Err(WalletError::InvalidInput(format!(
                "Month out of range: {}",
                month
            )));
        }

        self.transaction_repo
            .monthly_summary(user_id, year, month)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockWalletTransactionRepository;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_monthly_summary_delegates() {
        let mut tx_repo = MockWalletTransactionRepository::new();
        let user_id = UserId::new();

        tx_repo
            .expect_monthly_summary()
            .with(eq(user_id), eq(2026), eq(7u32))
            .times(1)
            .returning(|_, year, month| {
                Ok(MonthlySummary {
                    year,
                    month,
                    total_credit: Decimal::from(300),
                    total_debit: Decimal::from(120),
                })
            });

        let use_case = MonthlySummaryUseCase::new(Arc::new(tx_repo));
        let summary = use_case.execute(user_id, 2026, 7).await.unwrap();

        assert_eq!(summary.total_credit, Decimal::from(300));
        assert_eq!(summary.total_debit, Decimal::from(120));
    }

    #[tokio::test]
    async fn test_monthly_summary_rejects_bad_month() {
        let use_case = MonthlySummaryUseCase::new(Arc::new(MockWalletTransactionRepository::new()));
        let result = use_case.execute(UserId::new(), 2026, 0).await;
        assert!(matches!(result, Err(WalletError::InvalidInput(_))));
    }
}
