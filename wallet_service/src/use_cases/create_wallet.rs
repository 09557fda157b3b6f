use crate::domain::{entities::Wallet, error::WalletError, repository::WalletRepository};
use crate::domain::types::UserId;
use std::sync::Arc;

/// Caso de uso que gestiona la creación de una Wallet para un usuario.
///
/// La identidad llega ya autenticada desde el gateway, así que no hay
/// verificación contra una tabla de usuarios: el servicio confía en el
/// header de identidad. Utiliza el patrón Builder de `Wallet` para asegurar
/// que el estado inicial sea válido (saldos en cero, divisa normalizada).
pub struct CreateWalletUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
}

impl CreateWalletUseCase {
    pub fn new(wallet_repo: Arc<dyn WalletRepository>) -> Self {
        Self { wallet_repo }
    }

    pub async fn execute(
        &self,
        user_id: UserId,
        currency: Option<String>,
    ) -> Result<Wallet, WalletError> {
        let mut builder = Wallet::builder().user_id(user_id);
        if let Some(currency) = currency {
            builder = builder.currency(currency);
        }

        let wallet = builder.build()?;
        self.wallet_repo.create(wallet).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockWalletRepository;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_create_wallet_defaults_to_sgd() {
        let mut wallet_repo = MockWalletRepository::new();
        let user_id = UserId::new();

        wallet_repo.expect_create().returning(|w| Ok(w));

        let use_case = CreateWalletUseCase::new(Arc::new(wallet_repo));
        let wallet = use_case.execute(user_id, None).await.unwrap();

        assert_eq!(wallet.user_id(), user_id);
        assert_eq!(wallet.currency(), "SGD");
        assert_eq!(wallet.balance(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_create_wallet_invalid_currency() {
        let wallet_repo = MockWalletRepository::new();
        let use_case = CreateWalletUseCase::new(Arc::new(wallet_repo));

        let result = use_case
            .execute(UserId::new(), Some("DOLLARS".to_string()))
            .await;

        assert!(matches!(result, Err(WalletError::InvalidData(_))));
    }
}
