use crate::domain::types::{WalletId, WalletTransactionId};
use common::error_codes::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet not found with ID: {0}")]
    NotFound(WalletId),

    #[error("Wallet transaction not found with ID: {0}")]
    TransactionNotFound(WalletTransactionId),

    #[error("Insufficient balance in wallet: {0}")]
    InsufficientBalance(WalletId),

    #[error("Wallet was modified concurrently: {0}")]
    ConcurrentModification(WalletId),

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid transaction state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid wallet data: {0}")]
    InvalidData(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl WalletError {
    /// Clasificación dentro del catálogo compartido de la plataforma.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            WalletError::NotFound(_) => ErrorCode::WalletNotFound,
            WalletError::TransactionNotFound(_) => ErrorCode::TransactionNotFound,
            WalletError::InsufficientBalance(_) => ErrorCode::InsufficientBalance,
            WalletError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            WalletError::AccessDenied => ErrorCode::AccessDenied,
            WalletError::InvalidState(_) => ErrorCode::InvalidState,
            WalletError::InvalidInput(_) => ErrorCode::InvalidInput,
            WalletError::InvalidData(_) => ErrorCode::ValidationFailed,
            WalletError::RepositoryError(_) => ErrorCode::InternalError,
        }
    }
}
