use crate::domain::types::PaymentId;
use common::error_codes::ErrorCode;
use thiserror::Error;

use crate::domain::gateways::GatewayError;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment not found with ID: {0}")]
    NotFound(PaymentId),

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid status transition: {0}")]
    InvalidStatusTransition(String),

    #[error("Payment was modified concurrently: {0}")]
    ConcurrentModification(PaymentId),

    // Señal interna del repositorio: choque con el unique
    // (client_request_id, user_id) por una inserción concurrente.
    #[error("Duplicate client request")]
    DuplicateClientRequest,

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Wallet service rejected the operation: {message}")]
    WalletRejected { code: ErrorCode, message: String },

    #[error("Wallet service unavailable: {0}")]
    WalletUnavailable(String),

    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid payment state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl PaymentError {
    /// Clasificación dentro del catálogo compartido. El rechazo remoto del
    /// ledger conserva el código con el que viajó en el sobre.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PaymentError::NotFound(_) => ErrorCode::PaymentNotFound,
            PaymentError::AccessDenied => ErrorCode::AccessDenied,
            PaymentError::InvalidStatusTransition(_) => ErrorCode::InvalidStatusTransition,
            PaymentError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            PaymentError::DuplicateClientRequest => ErrorCode::DuplicateResource,
            PaymentError::InsufficientBalance(_) => ErrorCode::InsufficientBalance,
            PaymentError::WalletRejected { code, .. } => *code,
            PaymentError::WalletUnavailable(_) => ErrorCode::ServiceUnavailable,
            PaymentError::ProviderUnavailable(_) => ErrorCode::PaymentProviderUnavailable,
            PaymentError::InvalidState(_) => ErrorCode::InvalidState,
            PaymentError::Validation(_) => ErrorCode::ValidationFailed,
            PaymentError::RepositoryError(_) => ErrorCode::InternalError,
        }
    }
}

// Los errores del gateway hacia el ledger se traducen conservando la
// clasificación que viajó en el sobre compartido.
impl From<GatewayError> for PaymentError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { code, message } => match code {
                ErrorCode::InsufficientBalance => PaymentError::InsufficientBalance(message),
                code => PaymentError::WalletRejected { code, message },
            },
            GatewayError::Unavailable(message) => PaymentError::WalletUnavailable(message),
        }
    }
}
