use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::envelope::ErrorBody;
use common::error_codes::ErrorCode;

use crate::domain::error::PaymentError;

// Error unificado de la API del Payment Service, renderizado con el sobre
// JSON estándar de la plataforma.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    path: String,
}

impl ApiError {
    pub fn from_domain(err: PaymentError, path: &str) -> Self {
        let code = err.error_code();
        let message = match &err {
            PaymentError::RepositoryError(detail) => {
                tracing::error!("Database repository error on {}: {}", path, detail);
                "Internal server error".to_string()
            }
            // La señal interna de duplicado nunca debería llegar al handler
            // (la iniciación la recupera), pero si llega se responde 409.
            PaymentError::DuplicateClientRequest => "Duplicate client request".to_string(),
            _ => err.to_string(),
        };

        Self {
            code,
            message,
            path: path.to_string(),
        }
    }

    pub fn unauthorized(message: &str, path: &str) -> Self {
        Self {
            code: ErrorCode::Unauthorized,
            message: message.to_string(),
            path: path.to_string(),
        }
    }

    pub fn validation(message: &str, path: &str) -> Self {
        Self {
            code: ErrorCode::ValidationFailed,
            message: message.to_string(),
            path: path.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody::from_code(self.code, self.message, self.path);

        (status, Json(body)).into_response()
    }
}
