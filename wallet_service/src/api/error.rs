use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::envelope::ErrorBody;
use common::error_codes::ErrorCode;

use crate::domain::error::WalletError;

// Error unificado de la API del Wallet Service.
//
// Toda falla sale con el sobre JSON estándar de la plataforma
// `{timestamp, status, code, error, message, path}` para que el gateway y
// los clientes entre servicios lo parseen de forma uniforme.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    path: String,
}

impl ApiError {
    /// Mapea un error de dominio al sobre, anotando la ruta que falló.
    pub fn from_domain(err: WalletError, path: &str) -> Self {
        let code = err.error_code();
        let message = match &err {
            // Los errores de infraestructura no viajan al cliente.
            WalletError::RepositoryError(detail) => {
                tracing::error!("Database repository error on {}: {}", path, detail);
                "Internal server error".to_string()
            }
            _ => err.to_string(),
        };

        Self {
            code,
            message,
            path: path.to_string(),
        }
    }

    /// Falla de autenticación (petición que no pasó por el gateway).
    pub fn unauthorized(message: &str, path: &str) -> Self {
        Self {
            code: ErrorCode::Unauthorized,
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
