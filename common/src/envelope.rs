use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error_codes::ErrorCode;

/// Sobre JSON uniforme con el que todos los servicios reportan errores.
///
/// La forma es idéntica sin importar qué servicio responde, de modo que el
/// gateway y los clientes entre servicios puedan parsearlo a ciegas. El
/// campo `code` lleva el código numérico de aplicación ([`ErrorCode`]) y
/// puede estar ausente cuando el error no tiene clasificación (por ejemplo,
/// un 404 de ruta inexistente generado por el framework).
///
/// # Examples
/// ```
/// use common::envelope::ErrorBody;
/// use common::error_codes::ErrorCode;
///
/// let body = ErrorBody::from_code(
///     ErrorCode::WalletNotFound,
///     "Wallet not found",
///     "/api/v1/wallet/123/balance",
/// );
/// assert_eq!(body.status, 404);
/// assert_eq!(body.code, Some(2001));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorBody {
    /// Construye el sobre a partir de una variante del catálogo.
    pub fn from_code(code: ErrorCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        let status = code.http_status();
        Self {
            timestamp: Utc::now(),
            status,
            code: Some(code.code()),
            error: reason_phrase(status).to_string(),
            message: message.into(),
            path: path.into(),
        }
    }

    /// Sobre sin código de aplicación, solo con status HTTP.
    pub fn from_status(status: u16, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status,
            code: None,
            error: reason_phrase(status).to_string(),
            message: message.into(),
            path: path.into(),
        }
    }

    /// Variante del catálogo declarada en el sobre, si el código numérico es
    /// reconocido.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code.and_then(ErrorCode::from_code)
    }
}

/// Frase de razón estándar para los status que la plataforma emite.
fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serializes_contract_fields() {
        let body = ErrorBody::from_code(
            ErrorCode::ConcurrentModification,
            "Wallet was modified concurrently",
            "/api/v1/wallet/abc/reserve",
        );

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 409);
        assert_eq!(json["code"], 4002);
        assert_eq!(json["error"], "Conflict");
        assert_eq!(json["message"], "Wallet was modified concurrently");
        assert_eq!(json["path"], "/api/v1/wallet/abc/reserve");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_envelope_without_code_omits_field() {
        let body = ErrorBody::from_status(404, "No route", "/nope");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("code").is_none());
    }

    #[test]
    fn test_error_code_round_trip_through_json() {
        let body = ErrorBody::from_code(ErrorCode::InsufficientBalance, "no funds", "/x");
        let raw = serde_json::to_string(&body).unwrap();
        let parsed: ErrorBody = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.error_code(), Some(ErrorCode::InsufficientBalance));
    }
}
