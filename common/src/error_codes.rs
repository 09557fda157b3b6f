use serde::{Deserialize, Serialize};

/// Catálogo de códigos de error de la plataforma.
///
/// Cada variante define su código numérico de aplicación y el status HTTP
/// con el que se expone. Los rangos están reservados por familia:
///
/// * `1xxx` — autenticación
/// * `2xxx` — recurso no encontrado
/// * `3xxx` — validación
/// * `4xxx` — conflicto
/// * `5xxx` — autorización
/// * `6xxx` — proveedor de pagos
/// * `9xxx` — errores de servidor
///
/// El mapeo es una función total: todo error que cruza un límite de
/// servicio pasa por aquí, y el lado receptor puede reconstruir la variante
/// a partir del código numérico del sobre con [`ErrorCode::from_code`].
///
/// # Examples
/// ```
/// use common::error_codes::ErrorCode;
///
/// let code = ErrorCode::InsufficientBalance;
/// assert_eq!(code.code(), 5002);
/// assert_eq!(code.http_status(), 403);
/// assert_eq!(ErrorCode::from_code(5002), Some(ErrorCode::InsufficientBalance));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 1xxx — autenticación
    Unauthorized,
    TokenExpired,
    InvalidToken,

    // 2xxx — recurso
    WalletNotFound,
    PaymentNotFound,
    TransactionNotFound,

    // 3xxx — validación
    ValidationFailed,
    InvalidInput,

    // 4xxx — conflicto
    DuplicateResource,
    ConcurrentModification,
    InvalidStatusTransition,
    InvalidState,

    // 5xxx — autorización
    AccessDenied,
    InsufficientBalance,

    // 6xxx — proveedor de pagos
    PaymentChargeFailed,
    PaymentProviderUnavailable,

    // 9xxx — servidor
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Código numérico de aplicación que viaja en el sobre de error.
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::Unauthorized => 1001,
            ErrorCode::TokenExpired => 1002,
            ErrorCode::InvalidToken => 1003,

            ErrorCode::WalletNotFound => 2001,
            ErrorCode::PaymentNotFound => 2002,
            ErrorCode::TransactionNotFound => 2003,

            ErrorCode::ValidationFailed => 3001,
            ErrorCode::InvalidInput => 3002,

            ErrorCode::DuplicateResource => 4001,
            ErrorCode::ConcurrentModification => 4002,
            ErrorCode::InvalidStatusTransition => 4003,
            ErrorCode::InvalidState => 4004,

            ErrorCode::AccessDenied => 5001,
            ErrorCode::InsufficientBalance => 5002,

            ErrorCode::PaymentChargeFailed => 6001,
            ErrorCode::PaymentProviderUnavailable => 6002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ServiceUnavailable => 9002,
        }
    }

    /// Status HTTP con el que este error se responde al cliente.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::Unauthorized | ErrorCode::TokenExpired | ErrorCode::InvalidToken => 401,

            ErrorCode::WalletNotFound
            | ErrorCode::PaymentNotFound
            | ErrorCode::TransactionNotFound => 404,

            ErrorCode::ValidationFailed | ErrorCode::InvalidInput => 400,

            ErrorCode::DuplicateResource
            | ErrorCode::ConcurrentModification
            | ErrorCode::InvalidStatusTransition
            | ErrorCode::InvalidState => 409,

            ErrorCode::AccessDenied | ErrorCode::InsufficientBalance => 403,

            // Cobro rechazado de forma definitiva: el pago queda FAILED y la
            // respuesta del orquestador es 200 con el estado; este mapeo solo
            // aplica cuando el error viaja como tal entre servicios.
            ErrorCode::PaymentChargeFailed => 402,
            ErrorCode::PaymentProviderUnavailable => 503,

            ErrorCode::InternalError => 500,
            ErrorCode::ServiceUnavailable => 503,
        }
    }

    /// Reconstruye la variante a partir del código numérico recibido en un
    /// sobre de error de otro servicio. `None` si el código no es conocido
    /// (el llamador cae entonces al mapeo por status HTTP).
    pub fn from_code(code: u16) -> Option<ErrorCode> {
        match code {
            1001 => Some(ErrorCode::Unauthorized),
            1002 => Some(ErrorCode::TokenExpired),
            1003 => Some(ErrorCode::InvalidToken),

            2001 => Some(ErrorCode::WalletNotFound),
            2002 => Some(ErrorCode::PaymentNotFound),
            2003 => Some(ErrorCode::TransactionNotFound),

            3001 => Some(ErrorCode::ValidationFailed),
            3002 => Some(ErrorCode::InvalidInput),

            4001 => Some(ErrorCode::DuplicateResource),
            4002 => Some(ErrorCode::ConcurrentModification),
            4003 => Some(ErrorCode::InvalidStatusTransition),
            4004 => Some(ErrorCode::InvalidState),

            5001 => Some(ErrorCode::AccessDenied),
            5002 => Some(ErrorCode::InsufficientBalance),

            6001 => Some(ErrorCode::PaymentChargeFailed),
            6002 => Some(ErrorCode::PaymentProviderUnavailable),

            9001 => Some(ErrorCode::InternalError),
            9002 => Some(ErrorCode::ServiceUnavailable),

            _ => None,
        }
    }
}
