use serde::{Deserialize, Serialize};

/// Claims del access token emitido por el servicio de autenticación.
///
/// El gateway solo consume `sub`, `email` y `username` (los tres viajan a
/// los servicios internos como headers de identidad); el resto participa en
/// la validación estándar del token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identificador del usuario.
    pub sub: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    /// Identificador único del token.
    #[serde(default)]
    pub jti: Option<String>,
    pub iat: i64,
    /// Expiración en segundos UNIX; la validación la exige presente.
    pub exp: i64,
}
