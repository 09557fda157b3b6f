//! Headers de identidad que el gateway inyecta tras autenticar.
//!
//! Los servicios internos confían en estos headers y NUNCA deben aceptarlos
//! directamente de un cliente externo: el gateway los elimina de toda
//! petición entrante antes de re-inyectarlos con los claims del token.

/// Identificador del usuario autenticado (claim `sub`).
pub const X_USER_ID: &str = "x-user-id";

/// Correo del usuario autenticado (claim `email`).
pub const X_USER_EMAIL: &str = "x-user-email";

/// Nombre del usuario autenticado (claim `username`).
pub const X_USER_NAME: &str = "x-user-name";

/// Los tres headers en el orden en que el gateway los procesa.
pub const IDENTITY_HEADERS: [&str; 3] = [X_USER_ID, X_USER_EMAIL, X_USER_NAME];
