//! Gateway Service Library
//!
//! Borde de la plataforma: autentica cada petición entrante (token RS256 en
//! cookie o header), elimina headers de identidad spoofeados, inyecta los
//! claims verificados como `X-User-*` y enruta por prefijo hacia los
//! servicios internos con un circuit breaker por ruta.
//!
//! # Modules
//!
//! * `api` - Render del sobre de error en el borde.
//! * `auth` - Verificación de tokens y filtro de autenticación.
//! * `proxy` - Tabla de rutas, reenvío y circuit breakers.

pub mod api;
pub mod auth;
pub mod config;
pub mod proxy;
pub mod state;
