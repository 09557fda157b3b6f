//! Payment Service Library
//!
//! Orquestador de pagos de la plataforma: ciclo de vida idempotente del
//! pago, two-phase commit entre el Wallet Ledger y el proveedor externo,
//! política de reintentos del cobro y conciliación diferida.
//!
//! # Modules
//!
//! * `api` - Interfaces HTTP (rutas, extractores, mapeo de errores).
//! * `domain` - Entidades, puertos (repositorio, gateway, proveedor).
//! * `infrastructure` - Persistencia sqlx, gateway HTTP, proveedor mock.
//! * `jobs` - Conciliación en segundo plano de reservas atascadas.
//! * `use_cases` - Iniciación, procesamiento y verificación de estado.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod jobs;
pub mod use_cases;
