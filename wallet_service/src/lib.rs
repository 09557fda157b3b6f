//! Wallet Service Library
//!
//! Núcleo del Wallet Ledger: saldos, saldos reservados, el diario de
//! movimientos y el protocolo reserve/confirm/cancel que consume el
//! orquestador de pagos.
//!
//! # Modules
//!
//! * `api` - Interfaces HTTP (rutas, extractores, mapeo de errores).
//! * `domain` - Entidades, reglas de negocio y puertos (traits).
//! * `infrastructure` - Implementaciones concretas de los repositorios.
//! * `use_cases` - Lógica de aplicación, una operación por struct.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod use_cases;
