pub mod models;
pub mod payment_repository;
