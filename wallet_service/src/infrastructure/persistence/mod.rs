pub mod models;
pub mod wallet_repository;
pub mod wallet_transaction_repository;
