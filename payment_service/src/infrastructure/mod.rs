pub mod gateways;
pub mod persistence;
pub mod providers;
