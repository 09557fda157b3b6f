pub mod fake_wallet_gateway;
pub mod http_wallet_gateway;
