use crate::auth::token_verifier::TokenVerifier;
use crate::proxy::router::RouteTable;

/// Estado compartido del gateway: verificador de tokens, tabla de rutas y
/// el cliente HTTP con el que se reenvía.
pub struct GatewayState {
    pub verifier: TokenVerifier,
    pub table: RouteTable,
    pub client: reqwest::Client,
}
