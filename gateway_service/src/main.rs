use axum::{
    extract::{Request, State},
    middleware,
    response::Response,
    routing::{any, get},
    Json, Router,
};
use dotenvy::dotenv;
use gateway_service::{
    auth::{filter::authentication_filter, token_verifier::TokenVerifier},
    config::GatewayConfig,
    proxy::{
        circuit_breaker::CircuitBreaker,
        forwarder::{forward, service_unavailable},
        router::{Route, RouteTable},
    },
    state::GatewayState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar variables de entorno
    dotenv().ok();

    // 2. Configurar Logging/Tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Gateway Service...");

    // 3. Cargar la llave pública y armar el verificador de tokens
    let config = GatewayConfig::from_env()?;
    let verifier = TokenVerifier::from_pem_file(
        &config.jwt_public_key_path,
        config.jwt_issuer.as_deref(),
        config.jwt_audience.as_deref(),
    )?;

    info!("Loaded JWT public key from {}", config.jwt_public_key_path);

    // 4. Tabla de rutas con un circuit breaker por servicio
    let breaker = |threshold: u32, reset: u64| {
        CircuitBreaker::new(threshold, Duration::from_secs(reset))
    };
    let table = RouteTable::new(vec![
        Route::new(
            "Payment service",
            "/api/v1/payment",
            config.payment_service_url.clone(),
            breaker(config.breaker_failure_threshold, config.breaker_reset_secs),
        ),
        Route::new(
            "Wallet service",
            "/api/v1/wallet",
            config.wallet_service_url.clone(),
            breaker(config.breaker_failure_threshold, config.breaker_reset_secs),
        ),
        Route::new(
            "Auth service",
            "/api/v1/auth",
            config.auth_service_url.clone(),
            breaker(config.breaker_failure_threshold, config.breaker_reset_secs),
        ),
    ]);

    let state = Arc::new(GatewayState {
        verifier,
        table,
        client: reqwest::Client::new(),
    });

    // 5. Router: salud y fallback del user service públicos, todo lo demás
    // cruza el filtro de autenticación y se reenvía por prefijo.
    let app = Router::new()
        .route("/actuator/health", get(health))
        .route("/user-fallback", any(user_fallback))
        .fallback(proxy_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_filter,
        ))
        .with_state(state);

    let addr = config.bind_addr();
    info!("Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Handler: reenvío por prefijo hacia el servicio correspondiente.
async fn proxy_handler(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let path = request.uri().path();

    match state.table.resolve(path) {
        Some(route) => forward(&state.client, route, request).await,
        None => gateway_service::api::error::route_not_found(path),
    }
}

// Handler: fallback del circuito del user service.
async fn user_fallback() -> Response {
    service_unavailable("User service")
}

// Handler: health check del gateway.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}
