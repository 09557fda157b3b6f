use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use wallet_service::{
    api::http_routes::{routes, AppState},
    config::WalletServiceConfig,
    infrastructure::persistence::{
        wallet_repository::PostgresWalletRepository,
        wallet_transaction_repository::PostgresWalletTransactionRepository,
    },
    use_cases::{
        cancel_reservation::CancelReservationUseCase,
        confirm_reservation::ConfirmReservationUseCase, create_wallet::CreateWalletUseCase,
        get_balance::GetBalanceUseCase, get_history::GetTransactionHistoryUseCase,
        list_stale_reservations::ListStaleReservationsUseCase,
        monthly_summary::MonthlySummaryUseCase, reserve_funds::ReserveFundsUseCase,
        top_up::TopUpUseCase, transfer::TransferUseCase,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        wallet_service::api::http_routes::create_wallet,
        wallet_service::api::http_routes::get_balance,
        wallet_service::api::http_routes::top_up,
        wallet_service::api::http_routes::transfer,
        wallet_service::api::http_routes::transaction_history,
        wallet_service::api::http_routes::monthly_summary,
        wallet_service::api::http_routes::reserve_funds,
        wallet_service::api::http_routes::confirm_reservation,
        wallet_service::api::http_routes::cancel_reservation,
        wallet_service::api::http_routes::stale_reservations
    ),
    components(schemas(
        wallet_service::api::http_routes::CreateWalletRequest,
        wallet_service::api::http_routes::WalletResponse,
        wallet_service::api::http_routes::TopUpRequest,
        wallet_service::api::http_routes::TransferRequest,
        wallet_service::api::http_routes::ReserveFundsRequest,
        wallet_service::api::http_routes::ReservationResponse,
        wallet_service::api::http_routes::ConfirmReservationRequest,
        wallet_service::api::http_routes::CancelReservationRequest,
        wallet_service::api::http_routes::TransactionResponse,
        wallet_service::api::http_routes::MonthlySummaryResponse,
        wallet_service::api::http_routes::MessageResponse
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar variables de entorno
    dotenv().ok();

    // 2. Configurar Logging/Tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Wallet Service...");

    // 3. Configurar Conexión a Base de Datos
    let config = WalletServiceConfig::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Connected to Database");

    // 4. Instanciar Dependencias (Infraestructura)
    let wallet_repo = Arc::new(PostgresWalletRepository::new(pool.clone()));
    let transaction_repo = Arc::new(PostgresWalletTransactionRepository::new(pool.clone()));

    // 5. Instanciar Casos de Uso
    let app_state = Arc::new(AppState {
        create_wallet_use_case: CreateWalletUseCase::new(wallet_repo.clone()),
        get_balance_use_case: GetBalanceUseCase::new(wallet_repo.clone()),
        top_up_use_case: TopUpUseCase::new(wallet_repo.clone()),
        transfer_use_case: TransferUseCase::new(wallet_repo.clone()),
        get_history_use_case: GetTransactionHistoryUseCase::new(
            wallet_repo.clone(),
            transaction_repo.clone(),
        ),
        monthly_summary_use_case: MonthlySummaryUseCase::new(transaction_repo.clone()),
        reserve_funds_use_case: ReserveFundsUseCase::new(
            wallet_repo.clone(),
            transaction_repo.clone(),
        ),
        confirm_reservation_use_case: ConfirmReservationUseCase::new(
            wallet_repo.clone(),
            transaction_repo.clone(),
        ),
        cancel_reservation_use_case: CancelReservationUseCase::new(
            wallet_repo.clone(),
            transaction_repo.clone(),
        ),
        list_stale_reservations_use_case: ListStaleReservationsUseCase::new(
            transaction_repo.clone(),
        ),
    });

    // 6. Configurar Rutas y Servidor HTTP
    let app = routes(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let addr = config.bind_addr();
    info!("HTTP Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
