use dotenvy::dotenv;
use payment_service::{
    api::http_routes::{routes, AppState},
    config::PaymentServiceConfig,
    domain::gateways::WalletGateway,
    infrastructure::{
        gateways::{
            fake_wallet_gateway::FakeWalletGateway, http_wallet_gateway::HttpWalletGateway,
        },
        persistence::payment_repository::PostgresPaymentRepository,
        providers::mock_provider::MockPaymentProvider,
    },
    jobs::reconcile::ReconciliationJob,
    use_cases::{
        check_payment_status::CheckPaymentStatusUseCase,
        initiate_payment::InitiatePaymentUseCase, process_payment::ProcessPaymentUseCase,
        retry_policy::ChargeRetryPolicy,
    },
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        payment_service::api::http_routes::initiate_payment,
        payment_service::api::http_routes::process_payment,
        payment_service::api::http_routes::payment_status
    ),
    components(schemas(
        payment_service::api::http_routes::InitiatePaymentRequest,
        payment_service::api::http_routes::InitiationResponse,
        payment_service::api::http_routes::ProcessPaymentRequest,
        payment_service::api::http_routes::PaymentReceiptResponse
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

    info!("Starting Payment Service...");

    // 3. Configurar Conexión a Base de Datos
    let config = PaymentServiceConfig::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Connected to Database");

    // 4. Instanciar Dependencias (Infraestructura)
    let payment_repo = Arc::new(PostgresPaymentRepository::new(pool));

    let wallet_gateway: Arc<dyn WalletGateway> = match &config.wallet_service_url {
        Some(url) => Arc::new(HttpWalletGateway::new(url.clone())),
        None => {
            warn!("WALLET_SERVICE_URL not set, using FakeWalletGateway");
            Arc::new(FakeWalletGateway::new())
        }
    };

    let provider = Arc::new(MockPaymentProvider::new(config.provider.clone()));

    // 5. Instanciar Casos de Uso
    let app_state = Arc::new(AppState {
        initiate_payment_use_case: InitiatePaymentUseCase::new(payment_repo.clone()),
        process_payment_use_case: ProcessPaymentUseCase::new(
            payment_repo.clone(),
            wallet_gateway.clone(),
            provider.clone(),
            ChargeRetryPolicy::default(),
        ),
        check_payment_status_use_case: CheckPaymentStatusUseCase::new(
            payment_repo.clone(),
            wallet_gateway.clone(),
            provider.clone(),
        ),
    });

    // 6. Iniciar Background Jobs (conciliación de reservas atascadas)
    let job = ReconciliationJob::new(
        payment_repo.clone(),
        wallet_gateway.clone(),
        provider.clone(),
        config.stale_after_minutes,
    );
    let interval_secs = config.reconcile_interval_secs;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        info!("Reconciliation job scheduler started");

        loop {
            interval.tick().await;
            job.run().await;
        }
    });

    // 7. Configurar Rutas y Servidor HTTP
    let app = routes(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let addr = config.bind_addr();
    info!("HTTP Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
