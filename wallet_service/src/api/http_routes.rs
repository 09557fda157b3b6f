use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extractors::AuthenticatedUser;
use crate::domain::entities::{MonthlySummary, Wallet, WalletTransaction};
use crate::domain::types::{WalletId, WalletTransactionId};
use crate::use_cases::{
    cancel_reservation::CancelReservationUseCase, confirm_reservation::ConfirmReservationUseCase,
    create_wallet::CreateWalletUseCase, get_balance::GetBalanceUseCase,
    get_history::GetTransactionHistoryUseCase,
    list_stale_reservations::ListStaleReservationsUseCase,
    monthly_summary::MonthlySummaryUseCase, reserve_funds::ReserveFundsUseCase,
    top_up::TopUpUseCase, transfer::TransferUseCase,
};

/// Umbral por defecto del feed de conciliación, en minutos.
const DEFAULT_STALE_MINUTES: i64 = 15;

// Estado compartido de la aplicación (Casos de Uso inyectados).
pub struct AppState {
    pub create_wallet_use_case: CreateWalletUseCase,
    pub get_balance_use_case: GetBalanceUseCase,
    pub top_up_use_case: TopUpUseCase,
    pub transfer_use_case: TransferUseCase,
    pub get_history_use_case: GetTransactionHistoryUseCase,
    pub monthly_summary_use_case: MonthlySummaryUseCase,
    pub reserve_funds_use_case: ReserveFundsUseCase,
    pub confirm_reservation_use_case: ConfirmReservationUseCase,
    pub cancel_reservation_use_case: CancelReservationUseCase,
    pub list_stale_reservations_use_case: ListStaleReservationsUseCase,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/wallet", post(create_wallet))
        .route("/api/v1/wallet/summary/monthly", get(monthly_summary))
        .route("/api/v1/wallet/reservations/stale", get(stale_reservations))
        .route("/api/v1/wallet/{id}/balance", get(get_balance))
        .route("/api/v1/wallet/{id}/topup", post(top_up))
        .route("/api/v1/wallet/{id}/transfer", post(transfer))
        .route("/api/v1/wallet/{id}/transactions", get(transaction_history))
        .route("/api/v1/wallet/{id}/reserve", post(reserve_funds))
        .route("/api/v1/wallet/{id}/confirm", post(confirm_reservation))
        .route("/api/v1/wallet/{id}/cancel", post(cancel_reservation))
        .route("/actuator/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    /// Código ISO de 3 letras; `SGD` si se omite.
    pub currency: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub reserved_balance: Decimal,
    pub available_balance: Decimal,
    pub currency: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Wallet> for WalletResponse {
    fn from(w: &Wallet) -> Self {
        Self {
            wallet_id: w.id().0,
            user_id: w.user_id().0,
            balance: w.balance(),
            reserved_balance: w.reserved_balance(),
            available_balance: w.available_balance(),
            currency: w.currency().to_string(),
            version: w.version(),
            created_at: w.created_at(),
            updated_at: w.updated_at(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub amount: Decimal,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub recipient_wallet_id: Uuid,
    pub amount: Decimal,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReserveFundsRequest {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub payment_id: Uuid,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub wallet_transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub amount_reserved: Decimal,
    pub remaining_balance: Decimal,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReservationRequest {
    pub wallet_transaction_id: Uuid,
    pub provider_transaction_id: String,
    pub provider: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelReservationRequest {
    pub wallet_transaction_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    pub transaction_type: String,
    pub status: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<&WalletTransaction> for TransactionResponse {
    fn from(t: &WalletTransaction) -> Self {
        Self {
            transaction_id: t.id.0,
            wallet_id: t.wallet_id.0,
            amount: t.amount,
            transaction_type: format!("{:?}", t.transaction_type),
            status: format!("{:?}", t.status),
            reference_id: t.reference_id,
            reference_type: t.reference_type.map(|r| format!("{:?}", r)),
            description: t.description.clone(),
            created_at: t.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummaryResponse {
    pub year: i32,
    pub month: u32,
    pub total_credit: Decimal,
    pub total_debit: Decimal,
}

impl From<MonthlySummary> for MonthlySummaryResponse {
    fn from(s: MonthlySummary) -> Self {
        Self {
            year: s.year,
            month: s.month,
            total_credit: s.total_credit,
            total_debit: s.total_debit,
        }
    }
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Deserialize)]
pub struct StaleQuery {
    pub minutes: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

// Handler: Crear una billetera para el usuario autenticado
// POST /api/v1/wallet
#[utoipa::path(
    post,
    path = "/api/v1/wallet",
    request_body = CreateWalletRequest,
    responses((status = 201, body = WalletResponse))
)]
pub async fn create_wallet(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let wallet = state
        .create_wallet_use_case
        .execute(user.user_id, payload.currency)
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok((StatusCode::CREATED, Json(WalletResponse::from(&wallet))))
}

// Handler: Saldo y detalles de una billetera propia
// GET /api/v1/wallet/{id}/balance
#[utoipa::path(
    get,
    path = "/api/v1/wallet/{id}/balance",
    params(("id" = Uuid, Path, description = "Wallet id")),
    responses((status = 200, body = WalletResponse))
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state
        .get_balance_use_case
        .execute(user.user_id, WalletId(id))
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(WalletResponse::from(&wallet)))
}

// Handler: Abono directo de fondos
// POST /api/v1/wallet/{id}/topup
#[utoipa::path(
    post,
    path = "/api/v1/wallet/{id}/topup",
    params(("id" = Uuid, Path, description = "Wallet id")),
    request_body = TopUpRequest,
    responses((status = 200, body = WalletResponse))
)]
pub async fn top_up(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<TopUpRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state
        .top_up_use_case
        .execute(user.user_id, WalletId(id), payload.amount)
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(WalletResponse::from(&wallet)))
}

// Handler: Transferencia hacia otra billetera
// POST /api/v1/wallet/{id}/transfer
#[utoipa::path(
    post,
    path = "/api/v1/wallet/{id}/transfer",
    params(("id" = Uuid, Path, description = "Payer wallet id")),
    request_body = TransferRequest,
    responses((status = 200, body = WalletResponse))
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<TransferRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state
        .transfer_use_case
        .execute(
            user.user_id,
            WalletId(id),
            WalletId(payload.recipient_wallet_id),
            payload.amount,
        )
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(WalletResponse::from(&wallet)))
}

// Handler: Historial paginado de movimientos (pagina 1-based de 10)
// GET /api/v1/wallet/{id}/transactions?page=N
#[utoipa::path(
    get,
    path = "/api/v1/wallet/{id}/transactions",
    params(
        ("id" = Uuid, Path, description = "Wallet id"),
        ("page" = Option<u32>, Query, description = "1-based page index")
    ),
    responses((status = 200, body = [TransactionResponse]))
)]
pub async fn transaction_history(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let history = state
        .get_history_use_case
        .execute(user.user_id, WalletId(id), query.page.unwrap_or(1))
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(history.iter().map(TransactionResponse::from).collect()))
}

// Handler: Agregado mensual de movimientos COMPLETED del usuario
// GET /api/v1/wallet/summary/monthly?year=YYYY&month=M
#[utoipa::path(
    get,
    path = "/api/v1/wallet/summary/monthly",
    params(
        ("year" = i32, Query, description = "Calendar year"),
        ("month" = u32, Query, description = "Month 1-12")
    ),
    responses((status = 200, body = MonthlySummaryResponse))
)]
pub async fn monthly_summary(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<SummaryQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<MonthlySummaryResponse>, ApiError> {
    let summary = state
        .monthly_summary_use_case
        .execute(user.user_id, query.year, query.month)
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(summary.into()))
}

// Handler: Fase 1 del two-phase commit (idempotente por paymentId)
// POST /api/v1/wallet/{id}/reserve
#[utoipa::path(
    post,
    path = "/api/v1/wallet/{id}/reserve",
    params(("id" = Uuid, Path, description = "Wallet id")),
    request_body = ReserveFundsRequest,
    responses((status = 200, body = ReservationResponse))
)]
pub async fn reserve_funds(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<ReserveFundsRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let receipt = state
        .reserve_funds_use_case
        .execute(
            user.user_id,
            WalletId(id),
            payload.amount,
            payload.currency,
            payload.payment_id,
        )
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(ReservationResponse {
        wallet_transaction_id: receipt.wallet_transaction_id.0,
        wallet_id: receipt.wallet_id.0,
        amount_reserved: receipt.amount_reserved,
        remaining_balance: receipt.remaining_balance,
    }))
}

// Handler: Fase 2 commit (idempotente)
// POST /api/v1/wallet/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/v1/wallet/{id}/confirm",
    params(("id" = Uuid, Path, description = "Wallet id")),
    request_body = ConfirmReservationRequest,
    responses((status = 200, body = MessageResponse))
)]
pub async fn confirm_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<ConfirmReservationRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .confirm_reservation_use_case
        .execute(
            user.user_id,
            WalletId(id),
            WalletTransactionId(payload.wallet_transaction_id),
            payload.provider_transaction_id,
            payload.provider,
        )
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(MessageResponse {
        message: "Reservation confirmed".to_string(),
    }))
}

// Handler: Fase 2 abort (idempotente)
// POST /api/v1/wallet/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/v1/wallet/{id}/cancel",
    params(("id" = Uuid, Path, description = "Wallet id")),
    request_body = CancelReservationRequest,
    responses((status = 200, body = MessageResponse))
)]
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<CancelReservationRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .cancel_reservation_use_case
        .execute(
            user.user_id,
            WalletId(id),
            WalletTransactionId(payload.wallet_transaction_id),
        )
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(MessageResponse {
        message: "Reservation cancelled".to_string(),
    }))
}

// Handler: Feed de conciliación para el orquestador
// GET /api/v1/wallet/reservations/stale?minutes=N
#[utoipa::path(
    get,
    path = "/api/v1/wallet/reservations/stale",
    params(("minutes" = Option<i64>, Query, description = "Age threshold in minutes")),
    responses((status = 200, body = [TransactionResponse]))
)]
pub async fn stale_reservations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StaleQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let stale = state
        .list_stale_reservations_use_case
        .execute(query.minutes.unwrap_or(DEFAULT_STALE_MINUTES))
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(stale.iter().map(TransactionResponse::from).collect()))
}

// Handler: Health check del servicio
// GET /actuator/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}
