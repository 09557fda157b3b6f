use axum::{
    extract::{OriginalUri, Path, State},
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
use crate::domain::types::PaymentId;
use crate::use_cases::check_payment_status::CheckPaymentStatusUseCase;
use crate::use_cases::initiate_payment::{InitiatePaymentCommand, InitiatePaymentUseCase};
use crate::use_cases::process_payment::{PaymentReceipt, ProcessPaymentUseCase};

// Estado compartido de la aplicación (Casos de Uso inyectados).
pub struct AppState {
    pub initiate_payment_use_case: InitiatePaymentUseCase,
    pub process_payment_use_case: ProcessPaymentUseCase,
    pub check_payment_status_use_case: CheckPaymentStatusUseCase,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/payment", post(initiate_payment))
        .route("/api/v1/payment/{id}/process", post(process_payment))
        .route("/api/v1/payment/{id}/status", get(payment_status))
        .route("/actuator/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub amount: Decimal,
    /// Código ISO de 3 letras; `SGD` si se omite.
    pub currency: Option<String>,
    pub wallet_id: Uuid,
    pub client_request_id: String,
    pub provider: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiationResponse {
    pub payment_id: Uuid,
    pub version: i32,
    pub is_new: bool,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub payment_method_token: Option<String>,
    /// Métodos de pago guardados quedan fuera de alcance; el campo se
    /// acepta solo para rechazarlo con un error claro.
    pub payment_method_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceiptResponse {
    pub payment_id: Uuid,
    pub status: String,
    pub message: String,
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentReceipt> for PaymentReceiptResponse {
    fn from(r: PaymentReceipt) -> Self {
        Self {
            payment_id: r.payment_id.0,
            status: format!("{:?}", r.status),
            message: r.message,
            amount: r.amount,
            currency: r.currency,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

// Handler: Iniciar un pago (idempotente por clientRequestId + usuario)
// POST /api/v1/payment
// 201 si la fila es nueva, 200 si es un replay idempotente.
#[utoipa::path(
    post,
    path = "/api/v1/payment",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 201, description = "Payment created", body = InitiationResponse),
        (status = 200, description = "Idempotent replay", body = InitiationResponse)
    )
)]
pub async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<InitiationResponse>), ApiError> {
    let outcome = state
        .initiate_payment_use_case
        .execute(
            user.user_id,
            InitiatePaymentCommand {
                amount: payload.amount,
                currency: payload.currency,
                wallet_id: payload.wallet_id,
                client_request_id: payload.client_request_id,
                provider: payload.provider,
            },
        )
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    let status = if outcome.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(InitiationResponse {
            payment_id: outcome.payment.id.0,
            version: outcome.payment.version,
            is_new: outcome.is_new,
        }),
    ))
}

// Handler: Procesar un pago iniciado (two-phase commit)
// POST /api/v1/payment/{id}/process
// La respuesta es 200 incluso cuando el estado final es FAILED: el registro
// del fallo ya quedó persistido y el cliente necesita leerlo.
#[utoipa::path(
    post,
    path = "/api/v1/payment/{id}/process",
    params(("id" = Uuid, Path, description = "Payment id")),
    request_body = ProcessPaymentRequest,
    responses((status = 200, body = PaymentReceiptResponse))
)]
pub async fn process_payment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<ProcessPaymentRequest>,
) -> Result<Json<PaymentReceiptResponse>, ApiError> {
    if payload.payment_method_id.is_some() {
        return Err(ApiError::validation(
            "Saved payment methods are not supported; send paymentMethodToken",
            uri.path(),
        ));
    }
    let token = payload
        .payment_method_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::validation("paymentMethodToken is required", uri.path()))?;

    let receipt = state
        .process_payment_use_case
        .execute(user.user_id, PaymentId(id), token)
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(receipt.into()))
}

// Handler: Conciliación de estado de un pago PENDING
// GET /api/v1/payment/{id}/status
#[utoipa::path(
    get,
    path = "/api/v1/payment/{id}/status",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses((status = 200, body = PaymentReceiptResponse))
)]
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<PaymentReceiptResponse>, ApiError> {
    let receipt = state
        .check_payment_status_use_case
        .execute(user.user_id, PaymentId(id))
        .await
        .map_err(|e| ApiError::from_domain(e, uri.path()))?;

    Ok(Json(receipt.into()))
}

// Handler: Health check del servicio
// GET /actuator/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}
