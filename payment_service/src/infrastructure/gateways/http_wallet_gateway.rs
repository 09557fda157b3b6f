use crate::domain::gateways::{
    GatewayError, ReservationReceipt, StaleReservation, WalletGateway,
};
use crate::domain::types::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::envelope::ErrorBody;
use common::error_codes::ErrorCode;
use common::headers::X_USER_ID;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

/// Gateway HTTP hacia el Wallet Service.
///
/// Habla el mismo contrato JSON que los clientes externos y parsea el sobre
/// de error estándar de las respuestas fallidas: el código numérico del
/// sobre se mapea de vuelta al catálogo compartido y, si no es reconocible,
/// se cae al mapeo por status HTTP.
pub struct HttpWalletGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWalletGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Traduce una respuesta no exitosa a `GatewayError`.
    async fn classify_failure(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();

        // Primero el sobre estándar con su código de aplicación.
        if let Ok(body) = serde_json::from_slice::<ErrorBody>(&bytes) {
            if let Some(code) = body.error_code() {
                return GatewayError::Rejected {
                    code,
                    message: body.message,
                };
            }
        }

        // Fallback: clasificación por status HTTP.
        let message = String::from_utf8_lossy(&bytes).to_string();
        let code = match status.as_u16() {
            401 => Some(ErrorCode::Unauthorized),
            403 => Some(ErrorCode::AccessDenied),
            404 => Some(ErrorCode::WalletNotFound),
            409 => Some(ErrorCode::ConcurrentModification),
            400 => Some(ErrorCode::InvalidInput),
            _ => None,
        };

        match code {
            Some(code) => GatewayError::Rejected { code, message },
            None => GatewayError::Unavailable(format!(
                "Wallet service answered {}: {}",
                status, message
            )),
        }
    }
}

// DTOs del contrato HTTP del ledger (camelCase en el cable).

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReserveFundsWire {
    amount: Decimal,
    currency: String,
    payment_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReservationWire {
    wallet_transaction_id: Uuid,
    wallet_id: Uuid,
    amount_reserved: Decimal,
    remaining_balance: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmWire<'a> {
    wallet_transaction_id: Uuid,
    provider_transaction_id: &'a str,
    provider: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelWire {
    wallet_transaction_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StaleReservationWire {
    transaction_id: Uuid,
    wallet_id: Uuid,
    amount: Decimal,
    reference_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl WalletGateway for HttpWalletGateway {
    async fn reserve_funds(
        &self,
        user_id: UserId,
        wallet_id: Uuid,
        amount: Decimal,
        currency: &str,
        payment_id: Uuid,
    ) -> Result<ReservationReceipt, GatewayError> {
        let url = format!("{}/api/v1/wallet/{}/reserve", self.base_url, wallet_id);

        let response = self
            .client
            .post(&url)
            .header(X_USER_ID, user_id.to_string())
            .json(&ReserveFundsWire {
                amount,
                currency: currency.to_string(),
                payment_id,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let wire: ReservationWire = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Malformed reservation body: {}", e)))?;

        info!(
            "Wallet service reserved {} on wallet {} for payment {}",
            wire.amount_reserved, wire.wallet_id, payment_id
        );

        Ok(ReservationReceipt {
            wallet_transaction_id: wire.wallet_transaction_id,
            wallet_id: wire.wallet_id,
            amount_reserved: wire.amount_reserved,
            remaining_balance: wire.remaining_balance,
        })
    }

    async fn confirm_reservation(
        &self,
        user_id: UserId,
        wallet_id: Uuid,
        wallet_transaction_id: Uuid,
        provider_transaction_id: &str,
        provider: &str,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/api/v1/wallet/{}/confirm", self.base_url, wallet_id);

        let response = self
            .client
            .post(&url)
            .header(X_USER_ID, user_id.to_string())
            .json(&ConfirmWire {
                wallet_transaction_id,
                provider_transaction_id,
                provider,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let failure = Self::classify_failure(response).await;
            error!(
                "Confirmation of wallet transaction {} rejected: {}",
                wallet_transaction_id, failure
            );
            return Err(failure);
        }

        Ok(())
    }

    async fn cancel_reservation(
        &self,
        user_id: UserId,
        wallet_id: Uuid,
        wallet_transaction_id: Uuid,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/api/v1/wallet/{}/cancel", self.base_url, wallet_id);

        let response = self
            .client
            .post(&url)
            .header(X_USER_ID, user_id.to_string())
            .json(&CancelWire {
                wallet_transaction_id,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        Ok(())
    }

    async fn list_stale_reservations(
        &self,
        older_than_minutes: i64,
    ) -> Result<Vec<StaleReservation>, GatewayError> {
        let url = format!(
            "{}/api/v1/wallet/reservations/stale?minutes={}",
            self.base_url, older_than_minutes
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let wires: Vec<StaleReservationWire> = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Malformed stale feed: {}", e)))?;

        // Entradas sin referencia de pago no son conciliables; se descartan.
        Ok(wires
            .into_iter()
            .filter_map(|w| {
                w.reference_id.map(|payment_id| StaleReservation {
                    wallet_transaction_id: w.transaction_id,
                    wallet_id: w.wallet_id,
                    amount: w.amount,
                    payment_id,
                    created_at: w.created_at,
                })
            })
            .collect())
    }
}
