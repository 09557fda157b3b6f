use crate::api::error::ApiError;
use crate::domain::types::UserId;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::headers::{X_USER_EMAIL, X_USER_ID, X_USER_NAME};
use uuid::Uuid;

/// Identidad autenticada inyectada por el gateway en los headers `X-User-*`.
/// Una petición sin `X-User-Id` saltó el gateway y se rechaza.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();

        let raw_id = parts
            .headers
            .get(X_USER_ID)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authentication token", &path))?;

        let user_id = Uuid::parse_str(raw_id)
            .map(UserId)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token", &path))?;

        let header_string = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        Ok(Self {
            user_id,
            email: header_string(X_USER_EMAIL),
            name: header_string(X_USER_NAME),
        })
    }
}
