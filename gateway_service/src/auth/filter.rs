use crate::api::error::unauthorized;
use crate::state::GatewayState;
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use common::headers::{IDENTITY_HEADERS, X_USER_EMAIL, X_USER_ID, X_USER_NAME};
use std::sync::Arc;
use tracing::debug;

/// Rutas que pasan sin autenticación.
fn is_public(path: &str) -> bool {
    path == "/actuator/health"
        || path == "/user-fallback"
        || path == "/api/v1/auth"
        || path.starts_with("/api/v1/auth/")
}

/// Filtro de autenticación del borde.
///
/// Para toda ruta no pública:
/// 1. Elimina los headers `X-User-*` entrantes (anti-spoofing: solo el
///    gateway puede afirmarlos).
/// 2. Extrae el bearer token de la cookie `access_token` o del header
///    `Authorization`; su ausencia es 401 con mensaje genérico.
/// 3. Valida firma RS256 y expiración; cualquier fallo es el mismo 401.
/// 4. Inyecta `sub`/`email`/`username` como los tres headers de identidad.
///
/// Los 401 salen por el sobre de error uniforme, nunca como respuestas
/// ad-hoc del propio filtro.
pub async fn authentication_filter(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_public(&path) {
        return next.run(request).await;
    }

    // 1. Anti-spoofing: nada de identidad entrante sobrevive.
    for header in IDENTITY_HEADERS {
        request.headers_mut().remove(header);
    }

    // 2. Token de cookie o de header Authorization.
    let Some(token) = extract_token(request.headers()) else {
        return unauthorized("Missing authentication token", &path);
    };

    // 3. Firma + expiración.
    let claims = match state.verifier.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Token rejected on {}: {}", path, e);
            return unauthorized("Invalid or expired token", &path);
        }
    };

    // 4. Identidad verificada hacia los servicios internos.
    let headers = request.headers_mut();
    let inject = [
        (X_USER_ID, claims.sub.as_str()),
        (X_USER_EMAIL, claims.email.as_str()),
        (X_USER_NAME, claims.username.as_str()),
    ];
    for (name, value) in inject {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => {
                debug!("Claim not representable as header on {}", path);
                return unauthorized("Invalid or expired token", &path);
            }
        }
    }

    next.run(request).await
}

/// Busca el token primero en la cookie `access_token` y después en
/// `Authorization: Bearer ...`.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        for pair in cookie_header.split(';') {
            if let Some(value) = pair.trim().strip_prefix("access_token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}
