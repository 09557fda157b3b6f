use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::envelope::ErrorBody;
use common::error_codes::ErrorCode;

// El gateway responde fallas de autenticación y enrutamiento con el mismo
// sobre JSON que los servicios internos: los clientes no distinguen en qué
// capa murió la petición.

/// 401 con el sobre estándar. Los mensajes son deliberadamente genéricos
/// para no filtrar si el token era inválido, expirado o de otro usuario.
pub fn unauthorized(message: &str, path: &str) -> Response {
    let body = ErrorBody::from_code(ErrorCode::Unauthorized, message, path);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// 404 para rutas que ningún prefijo de la tabla reconoce.
pub fn route_not_found(path: &str) -> Response {
    let body = ErrorBody::from_status(404, "No route matches this path", path);
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unauthorized_renders_envelope() {
        let response = unauthorized("Missing authentication token", "/api/v1/payment");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], 401);
        assert_eq!(body["code"], 1001);
        assert_eq!(body["message"], "Missing authentication token");
        assert_eq!(body["path"], "/api/v1/payment");
    }
}
