use crate::proxy::router::Route;
use axum::{
    body::Body,
    extract::Request,
    http::{
        header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Límite de cuerpo reenviado hacia los servicios internos.
const MAX_FORWARD_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Reenvía la petición (método, path, query, headers, cuerpo) al servicio
/// de la ruta, registrando el resultado en su circuit breaker.
///
/// Con el circuito abierto, o ante un fallo de transporte, el gateway sirve
/// el fallback 503 `{"message": "<servicio> unavailable"}` sin tocar al
/// backend.
pub async fn forward(client: &reqwest::Client, route: &Route, request: Request) -> Response {
    if !route.breaker.can_execute() {
        warn!(
            "Circuit open for {}, serving fallback",
            route.service_name
        );
        return service_unavailable(&route.service_name);
    }

    let (parts, body) = request.into_parts();

    let body_bytes = match axum::body::to_bytes(body, MAX_FORWARD_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "message": "Request body too large" })),
            )
                .into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", route.base_url.trim_end_matches('/'), path_and_query);

    // Headers de salto (host, content-length) los fija el cliente HTTP.
    let mut headers = parts.headers.clone();
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);

    let upstream = client
        .request(parts.method.clone(), &url)
        .headers(headers)
        .body(body_bytes)
        .send()
        .await;

    match upstream {
        Ok(upstream) => {
            let status = upstream.status();

            // Solo las fallas de infraestructura cuentan para el breaker:
            // un 4xx del backend es una respuesta sana.
            if status.is_server_error() {
                route.breaker.record_failure();
            } else {
                route.breaker.record_success();
            }

            let upstream_headers = upstream.headers().clone();
            let body = upstream.bytes().await.unwrap_or_default();

            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            for (name, value) in upstream_headers.iter() {
                if *name == TRANSFER_ENCODING || *name == CONNECTION || *name == CONTENT_LENGTH {
                    continue;
                }
                response.headers_mut().insert(name.clone(), value.clone());
            }
            response
        }
        Err(e) => {
            error!("Forwarding to {} failed: {}", route.service_name, e);
            route.breaker.record_failure();
            service_unavailable(&route.service_name)
        }
    }
}

/// Fallback 503 con el cuerpo que el contrato del borde promete.
pub fn service_unavailable(service_name: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": format!("{} unavailable", service_name) })),
    )
        .into_response()
}
