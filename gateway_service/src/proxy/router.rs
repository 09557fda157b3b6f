use crate::proxy::circuit_breaker::CircuitBreaker;

/// Ruta del gateway: un prefijo de path, el servicio que lo atiende y su
/// circuit breaker dedicado.
pub struct Route {
    /// Nombre legible del servicio; aparece en el cuerpo del fallback 503.
    pub service_name: String,
    pub prefix: String,
    pub base_url: String,
    pub breaker: CircuitBreaker,
}

impl Route {
    pub fn new(
        service_name: impl Into<String>,
        prefix: impl Into<String>,
        base_url: impl Into<String>,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            prefix: prefix.into(),
            base_url: base_url.into(),
            breaker,
        }
    }
}

/// Tabla de enrutamiento por prefijo. El primer prefijo que matchea gana,
/// así que los prefijos más específicos van primero.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| path.starts_with(&r.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            Route::new(
                "Payment service",
                "/api/v1/payment",
                "http://payments:3002",
                CircuitBreaker::new(5, Duration::from_secs(30)),
            ),
            Route::new(
                "Wallet service",
                "/api/v1/wallet",
                "http://wallets:3001",
                CircuitBreaker::new(5, Duration::from_secs(30)),
            ),
        ])
    }

    #[test]
    fn test_resolves_by_prefix() {
        let table = table();
        let route = table.resolve("/api/v1/payment/123/process").unwrap();
        assert_eq!(route.service_name, "Payment service");

        let route = table.resolve("/api/v1/wallet/abc/balance").unwrap();
        assert_eq!(route.service_name, "Wallet service");
    }

    #[test]
    fn test_unknown_prefix_resolves_to_none() {
        assert!(table().resolve("/api/v2/other").is_none());
    }
}
