use crate::domain::provider::{
    ChargeOutcome, ChargeRequest, ChargeStatus, PaymentProvider, ProviderError,
    ProviderFailureCode,
};
use std::time::Duration;
use tracing::warn;

/// Política de reintentos del cobro externo.
///
/// Hasta `max_attempts` intentos; la espera entre el intento `n` y el
/// `n+1` es `2^(n-1) * base_delay` (con base de 1s: 1s, 2s). Solo se
/// reintenta lo que el proveedor clasifica como transitorio; un rechazo
/// definitivo regresa de inmediato. La espera usa `tokio::time::sleep`,
/// cancelable con la tarea y sin sostener ninguna conexión de base de
/// datos.
///
/// El doble cobro queda excluido por la llave de idempotencia del
/// [`ChargeRequest`]: reintentar el mismo pago reusa la misma llave.
#[derive(Debug, Clone)]
pub struct ChargeRetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for ChargeRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl ChargeRetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Espera antes del intento siguiente al intento `attempt` fallido.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Ejecuta el cobro con reintentos y SIEMPRE devuelve un outcome.
    ///
    /// En agotamiento se devuelve la última respuesta observada; si nunca
    /// hubo respuesta (solo excepciones de canal), se sintetiza un fallo no
    /// reintentable a partir de la última.
    pub async fn charge(
        &self,
        provider: &dyn PaymentProvider,
        request: &ChargeRequest,
    ) -> ChargeOutcome {
        let mut last_failure: Option<ChargeOutcome> = None;
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let delay = self.backoff_delay(attempt - 1);
                warn!(
                    "Charge attempt {}/{} for payment {} backing off {:?}",
                    attempt, self.max_attempts, request.payment_id, delay
                );
                tokio::time::sleep(delay).await;
            }

            match provider.charge(request).await {
                Ok(outcome) => match outcome.status {
                    ChargeStatus::Success | ChargeStatus::Pending => return outcome,
                    ChargeStatus::Failed => {
                        if outcome.retryable && attempt < self.max_attempts {
                            warn!(
                                "Charge attempt {}/{} for payment {} failed with retryable {:?}",
                                attempt, self.max_attempts, request.payment_id, outcome.failure_code
                            );
                            last_failure = Some(outcome);
                        } else {
                            return outcome;
                        }
                    }
                },
                Err(err) if !err.is_retryable() => {
                    // Excepción definitiva del canal: se unifica como outcome.
                    return ChargeOutcome::from_provider_error(provider.name(), &err);
                }
                Err(err) => {
                    warn!(
                        "Charge attempt {}/{} for payment {} raised retryable {}",
                        attempt, self.max_attempts, request.payment_id, err
                    );
                    last_error = Some(err);
                }
            }
        }

        last_failure.unwrap_or_else(|| {
            let (code, message) = match last_error {
                Some(err) => (err.code, err.message),
                None => (
                    ProviderFailureCode::PROVIDER_UNAVAILABLE,
                    "Charge attempts exhausted".to_string(),
                ),
            };
            ChargeOutcome::failed(provider.name(), None, code, message)
        })
    }
}
