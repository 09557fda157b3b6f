pub mod cancel_reservation;
pub mod confirm_reservation;
pub mod create_wallet;
pub mod get_balance;
pub mod get_history;
pub mod list_stale_reservations;
pub mod monthly_summary;
pub mod reserve_funds;
pub mod top_up;
pub mod transfer;

use std::time::Duration;

/// Política de reintentos ante conflictos de optimistic locking:
/// hasta 3 intentos con 100ms de espera entre cada uno, y después
/// se reporta `CONCURRENT_MODIFICATION`.
pub(crate) const OPTIMISTIC_ATTEMPTS: u32 = 3;
pub(crate) const OPTIMISTIC_BACKOFF: Duration = Duration::from_millis(100);
