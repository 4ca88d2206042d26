//! Reconnect policy.
//!
//! Pure functions, no side effects, so the connection manager's timing rules
//! can be tested without a transport.

use std::time::Duration;

/// Hard ceiling on consecutive reconnect attempts
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Delay before the first reconnect
pub const BASE_BACKOFF: Duration = Duration::from_millis(1_000);

/// Upper bound for the exponential delay
pub const MAX_BACKOFF: Duration = Duration::from_millis(30_000);

/// Fixed retry delay after the connector rejects construction outright
pub const CONSTRUCTION_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Delay before reconnect number `attempt` (0-indexed): `min(1000 * 2^attempt, 30000)` ms.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = BASE_BACKOFF.as_millis() as u64;
    let max_ms = MAX_BACKOFF.as_millis() as u64;
    let millis = 2u64
        .checked_pow(attempt)
        .and_then(|factor| factor.checked_mul(base_ms))
        .map_or(max_ms, |ms| ms.min(max_ms));
    Duration::from_millis(millis)
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(current_attempt: u32, max_attempts: u32) -> bool {
    current_attempt < max_attempts
}
