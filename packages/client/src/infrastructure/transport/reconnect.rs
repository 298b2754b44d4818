//! Reconnection policy of the event channel.

use super::TransportError;

/// Errors after which retrying cannot succeed.
pub fn is_fatal(error: &TransportError) -> bool {
    matches!(
        error,
        TransportError::Unauthorized(_) | TransportError::Closed
    )
}

/// Check if the transport should try to connect again.
///
/// # Arguments
///
/// * `error` - The error that ended the last attempt
/// * `consecutive_failures` - Failed attempts since the last successful connection
/// * `max_attempts` - The maximum number of consecutive failures allowed
pub fn should_attempt_reconnect(
    error: &TransportError,
    consecutive_failures: u32,
    max_attempts: u32,
) -> bool {
    if is_fatal(error) {
        return false;
    }
    consecutive_failures < max_attempts
}
