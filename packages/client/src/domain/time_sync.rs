//! Server clock alignment for round countdowns.
//!
//! The drift between the local clock and the server clock is estimated once
//! per question, at the moment the question payload is handled. Every later
//! countdown value is derived locally from that drift; nothing here ever
//! waits for another server round-trip.

/// Estimate how far the server clock is ahead of the local clock.
///
/// # Arguments
///
/// * `server_now_ms` - Server time carried by the payload
/// * `local_now_ms` - Local time when the payload was handled
pub fn clock_drift(server_now_ms: i64, local_now_ms: i64) -> i64 {
    server_now_ms - local_now_ms
}

/// Milliseconds left before `ends_at_server_ms`, never negative.
pub fn remaining_ms(ends_at_server_ms: i64, local_now_ms: i64, drift_ms: i64) -> i64 {
    (ends_at_server_ms - (local_now_ms + drift_ms)).max(0)
}

/// Round a remaining duration up to whole seconds for display.
pub fn display_seconds(remaining_ms: i64) -> i64 {
    (remaining_ms.max(0) + 999) / 1000
}

/// Timing of one answer window, anchored at the moment it was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundWindow {
    pub starts_at_server_ms: i64,
    pub ends_at_server_ms: i64,
    pub server_now_at_receipt_ms: i64,
    pub local_now_at_receipt_ms: i64,
}

impl RoundWindow {
    /// Build a window, clamping `ends_at` so that it is never before `starts_at`.
    pub fn new(
        starts_at_server_ms: i64,
        ends_at_server_ms: i64,
        server_now_at_receipt_ms: i64,
        local_now_at_receipt_ms: i64,
    ) -> Self {
        if ends_at_server_ms < starts_at_server_ms {
            tracing::warn!(
                "Round window ends before it starts ({} < {}), clamping",
                ends_at_server_ms,
                starts_at_server_ms
            );
        }
        Self {
            starts_at_server_ms,
            ends_at_server_ms: ends_at_server_ms.max(starts_at_server_ms),
            server_now_at_receipt_ms,
            local_now_at_receipt_ms,
        }
    }

    pub fn drift_ms(&self) -> i64 {
        clock_drift(self.server_now_at_receipt_ms, self.local_now_at_receipt_ms)
    }

    pub fn remaining_ms(&self, local_now_ms: i64) -> i64 {
        remaining_ms(self.ends_at_server_ms, local_now_ms, self.drift_ms())
    }

    pub fn remaining_display_seconds(&self, local_now_ms: i64) -> i64 {
        display_seconds(self.remaining_ms(local_now_ms))
    }
}
