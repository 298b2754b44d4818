//! Event channel transport.
//!
//! The network side runs on its own tokio task and never touches session
//! state. Everything it observes is pushed, in arrival order, onto an
//! [`EventQueue`] drained by the single consumer that owns the state.

mod queue;
mod reconnect;
mod websocket;

pub use queue::{EventProducer, EventQueue, event_queue};
pub use reconnect::{is_fatal, should_attempt_reconnect};
pub use websocket::{WebSocketConfig, WebSocketTransport};

use serde_json::Value;
use thiserror::Error;

use crate::infrastructure::dto::OutboundEvent;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Emit attempted while the channel is down; the frame is dropped
    #[error("Event channel is not connected")]
    NotConnected,

    /// The transport has been shut down
    #[error("Event channel is closed")]
    Closed,

    /// The server refused the handshake credentials
    #[error("Event channel rejected the credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What the network side reports to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Message { name: String, payload: Value },
    Ack { id: u64, payload: Value },
}

/// Outbound half of the channel, as seen by the session.
///
/// Emits never block: the frame is handed to the network task and the call
/// returns. Acks come back later as [`TransportEvent::Ack`] through the queue.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: OutboundEvent, data: Value) -> Result<(), TransportError>;

    /// Emit and request an acknowledgement. Returns the correlation id.
    fn emit_with_ack(&self, event: OutboundEvent, data: Value) -> Result<u64, TransportError>;

    fn is_connected(&self) -> bool;

    fn disconnect(&self);
}
