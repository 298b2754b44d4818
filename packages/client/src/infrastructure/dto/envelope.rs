//! JSON frames exchanged over the WebSocket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server frame. `id` is present only when an ack is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

/// Server → client frame: either an acknowledgement or a broadcast event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Ack {
        ack: u64,
        #[serde(default)]
        data: Value,
    },
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
}

impl OutboundFrame {
    pub fn new(event: impl Into<String>, data: Value, id: Option<u64>) -> Self {
        Self {
            event: event.into(),
            data,
            id,
        }
    }
}
