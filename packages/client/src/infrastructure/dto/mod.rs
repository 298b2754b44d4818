//! Data Transfer Objects (DTOs) for the event channel.
//!
//! - `envelope`: JSON frames carried by the WebSocket
//! - `event`: typed event names, inbound and outbound
//! - `payload`: normalization of inbound payloads into domain values
//! - `conversion`: domain values to outbound payloads

pub mod conversion;
pub mod envelope;
pub mod event;
pub mod payload;

pub use envelope::{InboundFrame, OutboundFrame};
pub use event::{InboundEvent, OutboundEvent};
pub use payload::PayloadError;
