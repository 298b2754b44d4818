//! Infrastructure layer: wire formats, the event channel and the REST backend.

pub mod api;
pub mod dto;
pub mod media;
pub mod transport;
