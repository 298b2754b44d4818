//! Niwot quiz client.
//!
//! Keeps a client-side mirror of a multiplayer quiz room synchronized with
//! the server over a WebSocket event channel, with a thin REST client for
//! everything outside the room.

pub mod config;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod infrastructure;
pub mod session;
pub mod ui;
