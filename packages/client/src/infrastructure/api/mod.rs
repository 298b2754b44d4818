//! REST backend: authentication, rooms, categories, leaderboards, media.
//!
//! The session never calls this directly. It queues requests, the runner
//! executes them against a [`RoomApi`], and the outcome re-enters the
//! session through the same ordered queue as transport events.

mod http;
mod normalize;

pub use http::HttpApi;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Identity, RoomConfig, RoomSnapshot, Visibility};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("Response is missing '{0}'")]
    MissingField(&'static str),
}

/// Result of login or registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Option<String>,
    pub user: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub approved_count: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Lobby,
    Running,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicRoom {
    pub code: String,
    pub name: Option<String>,
    pub status: RoomStatus,
    pub players: u32,
    pub max_players: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderEntry {
    pub username: String,
    pub wins: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposerEntry {
    pub username: String,
    pub approved_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Citation,
    Image,
}

/// A question proposed by a player, sent as multipart form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub kind: SuggestionKind,
    pub answer: String,
    pub alternatives: Vec<String>,
    pub explanation: String,
    pub category_ids: Vec<i64>,
    pub citation_text: Option<String>,
    pub image: Option<Vec<u8>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError>;

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ApiError>;

    async fn me(&self) -> Result<Identity, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    async fn categories(&self) -> Result<Vec<Category>, ApiError>;

    async fn leaderboard(&self) -> Result<Vec<LeaderEntry>, ApiError>;

    async fn proposers(&self) -> Result<Vec<ProposerEntry>, ApiError>;

    /// Returns the code of the new room.
    async fn create_room(
        &self,
        name: Option<String>,
        visibility: Visibility,
    ) -> Result<String, ApiError>;

    /// Public rooms that currently have players.
    async fn public_rooms(&self) -> Result<Vec<PublicRoom>, ApiError>;

    async fn join_room(&self, code: &str) -> Result<(), ApiError>;

    async fn get_room(&self, code: &str) -> Result<RoomSnapshot, ApiError>;

    async fn put_settings(&self, code: &str, config: RoomConfig) -> Result<(), ApiError>;

    async fn suggest(&self, suggestion: Suggestion) -> Result<(), ApiError>;

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}
