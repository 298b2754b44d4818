//! Session layer: the coordinator that owns all room/quiz state, and the
//! async runner that feeds it.
//!
//! Inputs (transport events and REST outcomes) reach the coordinator through
//! one ordered queue. Its outputs are navigation signals for the front end
//! and REST requests for the runner.

pub mod command;
mod coordinator;
mod runner;
mod timer;

pub use coordinator::{LeaveReason, Screen, SessionCoordinator, Signal};
pub use runner::{SessionRunner, execute_request};
pub use timer::{Timer, TimerKind, Timers};

use crate::{
    domain::{Identity, RoomCode, RoomConfig, RoomSnapshot, Visibility},
    infrastructure::{
        api::{Category, LeaderEntry, ProposerEntry, PublicRoom, Suggestion},
        transport::TransportEvent,
    },
};

/// Everything the coordinator consumes, in arrival order.
#[derive(Debug)]
pub enum SessionInput {
    Transport(TransportEvent),
    Api(ApiOutcome),
}

impl From<TransportEvent> for SessionInput {
    fn from(event: TransportEvent) -> Self {
        Self::Transport(event)
    }
}

impl From<ApiOutcome> for SessionInput {
    fn from(outcome: ApiOutcome) -> Self {
        Self::Api(outcome)
    }
}

/// REST work requested by the coordinator, executed by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    CreateRoom {
        name: Option<String>,
        visibility: Visibility,
    },
    JoinRoom(RoomCode),
    FetchRoom(RoomCode),
    PutSettings {
        code: RoomCode,
        config: RoomConfig,
    },
    LoadMedia {
        round: u64,
        url: String,
    },
    FetchMe,
    Logout,
    PublicRooms,
    Leaderboard,
    Categories,
    Suggest(Suggestion),
}

/// Result of an [`ApiRequest`]; errors are already rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    RoomReady(Result<RoomCode, String>),
    RoomFetched {
        code: RoomCode,
        snapshot: Result<RoomSnapshot, String>,
    },
    SettingsSaved {
        code: RoomCode,
        result: Result<(), String>,
    },
    MediaLoaded {
        round: u64,
        data: Option<Vec<u8>>,
    },
    Me(Result<Identity, String>),
    LoggedOut,
    PublicRooms(Result<Vec<PublicRoom>, String>),
    Leaderboard(Result<(Vec<LeaderEntry>, Vec<ProposerEntry>), String>),
    Categories(Result<Vec<Category>, String>),
    Suggested(Result<(), String>),
}
