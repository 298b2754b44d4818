//! Core data model of a quiz room and its rounds.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Identity key of a player.
///
/// The server sends numeric ids; string ids are accepted too and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(Self::from(n)),
            Raw::Str(s) if !s.trim().is_empty() => Ok(Self(s.trim().to_string())),
            Raw::Str(_) => Err(de::Error::custom("empty user id")),
        }
    }
}

/// The locally logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    /// Opaque avatar reference (URL, data URI or relative path)
    pub avatar: Option<String>,
}

/// A member of a room roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// How many points a correct answer earns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoringMode {
    /// 10 points for the first solver, decreasing for later ones
    #[default]
    Degressive,
    /// 10 points for every correct answer
    Fixed,
}

impl ScoringMode {
    /// Parse either spelling used on the wire (`degressif`/`degressive`, `fixe`/`fixed`).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "degressif" | "degressive" => Some(Self::Degressive),
            "fixe" | "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

/// Room parameters, mutable only by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    pub visibility: Visibility,
    pub max_players: u32,
    pub answer_time_sec: u32,
    pub target_points: u32,
    pub scoring_mode: ScoringMode,
    pub show_proposals: bool,
    /// Empty means every category
    pub category_ids: BTreeSet<i64>,
    pub result_delay_sec: u32,
    pub excluded_usernames: Vec<String>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            visibility: Visibility::Public,
            max_players: 10,
            answer_time_sec: 15,
            target_points: 100,
            scoring_mode: ScoringMode::Degressive,
            show_proposals: true,
            category_ids: BTreeSet::new(),
            result_delay_sec: 5,
            excluded_usernames: Vec::new(),
        }
    }
}

/// Sparse config update: only `Some` fields overwrite the mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomConfigPatch {
    pub visibility: Option<Visibility>,
    pub max_players: Option<u32>,
    pub answer_time_sec: Option<u32>,
    pub target_points: Option<u32>,
    pub scoring_mode: Option<ScoringMode>,
    pub show_proposals: Option<bool>,
    pub category_ids: Option<BTreeSet<i64>>,
    pub result_delay_sec: Option<u32>,
    pub excluded_usernames: Option<Vec<String>>,
}

impl RoomConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields present in the patch.
    ///
    /// # Returns
    ///
    /// `true` if any field of `config` actually changed
    pub fn apply_to(self, config: &mut RoomConfig) -> bool {
        let before = config.clone();
        if let Some(v) = self.visibility {
            config.visibility = v;
        }
        if let Some(v) = self.max_players {
            config.max_players = v;
        }
        if let Some(v) = self.answer_time_sec {
            config.answer_time_sec = v;
        }
        if let Some(v) = self.target_points {
            config.target_points = v;
        }
        if let Some(v) = self.scoring_mode {
            config.scoring_mode = v;
        }
        if let Some(v) = self.show_proposals {
            config.show_proposals = v;
        }
        if let Some(v) = self.category_ids {
            config.category_ids = v;
        }
        if let Some(v) = self.result_delay_sec {
            config.result_delay_sec = v;
        }
        if let Some(v) = self.excluded_usernames {
            config.excluded_usernames = v;
        }
        *config != before
    }
}

/// Canonical, already-normalized room update.
///
/// Every accepted wire shape is mapped into this before the room state
/// machine sees it. `None` means "absent from the payload, leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Raw room code carried by the payload, used for the stale-session guard
    pub code: Option<String>,
    pub title: Option<String>,
    pub host_user_id: Option<UserId>,
    pub config: Option<RoomConfigPatch>,
    /// Complete roster; replaces the player set atomically
    pub players: Option<Vec<Player>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionType {
    #[default]
    Text,
    Citation,
    Image,
}

impl QuestionType {
    /// Case-insensitive parse; anything unknown is treated as plain text.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CITATION" => Self::Citation,
            "IMAGE" => Self::Image,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub question_type: QuestionType,
    pub citation_text: Option<String>,
    pub image_path: Option<String>,
}

/// Payload of a `quiz:question` event after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionStart {
    pub server_now_ms: Option<i64>,
    pub question: Question,
    pub starts_at_ms: Option<i64>,
    pub ends_at_ms: Option<i64>,
}

/// A guess broadcast to the room during a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub user_id: UserId,
    pub guess: String,
    pub points: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundResult {
    pub correct_answer: String,
    pub first_solver: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopPlayer {
    pub username: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEndSummary {
    pub reason: String,
    pub top_players: Vec<TopPlayer>,
}
