//! Normalization of inbound payloads.
//!
//! The server is loose about shapes: a roster may arrive as `players`,
//! `members` or `room.members`, numbers may arrive as strings, the scoring
//! mode has two spellings. Every accepted shape is mapped here into a single
//! canonical domain value before any state machine sees it.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{
    GameEndSummary, Player, Proposal, Question, QuestionStart, QuestionType, RoomConfigPatch,
    RoomSnapshot, RoundResult, ScoringMode, TopPlayer, UserId, Visibility,
};

/// Malformed inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(&'static str),
}

impl PayloadError {
    /// Short name shown in the transient status line.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAnObject => "NotAnObject",
            Self::MissingField(_) => "MissingField",
        }
    }
}

const MEDIA_KEYS: [&str; 4] = ["url", "href", "src", "path"];

fn object(data: &Value) -> Result<&Map<String, Value>, PayloadError> {
    data.as_object().ok_or(PayloadError::NotAnObject)
}

/// First non-null value among `keys`.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(text)
}

/// Integer from a JSON number (integral floats included) or a numeric string.
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn integer_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    field(obj, keys).and_then(integer)
}

fn u32_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    integer_field(obj, keys).and_then(|n| u32::try_from(n).ok())
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

fn user_id(value: &Value) -> Option<UserId> {
    UserId::deserialize(value).ok()
}

/// Opaque media reference: a non-blank string, or an object carrying one
/// under `url`, `href`, `src` or `path`.
pub fn media_reference(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => MEDIA_KEYS
            .iter()
            .filter_map(|key| obj.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty()),
        _ => None,
    }?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// One roster entry. Entries without a usable user id are dropped.
pub fn player(value: &Value) -> Option<Player> {
    let obj = value.as_object()?;
    let user_id = field(obj, &["userId", "id"]).and_then(user_id)?;
    Some(Player {
        user_id,
        username: text_field(obj, &["username", "name"]).unwrap_or_default(),
        avatar: field(obj, &["avatar", "profileImage"]).and_then(media_reference),
        points: integer_field(obj, &["points"])
            .map_or(0, |p| u32::try_from(p.max(0)).unwrap_or(u32::MAX)),
    })
}

fn roster(obj: &Map<String, Value>) -> Option<Vec<Player>> {
    let nested = obj.get("room").and_then(Value::as_object);
    let list = obj
        .get("players")
        .and_then(Value::as_array)
        .or_else(|| obj.get("members").and_then(Value::as_array))
        .or_else(|| nested.and_then(|room| room.get("members")?.as_array()))
        .or_else(|| nested.and_then(|room| room.get("players")?.as_array()))?;
    Some(list.iter().filter_map(player).collect())
}

/// Sparse config from either the WebSocket `params` or the REST `settings` shape.
pub fn config_patch(value: &Value) -> Option<RoomConfigPatch> {
    let obj = value.as_object()?;
    let visibility = match bool_field(obj, "private") {
        Some(true) => Some(Visibility::Private),
        Some(false) => Some(Visibility::Public),
        None => obj
            .get("visibility")
            .and_then(Value::as_str)
            .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "private" => Some(Visibility::Private),
                "public" => Some(Visibility::Public),
                _ => None,
            }),
    };
    let scoring_mode = field(obj, &["scoring", "pointMode"])
        .and_then(Value::as_str)
        .and_then(ScoringMode::from_wire);
    let category_ids = obj
        .get("categories")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(integer).collect::<BTreeSet<i64>>());
    let excluded_usernames = obj
        .get("excludedUsernames")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(text).collect::<Vec<String>>());

    let patch = RoomConfigPatch {
        visibility,
        max_players: u32_field(obj, &["maxPlayers"]),
        answer_time_sec: u32_field(obj, &["answerTimeSec"]),
        target_points: u32_field(obj, &["targetPoints", "TargetPoints"]),
        scoring_mode,
        show_proposals: bool_field(obj, "showProposals"),
        category_ids,
        result_delay_sec: u32_field(obj, &["resultDelaySec"]),
        excluded_usernames,
    };
    (!patch.is_empty()).then_some(patch)
}

/// Room update in any accepted shape: `room:update`, membership events,
/// or the REST room document (`name`, `hostId`, `settings`, `members`).
pub fn room_snapshot(data: &Value) -> Result<RoomSnapshot, PayloadError> {
    let obj = object(data)?;
    let nested = obj.get("room").and_then(Value::as_object);
    let lookup = |keys: &[&str]| field(obj, keys).or_else(|| nested.and_then(|r| field(r, keys)));

    Ok(RoomSnapshot {
        code: lookup(&["code", "roomCode"])
            .and_then(Value::as_str)
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty()),
        title: lookup(&["title", "name"]).and_then(text),
        host_user_id: lookup(&["hostUserId", "hostId"]).and_then(user_id),
        config: lookup(&["params", "settings"]).and_then(config_patch),
        players: roster(obj),
    })
}

/// `quiz:question`: `{serverNow, question, startsAt, endsAt}`.
pub fn question_start(data: &Value) -> Result<QuestionStart, PayloadError> {
    let obj = object(data)?;
    let question = obj
        .get("question")
        .and_then(Value::as_object)
        .ok_or(PayloadError::MissingField("question"))?;

    Ok(QuestionStart {
        server_now_ms: integer_field(obj, &["serverNow", "serverNowMs"]),
        question: Question {
            id: text_field(question, &["id"]).unwrap_or_default(),
            text: text_field(question, &["text"]).unwrap_or_default(),
            question_type: question
                .get("type")
                .and_then(Value::as_str)
                .map(QuestionType::from_wire)
                .unwrap_or_default(),
            citation_text: question
                .get("citationText")
                .and_then(Value::as_str)
                .map(str::to_string),
            image_path: question.get("imagePath").and_then(media_reference),
        },
        starts_at_ms: integer_field(obj, &["startsAt", "startsAtMs"]),
        ends_at_ms: integer_field(obj, &["endsAt", "endsAtMs"]),
    })
}

/// `quiz:proposals`: a raw list or `{proposals: [...]}`; anything else is empty.
pub fn proposals(data: &Value) -> Vec<Proposal> {
    let list = match data {
        Value::Array(list) => Some(list),
        Value::Object(obj) => obj.get("proposals").and_then(Value::as_array),
        _ => None,
    };
    list.map(|items| {
        items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                Some(Proposal {
                    user_id: obj.get("userId").and_then(user_id)?,
                    guess: obj.get("guess")?.as_str()?.to_string(),
                    points: integer_field(obj, &["points"]),
                })
            })
            .collect()
    })
    .unwrap_or_default()
}

/// `quiz:result`: `{correct, first?, explanation?}`.
pub fn round_result(data: &Value) -> Result<RoundResult, PayloadError> {
    let obj = object(data)?;
    Ok(RoundResult {
        correct_answer: text_field(obj, &["correct", "correctAnswer"]).unwrap_or_default(),
        first_solver: text_field(obj, &["first", "firstSolver"]).filter(|s| !s.is_empty()),
        explanation: text_field(obj, &["explanation"]).filter(|s| !s.trim().is_empty()),
    })
}

pub const DEFAULT_GAME_END_REASON: &str = "Game over";

/// `quiz:ended`: `{reason, top}`. A non-object payload still ends the game.
pub fn game_end(data: &Value) -> GameEndSummary {
    let Some(obj) = data.as_object() else {
        return GameEndSummary {
            reason: DEFAULT_GAME_END_REASON.to_string(),
            top_players: Vec::new(),
        };
    };
    let top_players = field(obj, &["top", "topPlayers"])
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .map(|entry| TopPlayer {
                    username: text_field(entry, &["username"]).unwrap_or_else(|| "?".to_string()),
                    points: integer_field(entry, &["points"]).unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default();
    GameEndSummary {
        reason: text_field(obj, &["reason"])
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GAME_END_REASON.to_string()),
        top_players,
    }
}

/// `quiz:answer` ack. `None` for a malformed ack.
pub fn answer_ack(data: &Value) -> Option<bool> {
    let obj = data.as_object()?;
    Some(obj.get("correct").and_then(Value::as_bool).unwrap_or(false))
}

/// `{ok, error?}` acks. A malformed ack counts as a refusal.
pub fn ok_ack(data: &Value) -> Result<(), Option<String>> {
    let Some(obj) = data.as_object() else {
        return Err(None);
    };
    if bool_field(obj, "ok") == Some(true) {
        Ok(())
    } else {
        Err(text_field(obj, &["error", "message"]))
    }
}

/// Exclusion list carried by a `room:unban` ack.
pub fn excluded_usernames(data: &Value) -> Option<Vec<String>> {
    data.get("excludedUsernames")?
        .as_array()
        .map(|names| names.iter().filter_map(text).collect())
}
