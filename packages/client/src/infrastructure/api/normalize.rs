//! Normalization of REST response bodies.

use serde_json::{Map, Value};

use super::{Category, LeaderEntry, ProposerEntry, PublicRoom, RoomStatus};
use crate::{
    domain::{Identity, UserId},
    infrastructure::dto::payload::{integer, media_reference},
};

const LEADERBOARD_SIZE: usize = 10;
const CATEGORY_LIST_KEYS: [&str; 6] = ["categories", "data", "items", "result", "rows", "records"];

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Bearer token from `token`, `accessToken`, `jwt` or `data.token`.
pub fn token(data: &Value) -> Option<String> {
    let obj = data.as_object()?;
    first(obj, &["token", "accessToken", "jwt"])
        .or_else(|| obj.get("data")?.get("token"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// User object of an auth response: `user` when present, otherwise the body itself.
pub fn user(data: &Value) -> &Value {
    match data.get("user") {
        Some(user) if user.is_object() => user,
        _ => data,
    }
}

pub fn identity(user: &Value) -> Option<Identity> {
    let obj = user.as_object()?;
    let user_id = first(obj, &["id", "_id", "userId"]).and_then(string)?;
    Some(Identity {
        user_id: UserId::new(user_id),
        username: first(obj, &["username", "name"])
            .and_then(string)
            .unwrap_or_default(),
        avatar: first(obj, &["profileImage", "avatar"]).and_then(media_reference),
    })
}

/// Category list, bare or wrapped under one of the usual keys.
pub fn categories(data: &Value) -> Vec<Category> {
    let list = match data {
        Value::Array(list) => Some(list),
        Value::Object(obj) => CATEGORY_LIST_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array)),
        _ => None,
    };
    list.map(|items| {
        items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|c| {
                Some(Category {
                    id: first(c, &["id", "_id", "ID", "uuid"]).and_then(string)?,
                    name: first(c, &["name", "label", "title"]).and_then(string)?,
                    approved_count: first(
                        c,
                        &["questionCount", "approvedCount", "count", "questionsApproved"],
                    )
                    .and_then(integer),
                })
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Public rooms with at least one player.
pub fn public_rooms(data: &Value) -> Vec<PublicRoom> {
    let Some(rooms) = data.get("rooms").and_then(Value::as_array) else {
        return Vec::new();
    };
    rooms
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|room| {
            let code = room.get("code").and_then(string)?;
            let players = room
                .get("players")
                .and_then(integer)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            if players == 0 {
                return None;
            }
            Some(PublicRoom {
                code,
                name: room.get("name").and_then(string),
                status: match room.get("status").and_then(Value::as_str) {
                    Some("running") => RoomStatus::Running,
                    Some("ended") => RoomStatus::Ended,
                    _ => RoomStatus::Lobby,
                },
                players,
                max_players: room
                    .get("maxPlayers")
                    .and_then(integer)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(10),
            })
        })
        .collect()
}

fn ranking<'a>(data: &'a Value, keys: &[&str]) -> impl Iterator<Item = &'a Map<String, Value>> {
    let list = match data {
        Value::Array(list) => Some(list),
        Value::Object(obj) => keys
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array)),
        _ => None,
    };
    list.into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .take(LEADERBOARD_SIZE)
}

pub fn leaders(data: &Value) -> Vec<LeaderEntry> {
    ranking(data, &["leaders", "top"])
        .map(|u| LeaderEntry {
            username: u.get("username").and_then(string).unwrap_or_default(),
            wins: u.get("wins").and_then(integer).unwrap_or(0),
        })
        .collect()
}

pub fn proposers(data: &Value) -> Vec<ProposerEntry> {
    ranking(data, &["proposers"])
        .map(|u| ProposerEntry {
            username: u.get("username").and_then(string).unwrap_or_default(),
            approved_count: u.get("approvedCount").and_then(integer).unwrap_or(0),
        })
        .collect()
}

/// Code of a created room: `room.code` or `code`.
pub fn created_room_code(data: &Value) -> Option<String> {
    data.get("room")
        .and_then(|room| room.get("code"))
        .or_else(|| data.get("code"))
        .and_then(string)
        .map(|code| code.to_ascii_uppercase())
}

pub fn error_message(data: &Value) -> Option<String> {
    let obj = data.as_object()?;
    first(obj, &["error", "message"]).and_then(string)
}
