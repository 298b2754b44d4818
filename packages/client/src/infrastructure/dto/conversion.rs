//! Conversion from domain values to outbound payloads.

use serde_json::{Value, json};

use crate::domain::{Identity, RoomCode, RoomConfig, ScoringMode, Visibility};

// ========================================
// Event channel
// ========================================

/// `{code}`: room:leave, room:sync, room:start, quiz:sync.
pub fn code_payload(code: &RoomCode) -> Value {
    json!({ "code": code })
}

pub fn join_payload(code: &RoomCode, identity: Option<&Identity>) -> Value {
    json!({
        "code": code,
        "username": identity.map(|me| me.username.as_str()),
        "userId": identity.map(|me| &me.user_id),
        "avatar": identity.and_then(|me| me.avatar.as_deref()),
    })
}

pub fn answer_payload(code: &RoomCode, answer: &str) -> Value {
    json!({ "code": code, "answer": answer })
}

pub fn unban_payload(code: &RoomCode, username: &str) -> Value {
    json!({ "code": code, "username": username })
}

fn ws_scoring(mode: ScoringMode) -> &'static str {
    match mode {
        ScoringMode::Degressive => "degressif",
        ScoringMode::Fixed => "fixe",
    }
}

/// Full config in the `params` shape of the event channel.
pub fn config_params(config: &RoomConfig) -> Value {
    json!({
        "private": config.visibility == Visibility::Private,
        "maxPlayers": config.max_players,
        "answerTimeSec": config.answer_time_sec,
        "targetPoints": config.target_points,
        "scoring": ws_scoring(config.scoring_mode),
        "showProposals": config.show_proposals,
        "categories": config.category_ids,
        "resultDelaySec": config.result_delay_sec,
        "excludedUsernames": config.excluded_usernames,
    })
}

pub fn config_payload(code: &RoomCode, config: &RoomConfig) -> Value {
    json!({ "code": code, "params": config_params(config) })
}

/// `profile:update` fields. Blank fields are sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
    /// `data:` URI of the new avatar
    pub avatar_base64: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn profile_payload(changes: &ProfileChanges) -> Value {
    json!({
        "username": non_blank(&changes.username),
        "oldPassword": non_blank(&changes.old_password),
        "newPassword": non_blank(&changes.new_password),
        "confirmPassword": non_blank(&changes.confirm_password),
        "avatarBase64": non_blank(&changes.avatar_base64),
    })
}

// ========================================
// REST
// ========================================

/// Body of `PUT /rooms/{code}/settings`.
pub fn settings_body(config: &RoomConfig) -> Value {
    json!({
        "visibility": match config.visibility {
            Visibility::Public => "public",
            Visibility::Private => "private",
        },
        "maxPlayers": config.max_players,
        "categories": config.category_ids,
        "answerTimeSec": config.answer_time_sec,
        "targetPoints": config.target_points,
        "pointMode": match config.scoring_mode {
            ScoringMode::Degressive => "degressive",
            ScoringMode::Fixed => "fixed",
        },
        "showProposals": config.show_proposals,
        "resultDelaySec": config.result_delay_sec,
    })
}
