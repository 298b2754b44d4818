//! Line commands typed at the prompt.

use crate::{
    domain::{RoomConfig, ScoringMode, Visibility},
    error::ClientError,
    infrastructure::{
        api::{Suggestion, SuggestionKind},
        dto::conversion::ProfileChanges,
        media,
    },
};

pub const HELP: &str = "\
Commands:
  /create [name]              create a room and enter it
  /join CODE                  join a room by its 6-character code
  /leave                      leave the current room
  /start                      start the quiz (host)
  /set KEY VALUE              change a room parameter (host)
  /unban NAME                 lift an exclusion (host)
  /sync                       resynchronize the current view
  /rooms                      list public rooms
  /leaders                    show the leaderboards
  /categories                 list question categories
  /suggest citation IDS | QUESTION | ANSWER | QUOTE [| ALTERNATIVES [| EXPLANATION]]
  /suggest image IDS | QUESTION | ANSWER | FILE [| ALTERNATIVES [| EXPLANATION]]
                              propose a question (IDS and ALTERNATIVES are comma lists)
  /lobby                      back to the lobby view
  /profile                    show your profile
  /name NEW_NAME              change your username
  /password OLD NEW CONFIRM   change your password
  /avatar FILE                upload an avatar image
  /logout                     log out and exit
  /quit                       leave and exit
Any other line is sent as an answer.

Settings: private, max-players, answer-time, target-points, scoring,
show-proposals, categories, result-delay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(Option<String>),
    Join(String),
    Leave,
    Start,
    Set { key: String, value: String },
    Unban(String),
    Sync,
    Rooms,
    Leaders,
    Categories,
    Suggest {
        kind: SuggestionKind,
        /// `|`-separated fields, trimmed
        fields: Vec<String>,
    },
    Lobby,
    Profile,
    Rename(String),
    Password {
        old: String,
        new: String,
        confirm: String,
    },
    Avatar(String),
    Help,
    Logout,
    Quit,
    Answer(String),
    /// Known command with bad arguments, or an unknown command
    Invalid(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Answer(line.to_string()));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let words: Vec<&str> = args.split_whitespace().collect();

    let command = match (name, words.as_slice()) {
        ("create", []) => Command::Create(None),
        ("create", _) => Command::Create(Some(args.to_string())),
        ("join", [code]) => Command::Join(code.to_string()),
        ("leave", []) => Command::Leave,
        ("start", []) => Command::Start,
        ("set", [key, ..]) if words.len() >= 2 => Command::Set {
            key: key.to_string(),
            value: words[1..].join(" "),
        },
        ("unban", [username]) => Command::Unban(username.to_string()),
        ("sync", []) => Command::Sync,
        ("rooms", []) => Command::Rooms,
        ("leaders", []) => Command::Leaders,
        ("categories", []) => Command::Categories,
        ("suggest", [kind, _, ..]) => {
            let kind = match kind.to_ascii_lowercase().as_str() {
                "citation" => Some(SuggestionKind::Citation),
                "image" => Some(SuggestionKind::Image),
                _ => None,
            };
            let body = args
                .split_once(char::is_whitespace)
                .map_or("", |(_, rest)| rest.trim());
            match kind {
                Some(kind) => Command::Suggest {
                    kind,
                    fields: body.split('|').map(|f| f.trim().to_string()).collect(),
                },
                None => Command::Invalid(line.to_string()),
            }
        }
        ("lobby", []) => Command::Lobby,
        ("profile", []) => Command::Profile,
        ("name", [_, ..]) => Command::Rename(args.to_string()),
        ("password", [old, new, confirm]) => Command::Password {
            old: old.to_string(),
            new: new.to_string(),
            confirm: confirm.to_string(),
        },
        ("avatar", [_, ..]) => Command::Avatar(args.to_string()),
        ("help", _) => Command::Help,
        ("logout", []) => Command::Logout,
        ("quit" | "exit", []) => Command::Quit,
        _ => Command::Invalid(line.to_string()),
    };
    Some(command)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32, ClientError> {
    value
        .parse()
        .map_err(|_| ClientError::Validation(format!("{} expects a number, got '{}'", key, value)))
}

/// Apply a `/set KEY VALUE` edit to a copy of the room config.
///
/// Range checks happen later, when the config is submitted.
pub fn apply_setting(config: &mut RoomConfig, key: &str, value: &str) -> Result<(), ClientError> {
    let invalid = || ClientError::Validation(format!("invalid value '{}' for {}", value, key));
    match key.to_ascii_lowercase().replace('_', "-").as_str() {
        "private" => {
            config.visibility = if parse_bool(value).ok_or_else(invalid)? {
                Visibility::Private
            } else {
                Visibility::Public
            };
        }
        "max-players" => config.max_players = parse_number(key, value)?,
        "answer-time" => config.answer_time_sec = parse_number(key, value)?,
        "target-points" => config.target_points = parse_number(key, value)?,
        "result-delay" => config.result_delay_sec = parse_number(key, value)?,
        "scoring" => config.scoring_mode = ScoringMode::from_wire(value).ok_or_else(invalid)?,
        "show-proposals" => config.show_proposals = parse_bool(value).ok_or_else(invalid)?,
        "categories" => {
            config.category_ids = if value.eq_ignore_ascii_case("all") {
                Default::default()
            } else {
                value
                    .split(',')
                    .map(|id| id.trim().parse::<i64>().map_err(|_| invalid()))
                    .collect::<Result<_, _>>()?
            };
        }
        _ => {
            return Err(ClientError::Validation(format!(
                "unknown setting '{}'",
                key
            )));
        }
    }
    Ok(())
}

pub fn rename_changes(username: &str) -> ProfileChanges {
    ProfileChanges {
        username: Some(username.to_string()),
        ..Default::default()
    }
}

pub fn password_changes(old: &str, new: &str, confirm: &str) -> ProfileChanges {
    ProfileChanges {
        old_password: Some(old.to_string()),
        new_password: Some(new.to_string()),
        confirm_password: Some(confirm.to_string()),
        ..Default::default()
    }
}

/// Build a question proposal from `/suggest` fields.
///
/// Field order: category ids, question, answer, quote (citation) or file
/// (image), then optional alternatives and explanation. `image` carries the
/// bytes of the file for image questions.
pub fn build_suggestion(
    kind: SuggestionKind,
    fields: &[String],
    image: Option<Vec<u8>>,
) -> Result<Suggestion, ClientError> {
    let field = |index: usize| fields.get(index).map(String::as_str).unwrap_or("");
    let required = |index: usize, what: &str| {
        let value = field(index);
        if value.is_empty() {
            Err(ClientError::Validation(format!("{} is required", what)))
        } else {
            Ok(value.to_string())
        }
    };
    let comma_list = |value: &str| -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    };

    let category_ids = comma_list(field(0))
        .iter()
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| ClientError::Validation(format!("invalid category id '{}'", id)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if category_ids.is_empty() {
        return Err(ClientError::Validation(
            "choose at least one category".to_string(),
        ));
    }
    let text = required(1, "the question")?;
    let answer = required(2, "the answer")?;
    let (citation_text, image) = match kind {
        SuggestionKind::Citation => (Some(required(3, "the quote")?), None),
        SuggestionKind::Image => match image {
            Some(bytes) if !bytes.is_empty() => (None, Some(bytes)),
            _ => {
                return Err(ClientError::Validation("the image is required".to_string()));
            }
        },
    };

    Ok(Suggestion {
        text,
        kind,
        answer,
        alternatives: comma_list(field(4)),
        explanation: field(5).to_string(),
        category_ids,
        citation_text,
        image,
    })
}

/// Avatar upload from the raw bytes of an image file.
pub fn avatar_changes(file_name: &str, bytes: &[u8]) -> ProfileChanges {
    ProfileChanges {
        avatar_base64: Some(media::to_data_uri(media::guess_mime(file_name), bytes)),
        ..Default::default()
    }
}
