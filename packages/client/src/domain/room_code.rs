//! Room code value object.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::ClientError;

/// Number of characters in a room code
pub const ROOM_CODE_LEN: usize = 6;

/// A validated room code: exactly six uppercase ASCII letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalize user input and validate it as a room code.
    ///
    /// # Arguments
    ///
    /// * `input` - Raw text as typed by the user (may contain spaces, lowercase, punctuation)
    ///
    /// # Returns
    ///
    /// * `Ok(RoomCode)` - The normalized code
    /// * `Err(ClientError::InvalidRoomCode)` - The normalized text is not six valid characters
    pub fn parse(input: &str) -> Result<Self, ClientError> {
        let normalized = normalize_room_code(input);
        if is_valid_room_code(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(ClientError::InvalidRoomCode(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RoomCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Strip everything that is not an ASCII letter or digit and uppercase the rest.
pub fn normalize_room_code(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Check an already-normalized code against `^[A-Z0-9]{6}$`.
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
