//! Error types for the Niwot quiz client.

use thiserror::Error;

use crate::infrastructure::{api::ApiError, transport::TransportError};

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API or WebSocket endpoint configured
    #[error("Client not configured: {0}")]
    NotConfigured(String),

    /// Room code does not match `^[A-Z0-9]{6}$` after normalization
    #[error("Invalid room code '{0}' (6 characters A-Z/0-9)")]
    InvalidRoomCode(String),

    /// Operation requires an active room
    #[error("Not in a room")]
    NotInRoom,

    /// Host-only operation attempted by another player
    #[error("Only the host can do that")]
    NotHost,

    /// Rejected locally before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Event channel error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// REST API error
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Rejection reported by the `profile:update` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileUpdateError {
    #[error("Old password is incorrect")]
    BadOldPassword,

    #[error("New passwords do not match")]
    PasswordMismatch,

    #[error("Fill in the old password, the new password and its confirmation")]
    MissingPasswordFields,

    #[error("Invalid image")]
    BadImage,

    #[error("Profile update failed: {0}")]
    Other(String),
}

impl ProfileUpdateError {
    /// Map the `error` code of a refused ack.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("bad_old_password") => Self::BadOldPassword,
            Some("password_mismatch") => Self::PasswordMismatch,
            Some("missing_password_fields") => Self::MissingPasswordFields,
            Some("bad_image") => Self::BadImage,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other("update_failed".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_error_codes() {
        // テスト項目: profile:update の既知のエラーコードが対応するエラーに変換される
        // given (前提条件):
        let codes = [
            Some("bad_old_password"),
            Some("password_mismatch"),
            Some("missing_password_fields"),
            Some("bad_image"),
        ];

        // when (操作):
        let errors: Vec<ProfileUpdateError> =
            codes.into_iter().map(ProfileUpdateError::from_code).collect();

        // then (期待する結果):
        assert_eq!(
            errors,
            vec![
                ProfileUpdateError::BadOldPassword,
                ProfileUpdateError::PasswordMismatch,
                ProfileUpdateError::MissingPasswordFields,
                ProfileUpdateError::BadImage,
            ]
        );
    }

    #[test]
    fn test_profile_error_unknown_code() {
        // テスト項目: 未知のコードやコードなしは Other になる
        // given (前提条件):
        let unknown = Some("rate_limited");

        // when (操作):
        let error = ProfileUpdateError::from_code(unknown);
        let missing = ProfileUpdateError::from_code(None);

        // then (期待する結果):
        assert_eq!(error, ProfileUpdateError::Other("rate_limited".to_string()));
        assert_eq!(missing.to_string(), "Profile update failed: update_failed");
    }
}
