use shared::{ErrorCode, ServerMessage};
use thiserror::Error;
use tictactoe_core::logic::game::MatchError;

/// Failures reported back to the connection that caused them.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Game {0} not found")]
    MatchNotFound(String),
    #[error("Invalid message format: {0}")]
    Malformed(String),
    #[error("Too many messages, slow down")]
    RateLimited,
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl SessionError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MatchNotFound(_) => ErrorCode::MatchNotFound,
            Self::Malformed(_) => ErrorCode::MalformedMessage,
            Self::RateLimited => ErrorCode::RateLimited,
            Self::Match(err) => ErrorCode::from(err),
        }
    }

    #[must_use]
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ClientMessage;

    #[test]
    fn maps_match_errors_to_codes() {
        let err = SessionError::from(MatchError::CellOccupied(3));
        assert_eq!(err.code(), ErrorCode::CellOccupied);
        assert_eq!(err.to_string(), "Position 3 already taken");
    }

    #[test]
    fn parse_failures_become_malformed() {
        let err: SessionError = ClientMessage::parse("{").unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::MalformedMessage);
        assert!(matches!(err.to_message(), ServerMessage::Error { .. }));
    }
}
