use serde::{Deserialize, Serialize};
use tictactoe_core::logic::{
    board::{Board, Mark},
    game::{Match, MatchError, Phase},
    rules::Outcome,
};

/// Messages sent by clients. Every frame is a JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateGame,
    #[serde(rename_all = "camelCase")]
    JoinGame {
        game_id: String,
    },
    /// Join any waiting game, or open a new one if none is waiting.
    FindGame,
    #[serde(rename_all = "camelCase")]
    MakeMove {
        game_id: String,
        position: i64,
    },
    ListGames,
    #[serde(rename_all = "camelCase")]
    ResetGame {
        game_id: String,
    },
    LeaveGame,
    CreateBotGame,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Connected {
        player_id: String,
    },
    #[serde(rename_all = "camelCase")]
    GameCreated {
        game_id: String,
        game: MatchSnapshot,
    },
    GameStarted {
        game: MatchSnapshot,
    },
    GameReset {
        game: MatchSnapshot,
    },
    MoveMade {
        game: MatchSnapshot,
        position: usize,
        /// Seat (0 or 1) of the member who played.
        player: usize,
        mark: Mark,
    },
    GamesList {
        games: Vec<GameSummary>,
    },
    #[serde(rename_all = "camelCase")]
    PlayerDisconnected {
        game_id: String,
    },
    #[serde(rename_all = "camelCase")]
    LeftGame {
        game_id: String,
    },
    #[serde(rename_all = "camelCase")]
    GameExpired {
        game_id: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Game snapshot carried by this message, if any.
    #[must_use]
    pub fn game(&self) -> Option<&MatchSnapshot> {
        match self {
            Self::GameCreated { game, .. }
            | Self::GameStarted { game }
            | Self::GameReset { game }
            | Self::MoveMade { game, .. } => Some(game),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Outcome> for Winner {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win(Mark::X) => Self::X,
            Outcome::Win(Mark::O) => Self::O,
            Outcome::Draw => Self::Draw,
        }
    }
}

/// Full state of a match as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub id: String,
    pub players: Vec<String>,
    pub board: Board,
    pub current_player: usize,
    pub status: Phase,
    pub winner: Option<Winner>,
    pub practice: bool,
}

impl MatchSnapshot {
    #[must_use]
    pub fn new(game: &Match, practice: bool) -> Self {
        Self {
            id: game.id().to_string(),
            players: game.member_ids().map(str::to_string).collect(),
            board: *game.board(),
            current_player: game.turn(),
            status: game.phase(),
            winner: game.outcome().map(Winner::from),
            practice,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: String,
    pub players: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MatchNotFound,
    MatchFull,
    AlreadyMember,
    NotAMember,
    NotYourTurn,
    OutOfRange,
    CellOccupied,
    GameOver,
    MalformedMessage,
    RateLimited,
}

impl From<&MatchError> for ErrorCode {
    fn from(err: &MatchError) -> Self {
        match err {
            MatchError::MatchFull => Self::MatchFull,
            MatchError::AlreadyMember => Self::AlreadyMember,
            MatchError::NotAMember => Self::NotAMember,
            MatchError::NotYourTurn => Self::NotYourTurn,
            MatchError::OutOfRange(_) => Self::OutOfRange,
            MatchError::CellOccupied(_) => Self::CellOccupied,
            MatchError::GameOver => Self::GameOver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_client_messages() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"create_game"}"#).unwrap(),
            ClientMessage::CreateGame
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"make_move","gameId":"ABC123","position":-1}"#)
                .unwrap(),
            ClientMessage::MakeMove {
                game_id: "ABC123".to_string(),
                position: -1,
            }
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_messages() {
        assert!(ClientMessage::parse(r#"{"type":"fly_away"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"join_game"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"make_move","gameId":"A"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
    }

    #[test]
    fn snapshot_wire_shape() {
        let mut game = Match::new("ABC123", "p1");
        game.join("p2").unwrap();
        game.apply_move("p1", 4).unwrap();

        let msg = ServerMessage::GameStarted {
            game: MatchSnapshot::new(&game, false),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "game_started");
        assert_eq!(value["game"]["id"], "ABC123");
        assert_eq!(value["game"]["players"], serde_json::json!(["p1", "p2"]));
        assert_eq!(value["game"]["board"][4], "X");
        assert!(value["game"]["board"][0].is_null());
        assert_eq!(value["game"]["currentPlayer"], 1);
        assert_eq!(value["game"]["status"], "playing");
        assert!(value["game"]["winner"].is_null());
    }

    #[test]
    fn error_codes_are_snake_case() {
        let msg = ServerMessage::Error {
            code: ErrorCode::from(&MatchError::NotYourTurn),
            message: MatchError::NotYourTurn.to_string(),
        };
        assert_eq!(
            msg.to_json().unwrap(),
            r#"{"type":"error","code":"not_your_turn","message":"Not your turn"}"#
        );
    }

    #[test]
    fn draw_winner_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Winner::from(Outcome::Draw)).unwrap(),
            r#""draw""#
        );
        assert_eq!(
            serde_json::to_string(&Winner::from(Outcome::Win(Mark::O))).unwrap(),
            r#""O""#
        );
    }
}
