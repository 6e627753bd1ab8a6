use crate::error::SessionError;
use shared::{MatchSnapshot, ServerMessage};
use tictactoe_core::logic::game::Match;
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};

pub type Tx = mpsc::UnboundedSender<ServerMessage>;

pub struct Player {
    pub tx: Tx,
    pub last_msg_at: Option<Instant>,
}

pub struct GameSession {
    pub game: Match,
    /// Second seat is held by the built-in bot.
    pub practice: bool,
    pub created_at: Instant,
    /// Pending delayed eviction after one player left.
    pub eviction: Option<JoinHandle<()>>,
    /// Set under the write guard when the game leaves the registry.
    pub removed: bool,
}

impl GameSession {
    pub fn new(game: Match, practice: bool) -> Self {
        Self {
            game,
            practice,
            created_at: Instant::now(),
            eviction: None,
            removed: false,
        }
    }

    /// Fails for a handle whose game was deleted while the caller waited
    /// on the lock.
    pub fn ensure_live(&self) -> Result<(), SessionError> {
        if self.removed {
            return Err(SessionError::MatchNotFound(self.game.id().to_string()));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot::new(&self.game, self.practice)
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.game.member_ids().map(str::to_string).collect()
    }

    /// Identity the bot plays under in practice games.
    pub fn bot_id(&self) -> Option<String> {
        self.practice.then(|| bot_id(self.game.id()))
    }
}

pub fn bot_id(game_id: &str) -> String {
    format!("bot-{game_id}")
}
