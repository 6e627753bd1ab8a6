use crate::{config::SessionSettings, error::SessionError};
use dashmap::DashMap;
use rand::Rng;
use shared::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod lifecycle;
pub mod matchmaking;
pub mod move_handler;
pub mod session;

pub use session::{GameSession, Player, Tx};

pub type SessionHandle = Arc<RwLock<GameSession>>;

const GAME_ID_LEN: usize = 6;
const GAME_ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Registry of live connections and games.
///
/// Each game sits behind its own lock, so validation and mutation of a move
/// happen under one write guard. Map guards are never held across `.await`.
pub struct AppState {
    pub players: DashMap<String, Player>,
    pub games: DashMap<String, SessionHandle>,
    pub player_to_game: DashMap<String, String>,
    pub settings: SessionSettings,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl AppState {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            players: DashMap::new(),
            games: DashMap::new(),
            player_to_game: DashMap::new(),
            settings,
        }
    }

    pub fn check_rate_limit(&self, player_id: &str) -> bool {
        use tokio::time::Instant;
        let Some(mut player) = self.players.get_mut(player_id) else {
            return false;
        };
        let now = Instant::now();
        if let Some(last) = player.last_msg_at {
            if now.duration_since(last) < self.settings.rate_limit {
                return false;
            }
        }
        player.last_msg_at = Some(now);
        true
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn game_handle(&self, game_id: &str) -> Result<SessionHandle, SessionError> {
        self.games
            .get(game_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SessionError::MatchNotFound(game_id.to_string()))
    }

    pub fn current_game(&self, player_id: &str) -> Option<String> {
        self.player_to_game
            .get(player_id)
            .map(|entry| entry.value().clone())
    }

    /// Sends to one connection; a missing or closed connection is skipped.
    pub fn send_to(&self, player_id: &str, msg: ServerMessage) {
        if let Some(player) = self.players.get(player_id) {
            if player.tx.send(msg).is_err() {
                tracing::debug!(player_id = %player_id, "Dropped message for closed connection");
            }
        }
    }

    pub fn broadcast(&self, recipients: &[String], msg: &ServerMessage) {
        for player_id in recipients {
            self.send_to(player_id, msg.clone());
        }
    }

    /// Routes one parsed client message. Errors go back to the sender only.
    pub async fn dispatch(
        self: &Arc<Self>,
        player_id: &str,
        msg: ClientMessage,
    ) -> Result<(), SessionError> {
        match msg {
            ClientMessage::CreateGame => self.create_game(player_id).await,
            ClientMessage::JoinGame { game_id } => self.join_game(player_id, &game_id).await,
            ClientMessage::FindGame => self.find_game(player_id).await,
            ClientMessage::MakeMove { game_id, position } => {
                self.handle_move(player_id, &game_id, position).await
            }
            ClientMessage::ListGames => {
                let games = self.list_waiting().await;
                self.send_to(player_id, ServerMessage::GamesList { games });
                Ok(())
            }
            ClientMessage::ResetGame { game_id } => self.handle_reset(player_id, &game_id).await,
            ClientMessage::LeaveGame => self.leave_game(player_id).await,
            ClientMessage::CreateBotGame => self.create_bot_game(player_id).await,
        }
    }

    /// Entry point for a raw text frame.
    pub async fn handle_text(self: &Arc<Self>, player_id: &str, text: &str) {
        let result = if self.check_rate_limit(player_id) {
            match ClientMessage::parse(text) {
                Ok(msg) => {
                    tracing::debug!(player_id = %player_id, ?msg, "Received message");
                    self.dispatch(player_id, msg).await
                }
                Err(err) => Err(err.into()),
            }
        } else {
            Err(SessionError::RateLimited)
        };

        if let Err(err) = result {
            tracing::warn!(player_id = %player_id, error = %err, "Request rejected");
            self.send_to(player_id, err.to_message());
        }
    }
}

pub fn generate_game_id() -> String {
    let mut rng = rand::thread_rng();
    (0..GAME_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..GAME_ID_ALPHABET.len());
            GAME_ID_ALPHABET.get(idx).map_or('0', |b| char::from(*b))
        })
        .collect()
}
