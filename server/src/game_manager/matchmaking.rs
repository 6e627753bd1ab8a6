use crate::{
    error::SessionError,
    game_manager::{generate_game_id, session::bot_id, AppState, GameSession, SessionHandle},
};
use dashmap::mapref::entry::Entry;
use shared::{GameSummary, MatchSnapshot, ServerMessage};
use std::sync::Arc;
use tictactoe_core::logic::game::{Match, MatchError, Phase};
use tokio::sync::RwLock;

impl AppState {
    pub async fn create_game(self: &Arc<Self>, player_id: &str) -> Result<(), SessionError> {
        let (game_id, snapshot) = self.open_game(player_id, false)?;
        tracing::info!(player_id = %player_id, game_id = %game_id, "Created new game");
        self.rebind(player_id, &game_id).await;
        self.send_to(
            player_id,
            ServerMessage::GameCreated {
                game_id,
                game: snapshot,
            },
        );
        Ok(())
    }

    /// Opens a practice game with the bot in the second seat. The human
    /// always plays first.
    pub async fn create_bot_game(self: &Arc<Self>, player_id: &str) -> Result<(), SessionError> {
        let (game_id, snapshot) = self.open_game(player_id, true)?;
        tracing::info!(player_id = %player_id, game_id = %game_id, "Created practice game");
        self.rebind(player_id, &game_id).await;
        self.send_to(
            player_id,
            ServerMessage::GameCreated {
                game_id,
                game: snapshot.clone(),
            },
        );
        self.send_to(player_id, ServerMessage::GameStarted { game: snapshot });
        Ok(())
    }

    pub async fn join_game(
        self: &Arc<Self>,
        player_id: &str,
        game_id: &str,
    ) -> Result<(), SessionError> {
        let handle = self.game_handle(game_id)?;
        let (snapshot, members, previous) = {
            let mut session = handle.write().await;
            session.ensure_live()?;
            session.game.join(player_id)?;
            let previous = self.bind(player_id, game_id);
            (session.snapshot(), session.member_ids(), previous)
        };

        tracing::info!(player_id = %player_id, game_id = %game_id, "Player joined, game started");
        if let Some(previous) = previous {
            self.leave_previous(player_id, &previous).await;
        }
        self.broadcast(&members, &ServerMessage::GameStarted { game: snapshot });
        Ok(())
    }

    /// Joins the first waiting game that still accepts a player, or opens a
    /// new one.
    pub async fn find_game(self: &Arc<Self>, player_id: &str) -> Result<(), SessionError> {
        for summary in self.list_waiting().await {
            match self.join_game(player_id, &summary.id).await {
                Ok(()) => return Ok(()),
                Err(
                    SessionError::MatchNotFound(_)
                    | SessionError::Match(MatchError::MatchFull | MatchError::AlreadyMember),
                ) => continue,
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(player_id = %player_id, "No waiting game found");
        self.create_game(player_id).await
    }

    /// Waiting games ordered by id.
    pub async fn list_waiting(&self) -> Vec<GameSummary> {
        let handles: Vec<SessionHandle> = self
            .games
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut waiting = Vec::new();
        for handle in handles {
            let session = handle.read().await;
            if !session.removed && session.game.phase() == Phase::Waiting {
                waiting.push(GameSummary {
                    id: session.game.id().to_string(),
                    players: session.game.members().len(),
                });
            }
        }
        waiting.sort_by(|a, b| a.id.cmp(&b.id));
        waiting
    }

    /// Registers a fresh game under an unused id.
    fn open_game(
        &self,
        player_id: &str,
        practice: bool,
    ) -> Result<(String, MatchSnapshot), SessionError> {
        loop {
            let game_id = generate_game_id();
            match self.games.entry(game_id.clone()) {
                Entry::Occupied(_) => {
                    tracing::debug!(game_id = %game_id, "Game id collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    let mut game = Match::new(game_id.clone(), player_id);
                    if practice {
                        game.join(bot_id(&game_id))?;
                    }
                    let session = GameSession::new(game, practice);
                    let snapshot = session.snapshot();
                    slot.insert(Arc::new(RwLock::new(session)));
                    return Ok((game_id, snapshot));
                }
            }
        }
    }

    /// Points `player_id` at `game_id`, leaving whatever game it was in before.
    async fn rebind(self: &Arc<Self>, player_id: &str, game_id: &str) {
        if let Some(previous) = self.bind(player_id, game_id) {
            self.leave_previous(player_id, &previous).await;
        }
    }

    /// Records the new binding and returns the game it replaced, if any.
    fn bind(&self, player_id: &str, game_id: &str) -> Option<String> {
        self.player_to_game
            .insert(player_id.to_string(), game_id.to_string())
            .filter(|prev| prev != game_id)
    }

    async fn leave_previous(self: &Arc<Self>, player_id: &str, previous: &str) {
        tracing::info!(player_id = %player_id, game_id = %previous, "Leaving previous game");
        self.depart(player_id, previous).await;
    }
}
