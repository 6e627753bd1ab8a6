use crate::{error::SessionError, game_manager::AppState};
use shared::ServerMessage;
use std::sync::Arc;
use tictactoe_core::{
    engine::choose_move,
    logic::game::{MoveRecord, Phase, ResetResult},
};

impl AppState {
    pub async fn handle_move(
        &self,
        player_id: &str,
        game_id: &str,
        position: i64,
    ) -> Result<(), SessionError> {
        let handle = self.game_handle(game_id)?;

        let (members, updates) = {
            let mut session = handle.write().await;
            session.ensure_live()?;
            let record = session.game.apply_move(player_id, position)?;
            let mut updates = vec![move_made(session.snapshot(), record)];

            if let Some(bot) = session.bot_id() {
                let bot_to_move = session.game.phase() == Phase::Playing
                    && session.game.current_member().is_some_and(|m| m.id == bot);
                let mark = session.game.mark_of(&bot);
                if let (true, Some(mark)) = (bot_to_move, mark) {
                    if let Some(cell) = choose_move(session.game.board(), mark) {
                        let position = i64::try_from(cell).unwrap_or(-1);
                        match session.game.apply_move(&bot, position) {
                            Ok(record) => {
                                tracing::debug!(game_id = %game_id, position = cell, "Bot moved");
                                updates.push(move_made(session.snapshot(), record));
                            }
                            Err(err) => {
                                tracing::error!(game_id = %game_id, error = %err, "Bot move rejected");
                            }
                        }
                    }
                }
            }

            if let Some(outcome) = session.game.outcome() {
                tracing::info!(game_id = %game_id, ?outcome, "Game finished");
            }
            (session.member_ids(), updates)
        };

        for update in &updates {
            self.broadcast(&members, update);
        }
        Ok(())
    }

    /// Restarts a game in place when both players are still there; otherwise
    /// the requester gets a brand new game.
    pub async fn handle_reset(
        self: &Arc<Self>,
        player_id: &str,
        game_id: &str,
    ) -> Result<(), SessionError> {
        let handle = self.game_handle(game_id)?;

        let restarted = {
            let mut session = handle.write().await;
            session.ensure_live()?;
            match session.game.reset(player_id)? {
                ResetResult::Restarted => Some((session.snapshot(), session.member_ids())),
                ResetResult::Replaced => None,
            }
        };

        if let Some((snapshot, members)) = restarted {
            tracing::info!(player_id = %player_id, game_id = %game_id, "Game reset");
            self.broadcast(&members, &ServerMessage::GameReset { game: snapshot });
            return Ok(());
        }

        tracing::info!(player_id = %player_id, game_id = %game_id, "Opponent gone, replacing game");
        if self.current_game(player_id).as_deref() != Some(game_id) {
            // Requester already moved on; drop them from the old game as well.
            self.depart(player_id, game_id).await;
        }
        self.create_game(player_id).await
    }
}

fn move_made(game: shared::MatchSnapshot, record: MoveRecord) -> ServerMessage {
    ServerMessage::MoveMade {
        game,
        position: record.position,
        player: record.seat,
        mark: record.mark,
    }
}
