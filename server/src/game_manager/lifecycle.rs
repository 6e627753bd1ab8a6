use crate::{
    error::SessionError,
    game_manager::{session::Player, AppState, GameSession, SessionHandle, Tx},
};
use shared::ServerMessage;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tictactoe_core::logic::game::{Departure, MatchError};
use tokio::{sync::RwLock, task::JoinHandle, time::Instant};

impl AppState {
    /// Registers a new connection and tells it who it is.
    pub fn add_player(&self, id: String, tx: Tx) {
        tracing::info!(player_id = %id, "Player connected");
        let welcome = ServerMessage::Connected {
            player_id: id.clone(),
        };
        if tx.send(welcome).is_err() {
            tracing::debug!(player_id = %id, "Connection closed before welcome");
        }
        self.players.insert(
            id,
            Player {
                tx,
                last_msg_at: None,
            },
        );
    }

    pub async fn remove_player(self: &Arc<Self>, id: &str) {
        tracing::info!(player_id = %id, "Player disconnected");
        self.players.remove(id);

        if let Some((_, game_id)) = self.player_to_game.remove(id) {
            self.depart(id, &game_id).await;
        }
    }

    pub async fn leave_game(self: &Arc<Self>, player_id: &str) -> Result<(), SessionError> {
        let Some((_, game_id)) = self.player_to_game.remove(player_id) else {
            return Err(MatchError::NotAMember.into());
        };
        tracing::info!(player_id = %player_id, game_id = %game_id, "Player leaving current game");
        self.depart(player_id, &game_id).await;
        self.send_to(player_id, ServerMessage::LeftGame { game_id });
        Ok(())
    }

    /// Takes `player_id` out of `game_id`. A game left with nobody (or only
    /// the bot) is deleted at once; a game left with one player is kept
    /// for the grace period and that player is told.
    pub(crate) async fn depart(self: &Arc<Self>, player_id: &str, game_id: &str) {
        self.player_to_game
            .remove_if(player_id, |_, current| current == game_id);

        let Ok(handle) = self.game_handle(game_id) else {
            return;
        };

        let mut session = handle.write().await;
        if session.removed {
            return;
        }
        match session.game.remove_member(player_id) {
            Ok(Departure::Orphaned { remaining }) if !session.practice => {
                let grace = self.settings.disconnect_grace;
                let task = self.schedule_eviction(game_id, &handle, grace);
                if let Some(old) = session.eviction.replace(task) {
                    old.abort();
                }
                drop(session);

                tracing::info!(game_id = %game_id, disconnected_player = %player_id, opponent_id = %remaining, "Notifying opponent of departure");
                self.send_to(
                    &remaining,
                    ServerMessage::PlayerDisconnected {
                        game_id: game_id.to_string(),
                    },
                );
            }
            Ok(_) => {
                tracing::info!(game_id = %game_id, "Game empty, removing");
                self.retire(game_id, &handle, &mut session);
            }
            Err(err) => {
                tracing::debug!(player_id = %player_id, game_id = %game_id, error = %err, "Nothing to leave");
            }
        }
    }

    /// Deletes the game after `delay` unless it is gone or replaced by then.
    fn schedule_eviction(
        self: &Arc<Self>,
        game_id: &str,
        handle: &SessionHandle,
        delay: Duration,
    ) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let game_id = game_id.to_string();
        let target: Weak<RwLock<GameSession>> = Arc::downgrade(handle);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(handle) = target.upgrade() else {
                return;
            };

            let members = {
                let mut session = handle.write().await;
                // Detach ourselves so retiring does not abort this task.
                drop(session.eviction.take());
                state.retire(&game_id, &handle, &mut session)
            };
            if let Some(members) = members {
                tracing::info!(game_id = %game_id, "Evicted abandoned game");
                state.broadcast(&members, &ServerMessage::GameExpired { game_id });
            }
        })
    }

    /// Removes `game_id` if it still maps to `handle`. Returns the members
    /// of the removed game, or `None` if another path got there first.
    pub async fn remove_session(
        &self,
        game_id: &str,
        handle: &SessionHandle,
    ) -> Option<Vec<String>> {
        let mut session = handle.write().await;
        self.retire(game_id, handle, &mut session)
    }

    /// Unregisters a game while its write guard is held, so no handler that
    /// queued on the lock can touch it afterwards.
    fn retire(
        &self,
        game_id: &str,
        handle: &SessionHandle,
        session: &mut GameSession,
    ) -> Option<Vec<String>> {
        if session.removed {
            return None;
        }
        self.games
            .remove_if(game_id, |_, current| Arc::ptr_eq(current, handle))?;
        session.removed = true;
        if let Some(task) = session.eviction.take() {
            task.abort();
        }
        let members = session.member_ids();
        for member in &members {
            self.player_to_game
                .remove_if(member, |_, current| current == game_id);
        }
        Some(members)
    }

    /// Deletes every game created more than `max_age` before `now`.
    pub async fn sweep_expired(&self, now: Instant, max_age: Duration) -> Vec<String> {
        let handles: Vec<(String, SessionHandle)> = self
            .games
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut removed = Vec::new();
        for (game_id, handle) in handles {
            let created_at = handle.read().await.created_at;
            if now.saturating_duration_since(created_at) <= max_age {
                continue;
            }
            if let Some(members) = self.remove_session(&game_id, &handle).await {
                tracing::info!(game_id = %game_id, "Cleaning up expired game");
                self.broadcast(
                    &members,
                    &ServerMessage::GameExpired {
                        game_id: game_id.clone(),
                    },
                );
                removed.push(game_id);
            }
        }
        removed
    }

    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.settings.sweep_interval;
        let max_age = self.settings.max_game_age;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = self.sweep_expired(Instant::now(), max_age).await;
                tracing::debug!(
                    removed = removed.len(),
                    games = self.game_count(),
                    players = self.player_count(),
                    "Sweep finished"
                );
            }
        })
    }
}
