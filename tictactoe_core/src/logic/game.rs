use crate::logic::board::{Board, Mark, CELL_COUNT};
use crate::logic::rules::{evaluate, Outcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_MEMBERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("Game is full")]
    MatchFull,
    #[error("You are already in this game")]
    AlreadyMember,
    #[error("You are not in this game")]
    NotAMember,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Position {0} is off the board")]
    OutOfRange(i64),
    #[error("Position {0} already taken")]
    CellOccupied(usize),
    #[error("Game is over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub mark: Mark,
}

/// A move that was accepted and written to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub position: usize,
    pub seat: usize,
    pub mark: Mark,
}

/// What is left of a match after a member leaves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Nobody is left; the match should be deleted right away.
    Empty,
    /// One member is still there and must be told.
    Orphaned { remaining: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetResult {
    /// Board cleared in place, both members kept.
    Restarted,
    /// The match cannot be restarted; replace it with a new one.
    Replaced,
}

/// One two-player tic-tac-toe match.
///
/// Lifecycle: `Waiting` (one member) -> `Playing` (two members, alternating
/// turns) -> `Finished` (outcome set). `reset` is the only way back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    id: String,
    members: Vec<Member>,
    board: Board,
    turn: usize,
    phase: Phase,
    outcome: Option<Outcome>,
    departed: Option<Mark>,
}

impl Match {
    #[must_use]
    pub fn new(id: impl Into<String>, first_member: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            members: vec![Member {
                id: first_member.into(),
                mark: Mark::for_seat(0),
            }],
            board: Board::new(),
            turn: 0,
            phase: Phase::Waiting,
            outcome: None,
            departed: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.members.iter().map(|m| m.id.as_str())
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub const fn turn(&self) -> usize {
        self.turn
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    #[must_use]
    pub const fn departed(&self) -> Option<Mark> {
        self.departed
    }

    #[must_use]
    pub fn seat_of(&self, member_id: &str) -> Option<usize> {
        self.members.iter().position(|m| m.id == member_id)
    }

    /// Seat of a member that has not left the match.
    #[must_use]
    pub fn active_seat(&self, member_id: &str) -> Option<usize> {
        self.seat_of(member_id).filter(|&seat| {
            let mark = self.members.get(seat).map(|m| m.mark);
            mark.is_some() && mark != self.departed
        })
    }

    #[must_use]
    pub fn is_member(&self, member_id: &str) -> bool {
        self.seat_of(member_id).is_some()
    }

    #[must_use]
    pub fn mark_of(&self, member_id: &str) -> Option<Mark> {
        self.members
            .iter()
            .find(|m| m.id == member_id)
            .map(|m| m.mark)
    }

    /// Member whose move is accepted next.
    #[must_use]
    pub fn current_member(&self) -> Option<&Member> {
        self.members.get(self.turn)
    }

    pub fn join(&mut self, member_id: impl Into<String>) -> Result<(), MatchError> {
        let member_id = member_id.into();
        if self.is_member(&member_id) {
            return Err(MatchError::AlreadyMember);
        }
        if self.members.len() >= MAX_MEMBERS {
            return Err(MatchError::MatchFull);
        }

        let seat = self.members.len();
        self.members.push(Member {
            id: member_id,
            mark: Mark::for_seat(seat),
        });
        if self.members.len() == MAX_MEMBERS {
            self.phase = Phase::Playing;
        }
        Ok(())
    }

    /// Validates and applies a move. On error the match is left untouched.
    pub fn apply_move(&mut self, member_id: &str, position: i64) -> Result<MoveRecord, MatchError> {
        let seat = self.active_seat(member_id).ok_or(MatchError::NotAMember)?;

        if self.phase == Phase::Finished || self.departed.is_some() {
            return Err(MatchError::GameOver);
        }
        if self.phase != Phase::Playing || seat != self.turn {
            return Err(MatchError::NotYourTurn);
        }

        let position = usize::try_from(position)
            .ok()
            .filter(|p| *p < CELL_COUNT)
            .ok_or(MatchError::OutOfRange(position))?;

        let mark = self
            .members
            .get(seat)
            .map(|m| m.mark)
            .ok_or(MatchError::NotAMember)?;
        if !self.board.place(position, mark) {
            return Err(MatchError::CellOccupied(position));
        }

        self.turn = 1 - self.turn;
        if let Some(outcome) = evaluate(&self.board) {
            self.phase = Phase::Finished;
            self.outcome = Some(outcome);
        }

        Ok(MoveRecord {
            position,
            seat,
            mark,
        })
    }

    /// Takes a member out of play. Seats are never reordered: in a
    /// two-member match the leaver keeps their seat and the match is flagged
    /// as departed instead.
    pub fn remove_member(&mut self, member_id: &str) -> Result<Departure, MatchError> {
        let seat = self.active_seat(member_id).ok_or(MatchError::NotAMember)?;

        if self.members.len() < MAX_MEMBERS {
            return Ok(Departure::Empty);
        }

        let Some(leaver) = self.members.get(seat).map(|m| m.mark) else {
            return Err(MatchError::NotAMember);
        };
        if self.departed.is_some() {
            return Ok(Departure::Empty);
        }
        self.departed = Some(leaver);

        let remaining = self
            .members
            .iter()
            .find(|m| m.mark != leaver)
            .map(|m| m.id.clone())
            .ok_or(MatchError::NotAMember)?;
        Ok(Departure::Orphaned { remaining })
    }

    /// Starts the game over for the same two members, if both are still here.
    pub fn reset(&mut self, member_id: &str) -> Result<ResetResult, MatchError> {
        if self.active_seat(member_id).is_none() {
            return Err(MatchError::NotAMember);
        }
        if self.members.len() < MAX_MEMBERS || self.departed.is_some() {
            return Ok(ResetResult::Replaced);
        }

        self.board.clear();
        self.turn = 0;
        self.phase = Phase::Playing;
        self.outcome = None;
        Ok(ResetResult::Restarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> Match {
        let mut game = Match::new("ABC123", "alice");
        game.join("bob").unwrap();
        game
    }

    #[test]
    fn new_match_waits_for_opponent() {
        let game = Match::new("ABC123", "alice");
        assert_eq!(game.phase(), Phase::Waiting);
        assert_eq!(game.members().len(), 1);
        assert_eq!(game.mark_of("alice"), Some(Mark::X));
        assert_eq!(game.turn(), 0);
        assert_eq!(game.outcome(), None);
    }

    #[test]
    fn second_join_starts_game() {
        let game = playing();
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.mark_of("bob"), Some(Mark::O));
        assert_eq!(game.current_member().map(|m| m.id.as_str()), Some("alice"));
    }

    #[test]
    fn third_join_is_rejected() {
        let mut game = playing();
        let before = game.clone();
        assert_eq!(game.join("carol"), Err(MatchError::MatchFull));
        assert_eq!(game, before);
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mut game = Match::new("ABC123", "alice");
        assert_eq!(game.join("alice"), Err(MatchError::AlreadyMember));
        assert_eq!(game.members().len(), 1);
        assert_eq!(game.phase(), Phase::Waiting);
    }

    #[test]
    fn cannot_move_before_opponent_joins() {
        let mut game = Match::new("ABC123", "alice");
        assert_eq!(game.apply_move("alice", 4), Err(MatchError::NotYourTurn));
    }

    #[test]
    fn turn_alternates_and_rejects_out_of_turn() {
        let mut game = playing();
        let record = game.apply_move("alice", 4).unwrap();
        assert_eq!(record.mark, Mark::X);
        assert_eq!(record.seat, 0);
        assert_eq!(game.turn(), 1);

        let before = game.clone();
        assert_eq!(game.apply_move("alice", 0), Err(MatchError::NotYourTurn));
        assert_eq!(game, before);

        game.apply_move("bob", 0).unwrap();
        assert_eq!(game.turn(), 0);
    }

    #[test]
    fn invalid_positions_leave_state_unchanged() {
        let mut game = playing();
        game.apply_move("alice", 4).unwrap();
        let before = game.clone();

        assert_eq!(game.apply_move("bob", 9), Err(MatchError::OutOfRange(9)));
        assert_eq!(game.apply_move("bob", -1), Err(MatchError::OutOfRange(-1)));
        assert_eq!(game.apply_move("bob", 4), Err(MatchError::CellOccupied(4)));
        assert_eq!(game.apply_move("carol", 0), Err(MatchError::NotAMember));
        assert_eq!(game, before);
    }

    #[test]
    fn left_column_wins_for_first_member() {
        let mut game = playing();
        for (member, pos) in [("alice", 0), ("bob", 1), ("alice", 3), ("bob", 2)] {
            game.apply_move(member, pos).unwrap();
            assert_eq!(game.phase(), Phase::Playing);
        }
        game.apply_move("alice", 6).unwrap();
        assert_eq!(game.phase(), Phase::Finished);
        assert_eq!(game.outcome(), Some(Outcome::Win(Mark::X)));
        assert_eq!(game.apply_move("bob", 8), Err(MatchError::GameOver));
    }

    #[test]
    fn full_board_without_line_is_draw() {
        let mut game = playing();
        // X O X / X O O / O X X
        let moves = [0, 1, 2, 4, 3, 5, 7, 6, 8];
        for (i, pos) in moves.into_iter().enumerate() {
            let member = if i % 2 == 0 { "alice" } else { "bob" };
            game.apply_move(member, pos).unwrap();
        }
        assert_eq!(game.phase(), Phase::Finished);
        assert_eq!(game.outcome(), Some(Outcome::Draw));
        assert_eq!(game.apply_move("bob", 0), Err(MatchError::GameOver));
        assert_eq!(game.apply_move("alice", 0), Err(MatchError::GameOver));
    }

    #[test]
    fn sole_member_leaving_empties_match() {
        let mut game = Match::new("ABC123", "alice");
        assert_eq!(game.remove_member("alice"), Ok(Departure::Empty));
    }

    #[test]
    fn leaving_two_member_match_orphans_it() {
        let mut game = playing();
        game.apply_move("alice", 0).unwrap();
        assert_eq!(
            game.remove_member("alice"),
            Ok(Departure::Orphaned {
                remaining: "bob".to_string()
            })
        );
        assert_eq!(game.departed(), Some(Mark::X));
        assert_eq!(game.mark_of("bob"), Some(Mark::O));
        assert_eq!(game.apply_move("bob", 4), Err(MatchError::GameOver));
        assert_eq!(game.apply_move("alice", 4), Err(MatchError::NotAMember));
        assert_eq!(game.remove_member("alice"), Err(MatchError::NotAMember));
        assert_eq!(game.remove_member("bob"), Ok(Departure::Empty));
    }

    #[test]
    fn reset_restarts_with_both_members() {
        let mut game = playing();
        game.apply_move("alice", 0).unwrap();
        game.apply_move("bob", 4).unwrap();
        assert_eq!(game.reset("bob"), Ok(ResetResult::Restarted));
        assert_eq!(game.board(), &Board::new());
        assert_eq!(game.turn(), 0);
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.mark_of("alice"), Some(Mark::X));
        assert_eq!(game.id(), "ABC123");
    }

    #[test]
    fn reset_without_opponent_requests_replacement() {
        let mut waiting = Match::new("ABC123", "alice");
        assert_eq!(waiting.reset("alice"), Ok(ResetResult::Replaced));

        let mut orphaned = playing();
        orphaned.remove_member("bob").unwrap();
        assert_eq!(orphaned.reset("alice"), Ok(ResetResult::Replaced));
        assert_eq!(orphaned.reset("carol"), Err(MatchError::NotAMember));
    }
}
