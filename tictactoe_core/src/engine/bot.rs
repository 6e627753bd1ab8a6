use crate::logic::board::{Board, Mark, CENTER, CORNERS};
use crate::logic::rules::winning_cell;

/// Picks the practice bot's next cell.
///
/// Priority: complete our own line, block the opponent's line, take the
/// centre, take the first free corner (0, 2, 6, 8), take the first free cell.
/// Returns `None` only on a full board.
#[must_use]
pub fn choose_move(board: &Board, mark: Mark) -> Option<usize> {
    winning_cell(board, mark)
        .or_else(|| winning_cell(board, mark.opposite()))
        .or_else(|| board.is_empty_at(CENTER).then_some(CENTER))
        .or_else(|| CORNERS.into_iter().find(|&c| board.is_empty_at(c)))
        .or_else(|| board.empty_cells().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(xs: &[usize], os: &[usize]) -> Board {
        let mut board = Board::new();
        for &i in xs {
            board.place(i, Mark::X);
        }
        for &i in os {
            board.place(i, Mark::O);
        }
        board
    }

    #[test]
    fn prefers_own_win_over_block() {
        // O can win at 5, X threatens 2.
        let board = with(&[0, 1, 8], &[3, 4]);
        assert_eq!(choose_move(&board, Mark::O), Some(5));
    }

    #[test]
    fn blocks_opponent_line() {
        let board = with(&[0, 1], &[4]);
        assert_eq!(choose_move(&board, Mark::O), Some(2));
    }

    #[test]
    fn takes_centre_then_corner() {
        assert_eq!(choose_move(&Board::new(), Mark::X), Some(4));
        assert_eq!(choose_move(&with(&[4], &[]), Mark::O), Some(0));
        assert_eq!(choose_move(&with(&[4, 0], &[8]), Mark::O), Some(2));
    }

    #[test]
    fn falls_back_to_any_free_cell() {
        // X O X / O X . / O X O  -> only 5 left, no line available for O.
        let board = with(&[0, 2, 4, 7], &[1, 3, 6, 8]);
        assert_eq!(choose_move(&board, Mark::O), Some(5));
    }

    #[test]
    fn full_board_has_no_move() {
        let board = with(&[0, 2, 3, 7, 8], &[1, 4, 5, 6]);
        assert_eq!(choose_move(&board, Mark::X), None);
    }
}
