use crate::logic::board::{Board, Mark};

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win(Mark),
    Draw,
}

/// Rows, then columns, then the two diagonals.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Mark occupying all three cells of `line`, if any.
#[must_use]
pub fn line_owner(board: &Board, line: [usize; 3]) -> Option<Mark> {
    let [a, b, c] = line;
    let first = board.get(a).flatten()?;
    if board.get(b).flatten() == Some(first) && board.get(c).flatten() == Some(first) {
        Some(first)
    } else {
        None
    }
}

/// Evaluates a board snapshot.
///
/// Returns the mark of the first complete line in scan order, `Draw` when the
/// board is full without a line, and `None` while the game can continue.
#[must_use]
pub fn evaluate(board: &Board) -> Option<Outcome> {
    if let Some(mark) = LINES.iter().find_map(|line| line_owner(board, *line)) {
        return Some(Outcome::Win(mark));
    }

    if board.is_full() {
        Some(Outcome::Draw)
    } else {
        None
    }
}

/// Empty cell that would complete a line for `mark`, scanning cells in order.
#[must_use]
pub fn winning_cell(board: &Board, mark: Mark) -> Option<usize> {
    board.empty_cells().find(|&idx| {
        let mut probe = *board;
        probe.place(idx, mark);
        evaluate(&probe) == Some(Outcome::Win(mark))
    })
}
