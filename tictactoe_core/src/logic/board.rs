use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: usize = 3;
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;
pub const CENTER: usize = 4;
pub const CORNERS: [usize; 4] = [0, 2, 6, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    /// Mark handed to the member sitting at `seat` (join order).
    #[must_use]
    pub const fn for_seat(seat: usize) -> Self {
        if seat == 0 {
            Self::X
        } else {
            Self::O
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::O => f.write_str("O"),
        }
    }
}

pub type Cell = Option<Mark>;

/// A 3x3 grid addressed by `row * 3 + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [None; CELL_COUNT],
        }
    }

    #[must_use]
    pub const fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    #[must_use]
    pub const fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    /// Returns `None` when `index` is off the board.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    #[must_use]
    pub fn is_empty_at(&self, index: usize) -> bool {
        matches!(self.get(index), Some(None))
    }

    /// Writes `mark` into an empty cell. Returns `false` and leaves the board
    /// untouched if the cell is occupied or off the board.
    pub fn place(&mut self, index: usize, mark: Mark) -> bool {
        match self.cells.get_mut(index) {
            Some(cell @ None) => {
                *cell = Some(mark);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(i, _)| i)
    }

    pub fn clear(&mut self) {
        self.cells = [None; CELL_COUNT];
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            match cell {
                Some(mark) => write!(f, "{mark}")?,
                None => f.write_str(".")?,
            }
            if i % BOARD_SIZE == BOARD_SIZE - 1 && i + 1 < CELL_COUNT {
                f.write_str("/")?;
            }
        }
        Ok(())
    }
}
