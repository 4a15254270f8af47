use thiserror::Error;

use crate::constants::{MAZE_HEIGHT, MAZE_LAYOUT, MAZE_WIDTH, OPEN_TILE, START_TILE, WALL_TILE};
use crate::types::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Open,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("maze layout has no rows")]
    EmptyLayout,
    #[error("maze layout has {rows} rows but the grid is only {height} high")]
    TooManyRows { rows: usize, height: i32 },
    #[error("row {y} is {len} tiles wide but the grid is only {width} wide")]
    RowTooWide { y: i32, len: usize, width: i32 },
    #[error("unknown tile {tile:?} at ({x}, {y})")]
    UnknownTile { x: i32, y: i32, tile: char },
}

#[derive(Clone, Debug)]
pub struct Maze {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    start: Vec2,
    dot_cells: Vec<Vec2>,
}

impl Maze {
    // Rows shorter than `width`, and rows missing below the layout, are
    // filled with walls. No start marker means (0, 0); with several markers
    // the last one wins and the others become ordinary dot cells.
    pub fn parse<S: AsRef<str>>(rows: &[S], width: i32, height: i32) -> Result<Self, MazeError> {
        let cell_count = if width > 0 && height > 0 {
            width.checked_mul(height)
        } else {
            None
        };
        let Some(cell_count) = cell_count else {
            return Err(MazeError::InvalidDimensions { width, height });
        };
        if rows.is_empty() {
            return Err(MazeError::EmptyLayout);
        }
        if rows.len() > height as usize {
            return Err(MazeError::TooManyRows {
                rows: rows.len(),
                height,
            });
        }

        let mut cells = vec![Cell::Wall; cell_count as usize];
        let mut open_cells = Vec::new();
        let mut starts = Vec::new();
        let mut ragged = false;

        for (y, row) in rows.iter().enumerate() {
            let y = y as i32;
            let row = row.as_ref();
            let len = row.chars().count();
            if len > width as usize {
                return Err(MazeError::RowTooWide { y, len, width });
            }
            ragged |= len < width as usize;

            for (x, tile) in row.chars().enumerate() {
                let x = x as i32;
                let cell = match tile {
                    WALL_TILE => Cell::Wall,
                    OPEN_TILE => Cell::Open,
                    START_TILE => {
                        starts.push(Vec2::new(x, y));
                        Cell::Open
                    }
                    _ => return Err(MazeError::UnknownTile { x, y, tile }),
                };
                if cell == Cell::Open {
                    open_cells.push(Vec2::new(x, y));
                }
                cells[(y * width + x) as usize] = cell;
            }
        }

        if ragged || rows.len() < height as usize {
            log::debug!("maze layout is narrower or shorter than {width}x{height}; padding with walls");
        }

        let start = match starts.as_slice() {
            [] => {
                log::warn!("maze layout has no start marker; defaulting start to (0, 0)");
                Vec2::new(0, 0)
            }
            [only] => *only,
            [.., last] => {
                log::warn!(
                    "maze layout has {} start markers; using the last one at ({}, {})",
                    starts.len(),
                    last.x,
                    last.y
                );
                *last
            }
        };
        let dot_cells = open_cells.into_iter().filter(|&cell| cell != start).collect();

        Ok(Self {
            width,
            height,
            cells,
            start,
            dot_cells,
        })
    }

    pub fn standard() -> Result<Self, MazeError> {
        Self::parse(&MAZE_LAYOUT, MAZE_WIDTH, MAZE_HEIGHT)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.cells.get((y * self.width + x) as usize).copied()
    }

    pub fn is_open(&self, x: i32, y: i32) -> bool {
        self.cell(x, y) == Some(Cell::Open)
    }

    pub fn start_position(&self) -> Vec2 {
        self.start
    }

    pub fn dot_cells(&self) -> &[Vec2] {
        &self.dot_cells
    }

    pub fn tiles(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| {
                        if Vec2::new(x, y) == self.start && self.is_open(x, y) {
                            START_TILE
                        } else if self.is_open(x, y) {
                            OPEN_TILE
                        } else {
                            WALL_TILE
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
