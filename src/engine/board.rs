use std::collections::BTreeMap;

use crate::config::FallingConfig;
use crate::maze::Maze;
use crate::types::{CollectibleKind, CollectibleView, GhostView, Point, Position, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dot {
    pub pos: Vec2,
    pub consumed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ghost {
    pub id: usize,
    pub pos: Vec2,
}

impl Ghost {
    pub fn view(&self) -> GhostView {
        GhostView {
            id: self.id,
            x: self.pos.x,
            y: self.pos.y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collectible {
    pub id: u64,
    pub kind: CollectibleKind,
    pub pos: Point,
}

impl Collectible {
    pub fn view(&self) -> CollectibleView {
        CollectibleView {
            id: self.id,
            kind: self.kind,
            x: self.pos.x,
            y: self.pos.y,
        }
    }
}

/// Result of settling the player on a position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Consumption {
    pub score_delta: u32,
    pub all_consumed: bool,
    pub eaten_dot: Option<Vec2>,
    pub collected: Vec<Collectible>,
}

#[derive(Clone, Debug)]
pub struct MazeBoard {
    pub(crate) maze: Maze,
    pub(crate) player: Vec2,
    pub(crate) dots: Vec<Dot>,
    pub(crate) dot_index: BTreeMap<Vec2, usize>,
    pub(crate) ghosts: Vec<Ghost>,
    ghost_starts: Vec<Vec2>,
    dot_score: u32,
}

impl MazeBoard {
    pub fn new(maze: Maze, ghost_starts: Vec<Vec2>, dot_score: u32) -> Self {
        let mut board = Self {
            player: maze.start_position(),
            maze,
            dots: Vec::new(),
            dot_index: BTreeMap::new(),
            ghosts: Vec::new(),
            ghost_starts,
            dot_score,
        };
        board.reset();
        board
    }

    /// Replaces the player, dots and ghosts with their level-load state.
    pub fn reset(&mut self) {
        self.player = self.maze.start_position();
        self.dots = self
            .maze
            .dot_cells()
            .iter()
            .map(|&pos| Dot {
                pos,
                consumed: false,
            })
            .collect();
        self.dot_index = self
            .dots
            .iter()
            .enumerate()
            .map(|(idx, dot)| (dot.pos, idx))
            .collect();
        self.ghosts = self
            .ghost_starts
            .iter()
            .enumerate()
            .map(|(id, &pos)| Ghost { id, pos })
            .collect();
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn player(&self) -> Vec2 {
        self.player
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn has_uneaten_dot(&self, pos: Vec2) -> bool {
        self.dot_index
            .get(&pos)
            .and_then(|&idx| self.dots.get(idx))
            .map(|dot| !dot.consumed)
            .unwrap_or(false)
    }

    pub fn remaining_dots(&self) -> usize {
        self.dots.iter().filter(|dot| !dot.consumed).count()
    }

    pub fn ghost_at(&self, pos: Vec2) -> bool {
        self.ghosts.iter().any(|ghost| ghost.pos == pos)
    }

    pub fn apply_player_position(&mut self, pos: Vec2) -> Consumption {
        let mut consumption = Consumption::default();
        if let Some(dot) = self
            .dot_index
            .get(&pos)
            .and_then(|&idx| self.dots.get_mut(idx))
        {
            if !dot.consumed {
                dot.consumed = true;
                consumption.score_delta = self.dot_score;
                consumption.eaten_dot = Some(pos);
            }
        }
        consumption.all_consumed = self.dots.iter().all(|dot| dot.consumed);
        consumption
    }
}

#[derive(Clone, Debug)]
pub struct FallingBoard {
    pub(crate) settings: FallingConfig,
    pub(crate) player: Point,
    pub(crate) collectibles: Vec<Collectible>,
    pub(crate) next_id: u64,
}

impl FallingBoard {
    pub fn new(settings: FallingConfig) -> Self {
        Self {
            player: settings.player_start,
            settings,
            collectibles: Vec::new(),
            next_id: 1,
        }
    }

    /// Ids keep counting across resets so no two collectibles ever share one.
    pub fn reset(&mut self) {
        self.player = self.settings.player_start;
        self.collectibles.clear();
    }

    pub fn player(&self) -> Point {
        self.player
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn apply_player_position(&mut self, pos: Point) -> Consumption {
        let radius = self.settings.pickup_radius;
        let (collected, remaining): (Vec<Collectible>, Vec<Collectible>) = self
            .collectibles
            .drain(..)
            .partition(|item| (item.pos.x - pos.x).abs() < radius && (item.pos.y - pos.y).abs() < radius);
        self.collectibles = remaining;

        let score_delta = collected
            .iter()
            .map(|item| match item.kind {
                CollectibleKind::High => self.settings.high_value_score,
                CollectibleKind::Low => self.settings.low_value_score,
            })
            .fold(0u32, u32::saturating_add);
        Consumption {
            score_delta,
            all_consumed: false,
            eaten_dot: None,
            collected,
        }
    }
}

/// Mode-specific state; supplies the movement and consumption rules.
#[derive(Clone, Debug)]
pub enum Board {
    Maze(MazeBoard),
    Falling(FallingBoard),
}

impl Board {
    pub fn reset(&mut self) {
        match self {
            Board::Maze(board) => board.reset(),
            Board::Falling(board) => board.reset(),
        }
    }

    pub fn player_position(&self) -> Position {
        match self {
            Board::Maze(board) => Position::Cell(board.player),
            Board::Falling(board) => Position::Free(board.player),
        }
    }

    pub fn live_dots(&self) -> Vec<Vec2> {
        match self {
            Board::Maze(board) => board
                .dots
                .iter()
                .filter(|dot| !dot.consumed)
                .map(|dot| dot.pos)
                .collect(),
            Board::Falling(_) => Vec::new(),
        }
    }

    pub fn live_collectibles(&self) -> Vec<CollectibleView> {
        match self {
            Board::Maze(_) => Vec::new(),
            Board::Falling(board) => board.collectibles.iter().map(Collectible::view).collect(),
        }
    }

    pub fn ghost_views(&self) -> Vec<GhostView> {
        match self {
            Board::Maze(board) => board.ghosts.iter().map(Ghost::view).collect(),
            Board::Falling(_) => Vec::new(),
        }
    }
}
