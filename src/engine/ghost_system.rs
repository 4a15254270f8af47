use super::board::{Board, MazeBoard};
use super::GameEngine;
use crate::rng::RandomSource;
use crate::types::Vec2;

impl MazeBoard {
    /// Moves every ghost one step to a uniformly chosen legal neighbour.
    ///
    /// Targets are all computed from the positions at the start of the tick
    /// and applied afterwards. A ghost without legal neighbours stays put.
    pub fn step_ghosts<R: RandomSource>(&mut self, rng: &mut R) {
        let targets: Vec<Vec2> = self
            .ghosts
            .iter()
            .map(|ghost| {
                let options = self.legal_neighbors(ghost.pos);
                if options.is_empty() {
                    ghost.pos
                } else {
                    options[rng.pick_index(options.len())]
                }
            })
            .collect();
        for (ghost, target) in self.ghosts.iter_mut().zip(targets) {
            ghost.pos = target;
        }
    }
}

impl<R: RandomSource> GameEngine<R> {
    pub(super) fn on_ghost_tick(&mut self) {
        let hit = {
            let Board::Maze(board) = &mut self.board else {
                return;
            };
            board.step_ghosts(&mut self.rng);
            resolve_ghost_collision(board)
        };
        if hit {
            self.lose_lives(1);
        }
    }
}

/// Sends the player back to the start cell when a ghost shares its cell.
/// Ghosts keep their positions.
pub(super) fn resolve_ghost_collision(board: &mut MazeBoard) -> bool {
    if !board.ghost_at(board.player) {
        return false;
    }
    board.player = board.maze.start_position();
    true
}
