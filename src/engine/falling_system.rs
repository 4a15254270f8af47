use super::board::{Board, Collectible, FallingBoard};
use super::GameEngine;
use crate::rng::RandomSource;
use crate::types::{CollectibleKind, Point, RuntimeEvent};

impl FallingBoard {
    pub fn spawn<R: RandomSource>(&mut self, rng: &mut R) -> Collectible {
        let kind = if rng.bool(self.settings.high_value_chance) {
            CollectibleKind::High
        } else {
            CollectibleKind::Low
        };
        let collectible = Collectible {
            id: self.next_id,
            kind,
            pos: Point::new(rng.range_f32(0.0, self.settings.board_size), 0.0),
        };
        self.next_id = self.next_id.saturating_add(1);
        self.collectibles.push(collectible);
        collectible
    }

    pub fn advance_collectibles(&mut self) {
        let speed = self.settings.fall_speed;
        for item in &mut self.collectibles {
            item.pos.y += speed;
        }
    }

    /// Removes and returns every collectible that fell past the play area.
    pub fn take_missed(&mut self) -> Vec<Collectible> {
        let bound = self.settings.miss_bound_y;
        let (missed, remaining): (Vec<Collectible>, Vec<Collectible>) = self
            .collectibles
            .drain(..)
            .partition(|item| item.pos.y > bound);
        self.collectibles = remaining;
        missed
    }
}

impl<R: RandomSource> GameEngine<R> {
    pub(super) fn on_spawn_tick(&mut self) {
        let Board::Falling(board) = &mut self.board else {
            return;
        };
        let spawned = board.spawn(&mut self.rng);
        self.events.push(RuntimeEvent::CollectibleSpawned {
            id: spawned.id,
            kind: spawned.kind,
        });
    }

    pub(super) fn on_physics_tick(&mut self) {
        let (consumption, missed) = {
            let Board::Falling(board) = &mut self.board else {
                return;
            };
            board.advance_collectibles();
            let consumption = board.apply_player_position(board.player);
            (consumption, board.take_missed())
        };

        self.record_consumption(&consumption);
        for item in &missed {
            self.events.push(RuntimeEvent::CollectibleMissed { id: item.id });
        }
        if !missed.is_empty() {
            self.stats.collectibles_missed = self
                .stats
                .collectibles_missed
                .saturating_add(missed.len() as u32);
            self.lose_lives(missed.len() as u32);
        }
    }
}
