use crate::config::{ConfigError, GameConfig};
use crate::constants::DOT_SCORE;
use crate::maze::Maze;
use crate::rng::{RandomSource, Rng};
use crate::types::{
    BoardInit, Direction, GameMode, GameOverReason, GameStatus, GameSummary, Outcome,
    PointerInput, Position, RuntimeEvent, Snapshot,
};

mod board;
mod falling_system;
mod ghost_system;
mod movement;
mod schedule;

pub use self::board::{Board, Collectible, Consumption, Dot, FallingBoard, Ghost, MazeBoard};
pub use self::schedule::TickKind;

use self::ghost_system::resolve_ghost_collision;
use self::movement::{cell_at_pixel, swipe_direction};
use self::schedule::TickSchedule;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GameEvent {
    Direction(Direction),
    Pointer(PointerInput),
    Tick(TickKind),
    Reset,
}

#[derive(Clone, Debug, Default)]
struct GameStats {
    dots_eaten: u32,
    collectibles_collected: u32,
    collectibles_missed: u32,
    lives_lost: u32,
}

#[derive(Clone, Debug)]
pub struct GameEngine<R: RandomSource = Rng> {
    config: GameConfig,
    board: Board,
    rng: R,

    score: u32,
    lives: u32,
    status: GameStatus,
    end_reason: Option<GameOverReason>,

    schedule: TickSchedule,
    events: Vec<RuntimeEvent>,
    stats: GameStats,
    elapsed_ms: u64,
    tick_counter: u64,
    round_started_at_ms: u64,
}

impl GameEngine<Rng> {
    pub fn new(config: GameConfig, seed: u32) -> Result<Self, ConfigError> {
        Self::with_rng(config, Rng::new(seed))
    }
}

impl<R: RandomSource> GameEngine<R> {
    pub fn with_rng(config: GameConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let board = match config.mode {
            GameMode::Maze | GameMode::MazeGhosts => {
                let maze = Maze::parse(config.layout.as_slice(), config.width, config.height)?;
                let ghost_starts = if config.mode.has_ghosts() {
                    config.ghost_starts.clone()
                } else {
                    Vec::new()
                };
                Board::Maze(MazeBoard::new(maze, ghost_starts, DOT_SCORE))
            }
            GameMode::Falling => Board::Falling(FallingBoard::new(config.falling.clone())),
        };
        let mut schedule = TickSchedule::default();
        schedule.arm(&config, 0);

        Ok(Self {
            lives: config.initial_lives,
            config,
            board,
            rng,
            score: 0,
            status: GameStatus::Playing,
            end_reason: None,
            schedule,
            events: Vec::new(),
            stats: GameStats::default(),
            elapsed_ms: 0,
            tick_counter: 0,
            round_started_at_ms: 0,
        })
    }

    // Everything but `Reset` is ignored once the game is over.
    pub fn apply(&mut self, event: GameEvent) {
        match event {
            GameEvent::Reset => self.reset(),
            _ if self.is_over() => {}
            GameEvent::Direction(dir) => self.move_player(dir),
            GameEvent::Pointer(input) => self.point_player(input),
            GameEvent::Tick(TickKind::Ghost) => self.on_ghost_tick(),
            GameEvent::Tick(TickKind::Spawn) => self.on_spawn_tick(),
            GameEvent::Tick(TickKind::Physics) => self.on_physics_tick(),
        }
    }

    pub fn on_direction(&mut self, dx: i32, dy: i32) {
        if let Some(dir) = Direction::from_delta(dx, dy) {
            self.apply(GameEvent::Direction(dir));
        }
    }

    pub fn on_pointer(&mut self, input: PointerInput) {
        self.apply(GameEvent::Pointer(input));
    }

    pub fn reset(&mut self) {
        self.board.reset();
        self.score = 0;
        self.lives = self.config.initial_lives;
        self.status = GameStatus::Playing;
        self.end_reason = None;
        self.stats = GameStats::default();
        self.round_started_at_ms = self.elapsed_ms;
        self.schedule.arm(&self.config, self.elapsed_ms);
        self.events.push(RuntimeEvent::Reset);
        log::debug!("game reset ({} mode)", self.config.mode.key());
    }

    pub fn advance(&mut self, dt_ms: u64) {
        if self.is_over() {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        while let Some(kind) = self.schedule.pop_due(self.elapsed_ms) {
            self.apply(GameEvent::Tick(kind));
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn mode(&self) -> GameMode {
        self.config.mode
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status == GameStatus::GameOver
    }

    pub fn end_reason(&self) -> Option<GameOverReason> {
        self.end_reason
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.is_over().then(|| self.outcome_for_score())
    }

    pub fn player_position(&self) -> Position {
        self.board.player_position()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn has_periodic_ticks(&self) -> bool {
        self.schedule.is_armed()
    }

    pub fn board_init(&self) -> BoardInit {
        let (width, height, tiles) = match &self.board {
            Board::Maze(board) => (
                board.maze().width(),
                board.maze().height(),
                board.maze().tiles(),
            ),
            Board::Falling(_) => (self.config.width, self.config.height, Vec::new()),
        };
        BoardInit {
            mode: self.config.mode,
            width,
            height,
            cell_size: self.config.cell_size,
            board_size: self.config.falling.board_size,
            tiles,
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            mode: self.config.mode,
            score: self.score,
            lives: self.lives,
            status: self.status,
            reason: self.end_reason,
            outcome: self.outcome(),
            player: self.board.player_position(),
            dots: self.board.live_dots(),
            collectibles: self.board.live_collectibles(),
            ghosts: self.board.ghost_views(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> Option<GameSummary> {
        let reason = self.end_reason?;
        Some(GameSummary {
            mode: self.config.mode,
            reason,
            outcome: self.outcome_for_score(),
            score: self.score,
            duration_ms: self.elapsed_ms.saturating_sub(self.round_started_at_ms),
            dots_eaten: self.stats.dots_eaten,
            collectibles_collected: self.stats.collectibles_collected,
            collectibles_missed: self.stats.collectibles_missed,
            lives_lost: self.stats.lives_lost,
        })
    }

    fn outcome_for_score(&self) -> Outcome {
        if self.score >= self.config.score_threshold {
            Outcome::Won
        } else {
            Outcome::Lost
        }
    }

    fn move_player(&mut self, dir: Direction) {
        let (dx, dy) = dir.delta();
        match &mut self.board {
            Board::Maze(board) => {
                let next = board.try_move(board.player, dx, dy);
                if next == board.player {
                    return;
                }
                board.player = next;
            }
            Board::Falling(board) => {
                let step = board.settings.key_step;
                board.player = board.try_move(board.player, dx as f32 * step, dy as f32 * step);
            }
        }
        self.settle_player();
    }

    fn point_player(&mut self, input: PointerInput) {
        if let PointerInput::Relative { dx, dy } = input {
            if matches!(self.board, Board::Maze(_)) {
                if let Some(dir) = swipe_direction(dx, dy, self.config.cell_size) {
                    self.move_player(dir);
                }
                return;
            }
        }

        let cell_size = self.config.cell_size;
        match &mut self.board {
            Board::Maze(board) => {
                let PointerInput::Absolute { x, y } = input else {
                    return;
                };
                let Some(cell) = cell_at_pixel(x, y, cell_size) else {
                    return;
                };
                if cell == board.player || !board.is_enterable(cell) {
                    return;
                }
                board.player = cell;
            }
            Board::Falling(board) => {
                let (dx, dy) = match input {
                    PointerInput::Absolute { x, y } => (x - board.player.x, y - board.player.y),
                    PointerInput::Relative { dx, dy } => (dx, dy),
                };
                board.player = board.try_move(board.player, dx, dy);
            }
        }
        self.settle_player();
    }

    // Consumption first, then the ghost check, both against the new position.
    fn settle_player(&mut self) {
        let (consumption, hit) = match &mut self.board {
            Board::Maze(board) => {
                let consumption = board.apply_player_position(board.player);
                (consumption, resolve_ghost_collision(board))
            }
            Board::Falling(board) => (board.apply_player_position(board.player), false),
        };

        self.record_consumption(&consumption);
        if consumption.all_consumed {
            self.finish(GameOverReason::Cleared);
        }
        if hit {
            self.lose_lives(1);
        }
    }

    fn record_consumption(&mut self, consumption: &Consumption) {
        if let Some(dot) = consumption.eaten_dot {
            self.stats.dots_eaten = self.stats.dots_eaten.saturating_add(1);
            self.events.push(RuntimeEvent::DotEaten { x: dot.x, y: dot.y });
        }
        for item in &consumption.collected {
            self.stats.collectibles_collected = self.stats.collectibles_collected.saturating_add(1);
            self.events.push(RuntimeEvent::CollectibleCollected {
                id: item.id,
                kind: item.kind,
            });
        }
        self.score = self.score.saturating_add(consumption.score_delta);
    }

    fn lose_lives(&mut self, count: u32) {
        let lost = count.min(self.lives);
        if lost == 0 {
            return;
        }
        self.lives -= lost;
        self.stats.lives_lost = self.stats.lives_lost.saturating_add(lost);
        self.events.push(RuntimeEvent::LifeLost { lives: self.lives });
        if self.lives == 0 {
            self.finish(GameOverReason::OutOfLives);
        }
    }

    fn finish(&mut self, reason: GameOverReason) {
        if self.is_over() {
            return;
        }
        self.status = GameStatus::GameOver;
        self.end_reason = Some(reason);
        self.schedule.disarm();
        let outcome = self.outcome_for_score();
        self.events.push(RuntimeEvent::GameOver { reason, outcome });
        log::info!(
            "game over: mode={} reason={:?} outcome={:?} score={}",
            self.config.mode.key(),
            reason,
            outcome,
            self.score
        );
    }
}
