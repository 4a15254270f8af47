use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BOARD_SIZE, CELL_SIZE, FALLING_KEY_STEP, FALLING_PLAYER_START_X, FALLING_PLAYER_START_Y,
    FALL_SPEED, GHOST_TICK_MS, HIGH_VALUE_CHANCE, HIGH_VALUE_SCORE, INITIAL_GHOST_POSITIONS,
    INITIAL_LIVES, LOW_VALUE_SCORE, MAX_FRAME_MS, MAX_GRID_SIDE, MAZE_HEIGHT, MAZE_LAYOUT,
    MAZE_WIDTH, MISS_BOUND_Y, PHYSICS_TICK_MS,
    PICKUP_RADIUS, SCORE_THRESHOLD, SPAWN_TICK_MS, TICK_MS,
};
use crate::maze::MazeError;
use crate::types::{GameMode, Point, Vec2};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Maze(#[from] MazeError),
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
    #[error("grid {width}x{height} exceeds the {max}x{max} limit")]
    GridTooLarge { width: i32, height: i32, max: i32 },
    #[error("frameMs {frame_ms} exceeds the {max}ms limit")]
    FrameTooLong { frame_ms: u64, max: u64 },
    #[error("ghost start ({x}, {y}) is outside the maze")]
    GhostOutOfBounds { x: i32, y: i32 },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FallingConfig {
    pub board_size: f32,
    pub player_start: Point,
    pub key_step: f32,
    pub pickup_radius: f32,
    pub high_value_score: u32,
    pub low_value_score: u32,
    pub high_value_chance: f32,
    pub spawn_tick_ms: u64,
    pub physics_tick_ms: u64,
    pub fall_speed: f32,
    pub miss_bound_y: f32,
}

impl Default for FallingConfig {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE,
            player_start: Point::new(FALLING_PLAYER_START_X, FALLING_PLAYER_START_Y),
            key_step: FALLING_KEY_STEP,
            pickup_radius: PICKUP_RADIUS,
            high_value_score: HIGH_VALUE_SCORE,
            low_value_score: LOW_VALUE_SCORE,
            high_value_chance: HIGH_VALUE_CHANCE,
            spawn_tick_ms: SPAWN_TICK_MS,
            physics_tick_ms: PHYSICS_TICK_MS,
            fall_speed: FALL_SPEED,
            miss_bound_y: MISS_BOUND_Y,
        }
    }
}

/// Static game configuration; the defaults reproduce the compiled-in constants.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub mode: GameMode,
    pub layout: Vec<String>,
    pub width: i32,
    pub height: i32,
    pub cell_size: u32,
    pub initial_lives: u32,
    pub score_threshold: u32,
    pub ghost_tick_ms: u64,
    pub ghost_starts: Vec<Vec2>,
    pub frame_ms: u64,
    pub falling: FallingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            layout: MAZE_LAYOUT.iter().map(|row| row.to_string()).collect(),
            width: MAZE_WIDTH,
            height: MAZE_HEIGHT,
            cell_size: CELL_SIZE,
            initial_lives: INITIAL_LIVES,
            score_threshold: SCORE_THRESHOLD,
            ghost_tick_ms: GHOST_TICK_MS,
            ghost_starts: INITIAL_GHOST_POSITIONS.to_vec(),
            frame_ms: TICK_MS,
            falling: FallingConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn for_mode(mode: GameMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_size == 0 {
            return Err(ConfigError::NonPositive { field: "cellSize" });
        }
        if self.initial_lives == 0 {
            return Err(ConfigError::NonPositive {
                field: "initialLives",
            });
        }
        if self.frame_ms == 0 {
            return Err(ConfigError::NonPositive { field: "frameMs" });
        }
        if self.frame_ms > MAX_FRAME_MS {
            return Err(ConfigError::FrameTooLong {
                frame_ms: self.frame_ms,
                max: MAX_FRAME_MS,
            });
        }
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return Err(ConfigError::GridTooLarge {
                width: self.width,
                height: self.height,
                max: MAX_GRID_SIDE,
            });
        }
        if self.mode.has_ghosts() && self.ghost_tick_ms == 0 {
            return Err(ConfigError::NonPositive {
                field: "ghostTickMs",
            });
        }
        if self.mode == GameMode::Falling {
            if self.falling.spawn_tick_ms == 0 {
                return Err(ConfigError::NonPositive {
                    field: "falling.spawnTickMs",
                });
            }
            if self.falling.physics_tick_ms == 0 {
                return Err(ConfigError::NonPositive {
                    field: "falling.physicsTickMs",
                });
            }
            if self.falling.board_size.is_nan() || self.falling.board_size <= 0.0 {
                return Err(ConfigError::NonPositive {
                    field: "falling.boardSize",
                });
            }
        }
        for ghost in &self.ghost_starts {
            if ghost.x < 0 || ghost.y < 0 || ghost.x >= self.width || ghost.y >= self.height {
                return Err(ConfigError::GhostOutOfBounds {
                    x: ghost.x,
                    y: ghost.y,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = GameConfig::default();
        assert_eq!(config.mode, GameMode::MazeGhosts);
        assert_eq!(config.layout.len(), 15);
        assert_eq!(config.initial_lives, 3);
        assert_eq!(config.score_threshold, 2000);
        assert_eq!(config.ghost_tick_ms, 1000);
        assert_eq!(config.ghost_starts.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_merge_with_defaults() {
        let config = GameConfig::from_json_str(
            r#"{"mode":"falling","initialLives":5,"falling":{"fallSpeed":8.0}}"#,
        )
        .expect("config parses");
        assert_eq!(config.mode, GameMode::Falling);
        assert_eq!(config.initial_lives, 5);
        assert_eq!(config.falling.fall_speed, 8.0);
        assert_eq!(config.falling.pickup_radius, PICKUP_RADIUS);
        assert_eq!(config.score_threshold, SCORE_THRESHOLD);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = GameConfig::from_json_str(r#"{"initialLives":0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonPositive {
                field: "initialLives"
            }
        ));

        let err = GameConfig::from_json_str(r#"{"ghostStarts":[{"x":40,"y":1}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::GhostOutOfBounds { x: 40, y: 1 }));

        let err = GameConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn oversized_values_are_rejected() {
        let err = GameConfig::from_json_str(r#"{"width":50000,"height":50000}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::GridTooLarge {
                width: 50_000,
                height: 50_000,
                ..
            }
        ));

        let err = GameConfig::from_json_str(r#"{"frameMs":18446744073709551615}"#).unwrap_err();
        assert!(matches!(err, ConfigError::FrameTooLong { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let target = std::env::temp_dir()
            .join("pacman-frame-missing-config")
            .join("config.json");
        assert!(matches!(GameConfig::load(&target), Err(ConfigError::Io(_))));
    }
}
