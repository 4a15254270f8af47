use crate::types::Vec2;

pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const SCORE_THRESHOLD: u32 = 2000;
pub const INITIAL_LIVES: u32 = 3;
pub const CELL_SIZE: u32 = 20;
pub const MAZE_WIDTH: i32 = 15;
pub const MAZE_HEIGHT: i32 = 15;
pub const GHOST_TICK_MS: u64 = 1000;
pub const DOT_SCORE: u32 = 10;

// Upper bounds accepted from external configuration.
pub const MAX_GRID_SIDE: i32 = 256;
pub const MAX_FRAME_MS: u64 = 10_000;

pub const INITIAL_GHOST_POSITIONS: [Vec2; 4] = [
    Vec2 { x: 1, y: 1 },
    Vec2 { x: 13, y: 1 },
    Vec2 { x: 1, y: 13 },
    Vec2 { x: 13, y: 13 },
];

pub const MAZE_LAYOUT: [&str; 15] = [
    "###############",
    "#P    #    # #",
    "# ### # ## # #",
    "#     #    # #",
    "# ### #### # #",
    "#          # #",
    "# ######## # #",
    "#            #",
    "# ######## # #",
    "#          # #",
    "# ### #### # #",
    "#     #    # #",
    "# ### # ## # #",
    "#            #",
    "###############",
];

pub const WALL_TILE: char = '#';
pub const OPEN_TILE: char = ' ';
pub const START_TILE: char = 'P';

// Falling-collectibles board, in frame pixels.
pub const BOARD_SIZE: f32 = (MAZE_WIDTH as u32 * CELL_SIZE) as f32;
pub const FALLING_PLAYER_START_X: f32 = BOARD_SIZE / 2.0;
pub const FALLING_PLAYER_START_Y: f32 = BOARD_SIZE - 30.0;
pub const FALLING_KEY_STEP: f32 = 20.0;
pub const PICKUP_RADIUS: f32 = 20.0;
pub const HIGH_VALUE_SCORE: u32 = 200;
pub const LOW_VALUE_SCORE: u32 = 100;
pub const HIGH_VALUE_CHANCE: f32 = 0.2;
pub const SPAWN_TICK_MS: u64 = 1000;
pub const PHYSICS_TICK_MS: u64 = 50;
pub const FALL_SPEED: f32 = 4.0;
pub const MISS_BOUND_Y: f32 = BOARD_SIZE;
