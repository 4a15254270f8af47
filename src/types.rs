use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Only the four axis-aligned unit vectors map to a direction.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Free-roam coordinate in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Position {
    Cell(Vec2),
    Free(Point),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    Absolute { x: f32, y: f32 },
    Relative { dx: f32, dy: f32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Maze,
    #[default]
    MazeGhosts,
    Falling,
}

impl GameMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "maze" => Some(Self::Maze),
            "maze_ghosts" | "ghosts" => Some(Self::MazeGhosts),
            "falling" => Some(Self::Falling),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Maze => "maze",
            Self::MazeGhosts => "maze_ghosts",
            Self::Falling => "falling",
        }
    }

    pub fn has_ghosts(self) -> bool {
        self == Self::MazeGhosts
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Playing,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Cleared,
    OutOfLives,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectibleKind {
    High,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CollectibleView {
    pub id: u64,
    pub kind: CollectibleKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GhostView {
    pub id: usize,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    DotEaten {
        x: i32,
        y: i32,
    },
    CollectibleSpawned {
        id: u64,
        kind: CollectibleKind,
    },
    CollectibleCollected {
        id: u64,
        kind: CollectibleKind,
    },
    CollectibleMissed {
        id: u64,
    },
    LifeLost {
        lives: u32,
    },
    GameOver {
        reason: GameOverReason,
        outcome: Outcome,
    },
    Reset,
}

#[derive(Clone, Debug, Serialize)]
pub struct BoardInit {
    pub mode: GameMode,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "cellSize")]
    pub cell_size: u32,
    #[serde(rename = "boardSize")]
    pub board_size: f32,
    pub tiles: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub mode: GameMode,
    pub score: u32,
    pub lives: u32,
    pub status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<GameOverReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub player: Position,
    pub dots: Vec<Vec2>,
    pub collectibles: Vec<CollectibleView>,
    pub ghosts: Vec<GhostView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub mode: GameMode,
    pub reason: GameOverReason,
    pub outcome: Outcome,
    pub score: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(rename = "dotsEaten")]
    pub dots_eaten: u32,
    #[serde(rename = "collectiblesCollected")]
    pub collectibles_collected: u32,
    #[serde(rename = "collectiblesMissed")]
    pub collectibles_missed: u32,
    #[serde(rename = "livesLost")]
    pub lives_lost: u32,
}
