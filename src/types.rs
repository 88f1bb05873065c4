use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> i32 {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(4) as usize]
    }

    pub fn unit(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Clockwise quarter turns.
    pub fn rotate(self, quarter_turns: i32) -> Self {
        Self::from_index(self.index() + quarter_turns)
    }

    pub fn reverse(self) -> Self {
        self.rotate(2)
    }

    /// Direction of a single orthogonal step, if `from` and `to` are adjacent.
    pub fn between(from: Vec2, to: Vec2) -> Option<Self> {
        match (to.x - from.x, to.y - from.y) {
            (0, -1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, 1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "north" | "up" => Some(Self::North),
            "east" | "right" => Some(Self::East),
            "south" | "down" => Some(Self::South),
            "west" | "left" => Some(Self::West),
            _ => None,
        }
    }
}

/// Manual input expressed relative to where the camera looks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelativeInput {
    Forward,
    Right,
    Back,
    Left,
}

impl RelativeInput {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "forward" => Some(Self::Forward),
            "right" => Some(Self::Right),
            "back" => Some(Self::Back),
            "left" => Some(Self::Left),
            _ => None,
        }
    }

    pub fn resolve(self, camera_forward: Direction) -> Direction {
        let turns = match self {
            Self::Forward => 0,
            Self::Right => 1,
            Self::Back => 2,
            Self::Left => 3,
        };
        camera_forward.rotate(turns)
    }
}

/// Projects a camera forward vector on the ground plane onto its major axis.
/// `dz < 0` looks north because grid rows grow southwards.
pub fn camera_forward_direction(dx: f32, dz: f32) -> Direction {
    if dz.abs() > dx.abs() {
        if dz < 0.0 {
            Direction::North
        } else {
            Direction::South
        }
    } else if dx > 0.0 {
        Direction::East
    } else {
        Direction::West
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    #[default]
    Air,
    Wall,
    Robot,
    Mine,
    Person,
}

impl CellType {
    pub fn glyph(self) -> char {
        match self {
            Self::Air => '.',
            Self::Wall => '#',
            Self::Robot => 'R',
            Self::Mine => 'M',
            Self::Person => 'P',
        }
    }

    pub fn blocks_path(self) -> bool {
        matches!(self, Self::Wall | Self::Mine)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.unit();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Replaces the `(-1, -1)` "removed" marker with an explicit variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntityState {
    Active(Vec2),
    #[default]
    Inactive,
}

impl EntityState {
    pub fn position(self) -> Option<Vec2> {
        match self {
            Self::Active(pos) => Some(pos),
            Self::Inactive => None,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Menu,
    Playing,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    OutOfLives,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mover {
    Robot,
    Person,
    Mine,
}

impl Mover {
    pub fn cell_type(self) -> CellType {
        match self {
            Self::Robot => CellType::Robot,
            Self::Person => CellType::Person,
            Self::Mine => CellType::Mine,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RobotView {
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    #[serde(rename = "moveCooldown")]
    pub move_cooldown: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct EntityView {
    pub index: usize,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    LevelStarted {
        level: u32,
        #[serde(rename = "mineCount")]
        mine_count: usize,
        #[serde(rename = "peoplePlaced")]
        people_placed: usize,
    },
    PersonRescued {
        index: usize,
        x: i32,
        y: i32,
    },
    LifeLost {
        by: Mover,
        x: i32,
        y: i32,
        #[serde(rename = "livesRemaining")]
        lives_remaining: i32,
    },
    SpawnFailed {
        kind: Mover,
        index: usize,
    },
    GameOver {
        reason: GameOverReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub state: GameState,
    pub level: u32,
    #[serde(rename = "livesRemaining")]
    pub lives_remaining: i32,
    #[serde(rename = "peopleRemaining")]
    pub people_remaining: i32,
    #[serde(rename = "heuristicWeight")]
    pub heuristic_weight: f32,
    #[serde(rename = "aiEnabled")]
    pub ai_enabled: bool,
    pub paused: bool,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub width: i32,
    pub height: i32,
    /// One string per row (`y`), one glyph per column (`x`).
    pub tiles: Vec<String>,
    pub robot: RobotView,
    pub people: Vec<EntityView>,
    pub mines: Vec<EntityView>,
    pub path: Vec<Vec2>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub level: u32,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: u64,
    #[serde(rename = "peopleRescued")]
    pub people_rescued: u32,
    #[serde(rename = "livesRemaining")]
    pub lives_remaining: i32,
    pub reason: Option<GameOverReason>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub level: u32,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct LeaderboardResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<LeaderboardEntry>,
}
