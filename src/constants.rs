pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const GRID_WIDTH: i32 = 30;
pub const GRID_HEIGHT: i32 = 30;

pub const MAX_LIVES: i32 = 5;
pub const NUM_PEOPLE: usize = 5;

pub const MINES_PER_LEVEL: usize = 5;
pub const MAX_MINES: usize = 50;
pub const SPAWN_ATTEMPTS: u32 = 10;

pub const INITIAL_MOVE_COOLDOWN: u32 = 20;

pub const PEOPLE_MAX_MOVES_PER_SEC: f32 = 3.0;
pub const MINES_MAX_MOVES_PER_SEC: f32 = 5.0;
pub const MINE_TURN_PROBABILITY: f32 = 0.5;

pub const HAZARD_PENALTY: i32 = 20;
pub const DEFAULT_HEURISTIC_WEIGHT_HUNDREDTHS: u32 = 150;
pub const HEURISTIC_WEIGHT_STEP_HUNDREDTHS: u32 = 5;
pub const MAX_HEURISTIC_WEIGHT_HUNDREDTHS: u32 = 1_000;

pub const SAFETY_RADIUS: i32 = 4;

pub const MAX_PENDING_EVENTS: usize = 256;

pub fn mine_count_for_level(level: u32, per_level: usize, cap: usize) -> usize {
    (level as usize).saturating_mul(per_level).min(cap)
}

/// Level spawn point. The row/column swap mirrors how the grid was laid out
/// originally: `x = 3·height/4`, `y = width/4`.
pub fn spawn_point(width: i32, height: i32) -> (i32, i32) {
    (3 * height / 4, width / 4)
}
