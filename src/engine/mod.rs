use std::collections::TryReserveError;

use thiserror::Error;

use crate::config::SimulationConfig;
use crate::constants::{
    spawn_point, HEURISTIC_WEIGHT_STEP_HUNDREDTHS, MAX_HEURISTIC_WEIGHT_HUNDREDTHS,
    MAX_PENDING_EVENTS,
};
use crate::entity::{active_views, MovingEntity, Robot};
use crate::rng::Rng;
use crate::types::{
    CellType, Direction, GameOverReason, GameState, Mover, RelativeInput, RobotView, RuntimeEvent,
    SessionSummary, Snapshot, Vec2,
};
use crate::world::Grid;

mod movement;
mod navigation;
mod spawn_system;
mod survival;
mod utils;

pub use self::movement::{MoveOutcome, MoverRef};
pub use self::navigation::{select_target, Navigator, SearchParams};
pub use self::survival::{choose_survival_direction, local_safety_score, FallbackDecision};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("failed to allocate {count} mines: {source}")]
    MineAllocation {
        count: usize,
        #[source]
        source: TryReserveError,
    },
}

#[derive(Clone, Debug)]
pub struct Simulation {
    pub config: SimulationConfig,

    grid: Grid,
    robot: Robot,
    people: Vec<MovingEntity>,
    mines: Vec<MovingEntity>,
    rng: Rng,
    navigator: Navigator,
    path: Vec<Vec2>,
    // Drained by `build_snapshot(true)`; oldest entries drop past the cap.
    events: Vec<RuntimeEvent>,

    state: GameState,
    end_reason: Option<GameOverReason>,
    level: u32,
    lives_remaining: i32,
    people_remaining: i32,
    people_rescued: u32,
    heuristic_weight_hundredths: u32,
    ai_enabled: bool,
    paused: bool,
    boost: bool,

    frame_count: u64,
    tick_counter: u64,
    elapsed_ms: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        let mut rng = Rng::new(config.seed);
        let grid = Grid::with_plus_walls(config.width, config.height);
        let (sx, sy) = spawn_point(config.width, config.height);

        let people = (0..config.people_count)
            .map(|_| {
                let move_rate = config.people_max_moves_per_sec * rng.next_f32();
                let turn_rate = 0.5 * config.people_max_moves_per_sec * rng.next_f32();
                MovingEntity::inactive(
                    config.per_tick_probability(move_rate),
                    config.per_tick_probability(turn_rate),
                )
            })
            .collect();

        Self {
            grid,
            robot: Robot {
                pos: Vec2::new(sx, sy),
                dir: Direction::North,
                move_cooldown: config.initial_move_cooldown.max(1),
            },
            people,
            mines: Vec::new(),
            rng,
            navigator: Navigator::new(config.width, config.height),
            path: Vec::new(),
            events: Vec::new(),
            state: GameState::Menu,
            end_reason: None,
            level: 0,
            lives_remaining: config.max_lives,
            people_remaining: 0,
            people_rescued: 0,
            heuristic_weight_hundredths: config
                .heuristic_weight_hundredths
                .min(MAX_HEURISTIC_WEIGHT_HUNDREDTHS),
            ai_enabled: config.ai_enabled,
            paused: true,
            boost: false,
            frame_count: 0,
            tick_counter: 0,
            elapsed_ms: 0,
            config,
        }
    }

    pub fn start_game(&mut self) -> Result<(), SimulationError> {
        self.level = 0;
        self.lives_remaining = self.config.max_lives;
        self.people_rescued = 0;
        self.robot.move_cooldown = self.config.initial_move_cooldown.max(1);
        self.elapsed_ms = 0;
        self.frame_count = 0;
        self.end_reason = None;
        self.state = GameState::Playing;
        self.advance_level()
    }

    pub fn end_session(&mut self) {
        if self.state == GameState::Playing {
            self.finish(GameOverReason::Quit);
        }
    }

    pub fn return_to_menu(&mut self) {
        if self.state == GameState::GameOver {
            self.state = GameState::Menu;
            self.paused = true;
            self.grid.clear_entities();
            self.people.iter_mut().for_each(MovingEntity::deactivate);
            self.mines.clear();
            self.path.clear();
        }
    }

    pub fn is_ended(&self) -> bool {
        self.state == GameState::GameOver
    }

    pub fn step(&mut self, dt_ms: u64) -> Result<(), SimulationError> {
        self.tick_counter += 1;
        if self.state != GameState::Playing || self.paused {
            return Ok(());
        }
        self.frame_count += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        self.move_wanderers(Mover::Person);
        self.move_wanderers(Mover::Mine);
        self.update_robot();

        if self.lives_remaining <= 0 {
            self.finish(GameOverReason::OutOfLives);
        } else if self.people_remaining <= 0 {
            self.advance_level()?;
        }
        Ok(())
    }

    fn update_robot(&mut self) {
        let cooldown = self.effective_cooldown() as u64;
        if self.frame_count % cooldown != 0 {
            return;
        }

        if self.ai_enabled {
            match self.plan_robot_direction() {
                FallbackDecision::Step(dir) => self.robot.dir = dir,
                FallbackDecision::TurnAround(dir) => {
                    self.robot.dir = dir;
                    return;
                }
            }
        }
        let dir = self.robot.dir;
        self.try_move(MoverRef::Robot, dir);
    }

    fn effective_cooldown(&self) -> u32 {
        let cooldown = self.robot.move_cooldown.max(1);
        if self.boost {
            (cooldown / 2).max(1)
        } else {
            cooldown
        }
    }

    fn plan_robot_direction(&mut self) -> FallbackDecision {
        let params = self.search_params();
        self.path = self
            .navigator
            .find_path_to_nearest(&self.grid, self.robot.pos, &self.people, params);

        if let Some(next) = self.path.last().copied() {
            if let Some(dir) = Direction::between(self.robot.pos, next) {
                return FallbackDecision::Step(dir);
            }
        }
        self.path.clear();
        choose_survival_direction(
            &self.grid,
            self.robot.pos,
            self.robot.dir,
            self.config.safety_radius,
            &mut self.rng,
        )
    }

    fn search_params(&self) -> SearchParams {
        SearchParams {
            weight_hundredths: self.heuristic_weight_hundredths,
            hazard_penalty: self.config.hazard_penalty,
        }
    }

    fn finish(&mut self, reason: GameOverReason) {
        self.state = GameState::GameOver;
        self.end_reason = Some(reason);
        self.paused = true;
        self.push_event(RuntimeEvent::GameOver { reason });
    }

    fn push_event(&mut self, event: RuntimeEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_ai(&mut self) -> bool {
        self.ai_enabled = !self.ai_enabled;
        if !self.ai_enabled {
            self.path.clear();
        }
        self.ai_enabled
    }

    pub fn set_boost(&mut self, boost: bool) {
        self.boost = boost;
    }

    pub fn set_direction(&mut self, dir: Direction) {
        if !self.ai_enabled {
            self.robot.dir = dir;
        }
    }

    pub fn set_relative_direction(&mut self, input: RelativeInput, camera_forward: Direction) {
        self.set_direction(input.resolve(camera_forward));
    }

    pub fn adjust_heuristic_weight(&mut self, steps: i32) -> f32 {
        let delta = steps.saturating_mul(HEURISTIC_WEIGHT_STEP_HUNDREDTHS as i32);
        let next = (self.heuristic_weight_hundredths as i64 + delta as i64)
            .clamp(0, MAX_HEURISTIC_WEIGHT_HUNDREDTHS as i64);
        self.heuristic_weight_hundredths = next as u32;
        self.heuristic_weight()
    }

    pub fn heuristic_weight(&self) -> f32 {
        self.heuristic_weight_hundredths as f32 / 100.0
    }

    pub fn paint_line(&mut self, from: Vec2, to: Vec2, erase: bool) -> usize {
        if !self.ai_enabled {
            return 0;
        }
        let value = if erase { CellType::Air } else { CellType::Wall };
        self.grid.paint_line(from, to, value)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn people(&self) -> &[MovingEntity] {
        &self.people
    }

    pub fn mines(&self) -> &[MovingEntity] {
        &self.mines
    }

    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lives_remaining(&self) -> i32 {
        self.lives_remaining
    }

    pub fn people_remaining(&self) -> i32 {
        self.people_remaining
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            state: self.state,
            level: self.level,
            lives_remaining: self.lives_remaining,
            people_remaining: self.people_remaining,
            heuristic_weight: self.heuristic_weight(),
            ai_enabled: self.ai_enabled,
            paused: self.paused,
            elapsed_ms: self.elapsed_ms,
            width: self.grid.width(),
            height: self.grid.height(),
            tiles: self.grid.to_tiles(),
            robot: RobotView {
                x: self.robot.pos.x,
                y: self.robot.pos.y,
                dir: self.robot.dir,
                move_cooldown: self.robot.move_cooldown,
            },
            people: active_views(&self.people),
            mines: active_views(&self.mines),
            path: self.path.clone(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> SessionSummary {
        SessionSummary {
            level: self.level,
            duration_seconds: self.elapsed_ms / 1000,
            people_rescued: self.people_rescued,
            lives_remaining: self.lives_remaining,
            reason: self.end_reason,
        }
    }

    pub fn occupancy_violations(&self) -> Vec<String> {
        let mut expected = Grid::new(self.grid.width(), self.grid.height());
        let mut violations = Vec::new();

        let mut claim = |pos: Vec2, value: CellType, label: String| {
            match expected.cell(pos) {
                None => violations.push(format!("{label} is off-grid at ({},{})", pos.x, pos.y)),
                Some(CellType::Air) => expected.set(pos, value),
                Some(other) => violations.push(format!(
                    "{label} shares ({},{}) with {other:?}",
                    pos.x, pos.y
                )),
            }
        };

        if self.state != GameState::Menu {
            claim(self.robot.pos, CellType::Robot, "robot".to_string());
        }
        for (idx, person) in self.people.iter().enumerate() {
            if let Some(pos) = person.position() {
                claim(pos, CellType::Person, format!("person {idx}"));
            }
        }
        for (idx, mine) in self.mines.iter().enumerate() {
            if let Some(pos) = mine.position() {
                claim(pos, CellType::Mine, format!("mine {idx}"));
            }
        }

        for x in 0..self.grid.width() {
            for y in 0..self.grid.height() {
                let pos = Vec2::new(x, y);
                let actual = self.grid.get(pos);
                let wanted = expected.get(pos);
                if actual == CellType::Wall {
                    if wanted != CellType::Air {
                        violations.push(format!("{wanted:?} stands inside a wall at ({x},{y})"));
                    }
                    continue;
                }
                if actual != wanted {
                    violations.push(format!(
                        "cell ({x},{y}) is {actual:?} but entities say {wanted:?}"
                    ));
                }
            }
        }
        violations
    }
}
