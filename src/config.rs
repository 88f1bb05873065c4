use crate::constants::{
    DEFAULT_HEURISTIC_WEIGHT_HUNDREDTHS, GRID_HEIGHT, GRID_WIDTH, HAZARD_PENALTY,
    INITIAL_MOVE_COOLDOWN, MAX_LIVES, MAX_MINES, MINES_MAX_MOVES_PER_SEC, MINES_PER_LEVEL,
    MINE_TURN_PROBABILITY, NUM_PEOPLE, PEOPLE_MAX_MOVES_PER_SEC, SAFETY_RADIUS, SPAWN_ATTEMPTS,
    TICK_RATE,
};

/// Tunables for one simulation session. `Default` reproduces the stock game.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub width: i32,
    pub height: i32,
    pub people_count: usize,
    pub max_lives: i32,
    pub tick_rate: u32,
    pub initial_move_cooldown: u32,
    pub people_max_moves_per_sec: f32,
    pub mines_max_moves_per_sec: f32,
    pub mine_turn_probability: f32,
    pub mines_per_level: usize,
    pub max_mines: usize,
    pub spawn_attempts: u32,
    pub hazard_penalty: i32,
    pub heuristic_weight_hundredths: u32,
    pub safety_radius: i32,
    /// Base seed. Each level reseeds with `seed + level`, so the default of 0
    /// seeds from the level number alone.
    pub seed: u32,
    pub pause_on_level_start: bool,
    pub ai_enabled: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            people_count: NUM_PEOPLE,
            max_lives: MAX_LIVES,
            tick_rate: TICK_RATE,
            initial_move_cooldown: INITIAL_MOVE_COOLDOWN,
            people_max_moves_per_sec: PEOPLE_MAX_MOVES_PER_SEC,
            mines_max_moves_per_sec: MINES_MAX_MOVES_PER_SEC,
            mine_turn_probability: MINE_TURN_PROBABILITY,
            mines_per_level: MINES_PER_LEVEL,
            max_mines: MAX_MINES,
            spawn_attempts: SPAWN_ATTEMPTS,
            hazard_penalty: HAZARD_PENALTY,
            heuristic_weight_hundredths: DEFAULT_HEURISTIC_WEIGHT_HUNDREDTHS,
            safety_radius: SAFETY_RADIUS,
            seed: 0,
            pause_on_level_start: true,
            ai_enabled: true,
        }
    }
}

impl SimulationConfig {
    /// Converts a "max moves per second" rate into a per-tick probability.
    pub fn per_tick_probability(&self, moves_per_sec: f32) -> f32 {
        if self.tick_rate == 0 {
            return 0.0;
        }
        (moves_per_sec / self.tick_rate as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_tick_probability_divides_by_tick_rate() {
        let config = SimulationConfig::default();
        let p = config.per_tick_probability(3.0);
        assert!((p - 0.05).abs() < 1e-6);
    }

    #[test]
    fn per_tick_probability_handles_zero_tick_rate() {
        let config = SimulationConfig {
            tick_rate: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.per_tick_probability(5.0), 0.0);
    }
}
