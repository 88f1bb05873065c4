use super::utils::random_direction;
use super::*;
use crate::constants::mine_count_for_level;
use crate::types::EntityState;

impl Simulation {
    /// Level boundary: wipe entities, bump the level, shorten the robot
    /// cooldown, resize the mine pool and reseed before placing everything.
    /// Called by `start_game` too, so level 1 already runs one frame faster
    /// than the configured initial cooldown.
    pub(super) fn advance_level(&mut self) -> Result<(), SimulationError> {
        self.grid.clear_entities();
        for person in &mut self.people {
            person.deactivate();
        }
        for mine in &mut self.mines {
            mine.deactivate();
        }
        self.path.clear();

        self.level += 1;
        self.paused = self.config.pause_on_level_start;
        self.robot.move_cooldown = self.robot.move_cooldown.saturating_sub(1).max(1);

        self.respawn_robot();
        self.robot.dir = Direction::North;

        let mine_count =
            mine_count_for_level(self.level, self.config.mines_per_level, self.config.max_mines);
        let mut mines = Vec::new();
        mines
            .try_reserve_exact(mine_count)
            .map_err(|source| SimulationError::MineAllocation {
                count: mine_count,
                source,
            })?;
        let mine_move = self
            .config
            .per_tick_probability(self.config.mines_max_moves_per_sec);
        mines.resize(
            mine_count,
            MovingEntity::inactive(mine_move, self.config.mine_turn_probability),
        );
        self.mines = mines;

        self.rng.reseed(self.config.seed.wrapping_add(self.level));

        let mut people_placed = 0;
        for idx in 0..self.people.len() {
            if let Some((pos, dir)) = self.pick_spawn_cell() {
                self.people[idx].state = EntityState::Active(pos);
                self.people[idx].dir = dir;
                self.grid.set(pos, CellType::Person);
                people_placed += 1;
            } else {
                self.push_event(RuntimeEvent::SpawnFailed {
                    kind: Mover::Person,
                    index: idx,
                });
            }
        }
        self.people_remaining = people_placed as i32;

        for idx in 0..self.mines.len() {
            if let Some((pos, dir)) = self.pick_spawn_cell() {
                // Scale each mine's pace by a random factor, like people.
                let pace = self.rng.next_f32();
                let mine = &mut self.mines[idx];
                mine.state = EntityState::Active(pos);
                mine.dir = dir;
                mine.move_probability *= pace;
                self.grid.set(pos, CellType::Mine);
            } else {
                self.push_event(RuntimeEvent::SpawnFailed {
                    kind: Mover::Mine,
                    index: idx,
                });
            }
        }

        self.push_event(RuntimeEvent::LevelStarted {
            level: self.level,
            mine_count,
            people_placed,
        });
        Ok(())
    }

    /// Up to `spawn_attempts` uniform picks; only air cells are accepted.
    fn pick_spawn_cell(&mut self) -> Option<(Vec2, Direction)> {
        let max_x = self.grid.width() - 1;
        let max_y = self.grid.height() - 1;
        for _ in 0..self.config.spawn_attempts {
            let pos = Vec2::new(self.rng.int(0, max_x), self.rng.int(0, max_y));
            if self.grid.cell(pos) == Some(CellType::Air) {
                return Some((pos, random_direction(&mut self.rng)));
            }
        }
        None
    }
}
