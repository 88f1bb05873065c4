use crate::constants::spawn_point;
use crate::entity::{entity_at, MovingEntity};
use crate::types::{CellType, Direction, EntityState, Mover, RuntimeEvent, Vec2};

use super::utils::clamp_to_grid;
use super::Simulation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoverRef {
    Robot,
    Person(usize),
    Mine(usize),
}

impl MoverRef {
    pub fn kind(self) -> Mover {
        match self {
            Self::Robot => Mover::Robot,
            Self::Person(_) => Mover::Person,
            Self::Mine(_) => Mover::Mine,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The robot stepped onto a person and took their cell.
    Rescued { person: usize },
    Blocked,
    OffGrid,
    /// Robot and hazard met; the robot is back at spawn.
    LifeLost,
    /// The mover is not on the board.
    Inactive,
}

impl Simulation {
    fn position_of(&self, mover: MoverRef) -> Option<Vec2> {
        match mover {
            MoverRef::Robot => Some(self.robot.pos),
            other => self.wanderer(other).and_then(MovingEntity::position),
        }
    }

    fn set_position(&mut self, mover: MoverRef, pos: Vec2) {
        if mover == MoverRef::Robot {
            self.robot.pos = pos;
        } else if let Some(entity) = self.wanderer_mut(mover) {
            entity.state = EntityState::Active(pos);
        }
    }

    /// Resolves one step of `mover` toward `dir`, keeping the grid and entity
    /// positions in sync whatever the outcome.
    pub fn try_move(&mut self, mover: MoverRef, dir: Direction) -> MoveOutcome {
        let Some(origin) = self.position_of(mover) else {
            return MoveOutcome::Inactive;
        };
        let candidate = origin.step(dir);
        let Some(target) = self.grid.cell(candidate) else {
            return MoveOutcome::OffGrid;
        };
        let kind = mover.kind();

        let mut rescued = None;
        match (kind, target) {
            (_, CellType::Air) => {}
            (Mover::Robot, CellType::Person) => {
                if let Some(idx) = entity_at(&self.people, candidate) {
                    self.people[idx].deactivate();
                    self.people_remaining -= 1;
                    self.people_rescued += 1;
                    self.push_event(RuntimeEvent::PersonRescued {
                        index: idx,
                        x: candidate.x,
                        y: candidate.y,
                    });
                    rescued = Some(idx);
                }
            }
            (Mover::Robot, CellType::Wall | CellType::Mine) => {
                self.lose_life(Mover::Robot, candidate);
                return MoveOutcome::LifeLost;
            }
            (Mover::Mine, CellType::Robot) => {
                self.lose_life(Mover::Mine, candidate);
                return MoveOutcome::LifeLost;
            }
            _ => return MoveOutcome::Blocked,
        }

        self.grid.set(origin, CellType::Air);
        self.set_position(mover, candidate);
        self.grid.set(candidate, kind.cell_type());
        match rescued {
            Some(person) => MoveOutcome::Rescued { person },
            None => MoveOutcome::Moved,
        }
    }

    fn lose_life(&mut self, by: Mover, at: Vec2) {
        self.lives_remaining = (self.lives_remaining - 1).max(0);
        self.push_event(RuntimeEvent::LifeLost {
            by,
            x: at.x,
            y: at.y,
            lives_remaining: self.lives_remaining,
        });
        self.respawn_robot();
    }

    /// Puts the robot back at the level spawn, or the nearest free cell when
    /// something is standing there. Walls are never overwritten.
    pub(super) fn respawn_robot(&mut self) {
        if self.grid.cell(self.robot.pos) == Some(CellType::Robot) {
            self.grid.set(self.robot.pos, CellType::Air);
        }
        let (sx, sy) = spawn_point(self.grid.width(), self.grid.height());
        let spawn = clamp_to_grid(&self.grid, Vec2::new(sx, sy));
        let target = match self.grid.cell(spawn) {
            Some(CellType::Air) => Some(spawn),
            _ => self.grid.nearest_air(spawn),
        };
        if let Some(pos) = target {
            self.robot.pos = pos;
        }
        if self.grid.cell(self.robot.pos) == Some(CellType::Air) {
            self.grid.set(self.robot.pos, CellType::Robot);
        }
    }

    fn wanderer(&self, mover: MoverRef) -> Option<&MovingEntity> {
        match mover {
            MoverRef::Robot => None,
            MoverRef::Person(idx) => self.people.get(idx),
            MoverRef::Mine(idx) => self.mines.get(idx),
        }
    }

    fn wanderer_mut(&mut self, mover: MoverRef) -> Option<&mut MovingEntity> {
        match mover {
            MoverRef::Robot => None,
            MoverRef::Person(idx) => self.people.get_mut(idx),
            MoverRef::Mine(idx) => self.mines.get_mut(idx),
        }
    }

    pub(super) fn move_wanderers(&mut self, kind: Mover) {
        let count = match kind {
            Mover::Person => self.people.len(),
            Mover::Mine => self.mines.len(),
            Mover::Robot => return,
        };

        for idx in 0..count {
            let mover = match kind {
                Mover::Person => MoverRef::Person(idx),
                _ => MoverRef::Mine(idx),
            };
            let Some((turn_p, move_p)) = self
                .wanderer(mover)
                .filter(|entity| entity.is_active())
                .map(|entity| (entity.turn_probability, entity.move_probability))
            else {
                continue;
            };

            if self.rng.chance(turn_p) {
                let quarter = self.rng.int(0, 1);
                if let Some(entity) = self.wanderer_mut(mover) {
                    entity.dir = entity.dir.rotate(quarter);
                }
            }
            if self.rng.chance(move_p) {
                if let Some(dir) = self.wanderer(mover).map(|entity| entity.dir) {
                    self.try_move(mover, dir);
                }
            }
        }
    }
}
