use crate::types::{Direction, EntityState, EntityView, Vec2};

/// A wandering actor (person or mine).
#[derive(Clone, Debug)]
pub struct MovingEntity {
    pub state: EntityState,
    pub dir: Direction,
    pub move_probability: f32,
    pub turn_probability: f32,
}

impl MovingEntity {
    pub fn inactive(move_probability: f32, turn_probability: f32) -> Self {
        Self {
            state: EntityState::Inactive,
            dir: Direction::North,
            move_probability,
            turn_probability,
        }
    }

    pub fn position(&self) -> Option<Vec2> {
        self.state.position()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn deactivate(&mut self) {
        self.state = EntityState::Inactive;
    }
}

#[derive(Clone, Debug)]
pub struct Robot {
    pub pos: Vec2,
    pub dir: Direction,
    /// Frames between forced moves.
    pub move_cooldown: u32,
}

/// Linear scan for the active entity standing on `pos`.
pub fn entity_at(entities: &[MovingEntity], pos: Vec2) -> Option<usize> {
    entities
        .iter()
        .position(|entity| entity.position() == Some(pos))
}

pub fn active_views(entities: &[MovingEntity]) -> Vec<EntityView> {
    entities
        .iter()
        .enumerate()
        .filter_map(|(index, entity)| {
            entity.position().map(|pos| EntityView {
                index,
                x: pos.x,
                y: pos.y,
                dir: entity.dir,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: i32, y: i32) -> MovingEntity {
        MovingEntity {
            state: EntityState::Active(Vec2::new(x, y)),
            dir: Direction::East,
            move_probability: 0.0,
            turn_probability: 0.0,
        }
    }

    #[test]
    fn entity_at_finds_first_match_and_skips_inactive() {
        let mut entities = vec![at(1, 1), at(2, 2), MovingEntity::inactive(0.1, 0.1)];
        assert_eq!(entity_at(&entities, Vec2::new(2, 2)), Some(1));
        assert_eq!(entity_at(&entities, Vec2::new(3, 3)), None);

        entities[1].deactivate();
        assert_eq!(entity_at(&entities, Vec2::new(2, 2)), None);
    }

    #[test]
    fn active_views_keep_original_indices() {
        let entities = vec![MovingEntity::inactive(0.0, 0.0), at(4, 5)];
        let views = active_views(&entities);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].index, 1);
        assert_eq!((views[0].x, views[0].y), (4, 5));
    }
}
