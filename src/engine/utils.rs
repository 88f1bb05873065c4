use crate::rng::Rng;
use crate::types::{Direction, Vec2};
use crate::world::Grid;

pub(super) fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub(super) fn random_direction(rng: &mut Rng) -> Direction {
    Direction::from_index(rng.int(0, 3))
}

/// Nudges a point onto the grid; small or non-square grids can put the stock
/// spawn point outside.
pub(super) fn clamp_to_grid(grid: &Grid, pos: Vec2) -> Vec2 {
    Vec2::new(
        pos.x.clamp(0, (grid.width() - 1).max(0)),
        pos.y.clamp(0, (grid.height() - 1).max(0)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_symmetric() {
        let a = Vec2::new(1, 7);
        let b = Vec2::new(4, 3);
        assert_eq!(manhattan(a, b), 7);
        assert_eq!(manhattan(b, a), 7);
        assert_eq!(manhattan(a, a), 0);
    }

    #[test]
    fn clamp_keeps_inside_points() {
        let grid = Grid::new(6, 4);
        assert_eq!(clamp_to_grid(&grid, Vec2::new(3, 2)), Vec2::new(3, 2));
        assert_eq!(clamp_to_grid(&grid, Vec2::new(9, -1)), Vec2::new(5, 0));
    }

    #[test]
    fn random_direction_covers_all_four() {
        let mut rng = Rng::new(17);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[random_direction(&mut rng).index() as usize] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }
}
