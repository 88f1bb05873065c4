use crate::rng::Rng;
use crate::types::{CellType, Direction, Vec2};
use crate::world::Grid;

use super::utils::manhattan;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackDecision {
    Step(Direction),
    /// Nowhere safe to go: face the other way and hold position this move.
    TurnAround(Direction),
}

/// Distance to the closest mine within `radius`, or `radius + 1` when the
/// neighbourhood is clear. Higher is safer.
pub fn local_safety_score(grid: &Grid, pos: Vec2, radius: i32) -> i32 {
    let mut best = radius + 1;
    for dx in -radius..=radius {
        let span = radius - dx.abs();
        for dy in -span..=span {
            let probe = Vec2::new(pos.x + dx, pos.y + dy);
            if grid.cell(probe) == Some(CellType::Mine) {
                best = best.min(manhattan(pos, probe));
            }
        }
    }
    best
}

/// Picks the orthogonal neighbour farthest from mines, starting the scan at a
/// random direction so ties do not always favour north.
pub fn choose_survival_direction(
    grid: &Grid,
    robot: Vec2,
    facing: Direction,
    radius: i32,
    rng: &mut Rng,
) -> FallbackDecision {
    let offset = rng.int(0, 3);
    let mut best: Option<(Direction, i32)> = None;
    for turn in 0..4 {
        let dir = Direction::from_index(offset + turn);
        let candidate = robot.step(dir);
        match grid.cell(candidate) {
            Some(cell) if !cell.blocks_path() => {}
            _ => continue,
        }
        let score = local_safety_score(grid, candidate, radius);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((dir, score));
        }
    }
    match best {
        Some((dir, _)) => FallbackDecision::Step(dir),
        None => FallbackDecision::TurnAround(facing.reverse()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_score_caps_when_clear() {
        let grid = Grid::new(10, 10);
        assert_eq!(local_safety_score(&grid, Vec2::new(5, 5), 4), 5);
    }

    #[test]
    fn safety_score_is_distance_to_closest_mine() {
        let mut grid = Grid::new(10, 10);
        grid.set(Vec2::new(5, 8), CellType::Mine);
        grid.set(Vec2::new(7, 5), CellType::Mine);
        assert_eq!(local_safety_score(&grid, Vec2::new(5, 5), 4), 2);
        assert_eq!(local_safety_score(&grid, Vec2::new(0, 0), 4), 5);
    }

    #[test]
    fn steps_away_from_the_mine() {
        let mut grid = Grid::new(9, 9);
        grid.set(Vec2::new(6, 4), CellType::Mine);
        grid.set(Vec2::new(4, 1), CellType::Mine);
        grid.set(Vec2::new(4, 7), CellType::Mine);
        for seed in 0..16 {
            let mut rng = Rng::new(seed);
            let decision =
                choose_survival_direction(&grid, Vec2::new(4, 4), Direction::North, 4, &mut rng);
            assert_eq!(decision, FallbackDecision::Step(Direction::West));
        }
    }

    #[test]
    fn skips_walls_mines_and_edges() {
        let mut grid = Grid::new(3, 3);
        grid.set(Vec2::new(1, 0), CellType::Wall);
        grid.set(Vec2::new(0, 1), CellType::Mine);
        grid.set(Vec2::new(2, 1), CellType::Wall);
        let mut rng = Rng::new(4);
        let decision =
            choose_survival_direction(&grid, Vec2::new(1, 1), Direction::East, 4, &mut rng);
        assert_eq!(decision, FallbackDecision::Step(Direction::South));

        let mut rng = Rng::new(4);
        let decision =
            choose_survival_direction(&grid, Vec2::new(0, 0), Direction::North, 4, &mut rng);
        assert_eq!(decision, FallbackDecision::TurnAround(Direction::South));
    }

    #[test]
    fn person_cells_are_acceptable_moves() {
        let mut grid = Grid::new(3, 1);
        grid.set(Vec2::new(2, 0), CellType::Person);
        let mut rng = Rng::new(9);
        let decision =
            choose_survival_direction(&grid, Vec2::new(1, 0), Direction::North, 2, &mut rng);
        assert!(matches!(
            decision,
            FallbackDecision::Step(Direction::East | Direction::West)
        ));
    }
}
