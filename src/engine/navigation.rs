use crate::entity::MovingEntity;
use crate::types::{Direction, Vec2};
use crate::world::Grid;

use super::utils::manhattan;

#[derive(Clone, Copy, Debug)]
pub struct SearchParams {
    /// Heuristic multiplier in hundredths (150 = 1.5).
    pub weight_hundredths: u32,
    /// Extra step cost for cells touching a mine.
    pub hazard_penalty: i32,
}

#[derive(Clone, Copy, Debug, Default)]
struct PathNode {
    g: i32,
    h: i32,
    parent: Option<usize>,
    open: bool,
    closed: bool,
}

impl PathNode {
    fn f(&self) -> i32 {
        self.g + self.h
    }
}

/// Weighted A* over the grid. The node table is allocated once per grid size
/// and reset at the start of every search.
#[derive(Clone, Debug)]
pub struct Navigator {
    width: i32,
    height: i32,
    nodes: Vec<PathNode>,
    expanded: usize,
}

impl Navigator {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            nodes: vec![PathNode::default(); (width as usize) * (height as usize)],
            expanded: 0,
        }
    }

    /// Nodes closed by the most recent search.
    pub fn expanded_nodes(&self) -> usize {
        self.expanded
    }

    fn index(&self, pos: Vec2) -> usize {
        (pos.x * self.height + pos.y) as usize
    }

    fn position(&self, index: usize) -> Vec2 {
        let index = index as i32;
        Vec2::new(index / self.height, index % self.height)
    }

    fn reset(&mut self, grid: &Grid) {
        if grid.width() != self.width || grid.height() != self.height {
            *self = Self::new(grid.width(), grid.height());
        }
        self.nodes.fill(PathNode::default());
        self.expanded = 0;
    }

    /// Routes toward the closest active person. No target means no search.
    pub fn find_path_to_nearest(
        &mut self,
        grid: &Grid,
        start: Vec2,
        people: &[MovingEntity],
        params: SearchParams,
    ) -> Vec<Vec2> {
        self.expanded = 0;
        match select_target(start, people) {
            Some(goal) => self.find_path(grid, start, goal, params),
            None => Vec::new(),
        }
    }

    /// Returns the route from `goal` back toward `start`, start excluded, so
    /// the last element is the next step. Empty when unreachable.
    pub fn find_path(
        &mut self,
        grid: &Grid,
        start: Vec2,
        goal: Vec2,
        params: SearchParams,
    ) -> Vec<Vec2> {
        self.reset(grid);
        if start == goal || !grid.in_bounds(start) || !grid.in_bounds(goal) {
            return Vec::new();
        }

        let heuristic = |pos: Vec2| -> i32 {
            let distance = manhattan(pos, goal) as i64;
            (distance * params.weight_hundredths as i64 / 100) as i32
        };

        let start_idx = self.index(start);
        let goal_idx = self.index(goal);
        self.nodes[start_idx] = PathNode {
            g: 0,
            h: heuristic(start),
            parent: None,
            open: true,
            closed: false,
        };

        loop {
            // First open node with the lowest f, in index order.
            let mut current: Option<usize> = None;
            for (idx, node) in self.nodes.iter().enumerate() {
                if !node.open {
                    continue;
                }
                match current {
                    Some(best) if self.nodes[best].f() <= node.f() => {}
                    _ => current = Some(idx),
                }
            }
            let Some(current) = current else {
                return Vec::new();
            };

            self.nodes[current].open = false;
            self.nodes[current].closed = true;
            self.expanded += 1;
            if current == goal_idx {
                return self.reconstruct(goal_idx, start_idx);
            }

            let pos = self.position(current);
            let base_g = self.nodes[current].g;
            for dir in Direction::ALL {
                let next = pos.step(dir);
                let Some(cell) = grid.cell(next) else {
                    continue;
                };
                if cell.blocks_path() {
                    continue;
                }
                let next_idx = self.index(next);
                if self.nodes[next_idx].closed {
                    continue;
                }

                let mut step_cost = 1;
                if grid.is_mine_adjacent(next) {
                    step_cost += params.hazard_penalty;
                }
                let g = base_g + step_cost;
                let node = &mut self.nodes[next_idx];
                if !node.open || g < node.g {
                    node.g = g;
                    node.h = heuristic(next);
                    node.parent = Some(current);
                    node.open = true;
                }
            }
        }
    }

    fn reconstruct(&self, goal_idx: usize, start_idx: usize) -> Vec<Vec2> {
        let mut path = Vec::new();
        let mut cursor = goal_idx;
        while cursor != start_idx {
            path.push(self.position(cursor));
            match self.nodes[cursor].parent {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        path
    }
}

/// Closest active person by Manhattan distance; ties go to the lowest index.
pub fn select_target(robot: Vec2, people: &[MovingEntity]) -> Option<Vec2> {
    people
        .iter()
        .filter_map(MovingEntity::position)
        .min_by_key(|pos| manhattan(robot, *pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellType, EntityState};

    fn params(weight_hundredths: u32) -> SearchParams {
        SearchParams {
            weight_hundredths,
            hazard_penalty: 20,
        }
    }

    fn person(x: i32, y: i32) -> MovingEntity {
        MovingEntity {
            state: EntityState::Active(Vec2::new(x, y)),
            dir: Direction::North,
            move_probability: 0.0,
            turn_probability: 0.0,
        }
    }

    fn assert_walkable(grid: &Grid, start: Vec2, goal: Vec2, path: &[Vec2]) {
        assert_eq!(path.first().copied(), Some(goal));
        let mut previous = start;
        for step in path.iter().rev() {
            assert!(Direction::between(previous, *step).is_some(), "{previous:?} -> {step:?}");
            let cell = grid.cell(*step).expect("path stays on grid");
            assert!(!cell.blocks_path(), "{step:?} is {cell:?}");
            previous = *step;
        }
    }

    #[test]
    fn straight_corridor_route() {
        let grid = Grid::new(10, 10);
        let mut nav = Navigator::new(10, 10);
        let path = nav.find_path(&grid, Vec2::new(1, 5), Vec2::new(6, 5), params(150));
        assert_eq!(path.len(), 5);
        assert_eq!(path.last().copied(), Some(Vec2::new(2, 5)));
        assert_walkable(&grid, Vec2::new(1, 5), Vec2::new(6, 5), &path);
    }

    #[test]
    fn routes_around_walls_and_through_people() {
        let mut grid = Grid::new(12, 12);
        for y in 0..10 {
            grid.set(Vec2::new(5, y), CellType::Wall);
        }
        grid.set(Vec2::new(2, 10), CellType::Person);
        let mut nav = Navigator::new(12, 12);
        let start = Vec2::new(2, 2);
        let goal = Vec2::new(9, 2);
        let path = nav.find_path(&grid, start, goal, params(150));
        assert!(!path.is_empty());
        assert_walkable(&grid, start, goal, &path);
        assert!(path.iter().any(|pos| pos.y >= 10));
    }

    #[test]
    fn mines_are_impassable() {
        let mut grid = Grid::new(5, 5);
        for y in 0..5 {
            grid.set(Vec2::new(2, y), CellType::Mine);
        }
        let mut nav = Navigator::new(5, 5);
        let path = nav.find_path(&grid, Vec2::new(0, 2), Vec2::new(4, 2), params(150));
        assert!(path.is_empty());
        assert!(nav.expanded_nodes() > 0);
    }

    #[test]
    fn unreachable_goal_returns_empty() {
        let mut grid = Grid::new(6, 6);
        for pos in [
            Vec2::new(4, 5),
            Vec2::new(5, 4),
            Vec2::new(4, 4),
        ] {
            grid.set(pos, CellType::Wall);
        }
        let mut nav = Navigator::new(6, 6);
        assert!(nav
            .find_path(&grid, Vec2::new(0, 0), Vec2::new(5, 5), params(100))
            .is_empty());
    }

    #[test]
    fn hazard_penalty_prefers_the_safer_detour() {
        let mut grid = Grid::new(9, 7);
        grid.set(Vec2::new(4, 2), CellType::Mine);
        let mut nav = Navigator::new(9, 7);
        let start = Vec2::new(0, 3);
        let goal = Vec2::new(8, 3);

        let safe = nav.find_path(
            &grid,
            start,
            goal,
            SearchParams {
                weight_hundredths: 100,
                hazard_penalty: 20,
            },
        );
        assert_walkable(&grid, start, goal, &safe);
        assert!(safe.iter().all(|pos| !grid.is_mine_adjacent(*pos)));

        let direct = nav.find_path(
            &grid,
            start,
            goal,
            SearchParams {
                weight_hundredths: 100,
                hazard_penalty: 0,
            },
        );
        assert_eq!(direct.len(), 8);
        assert!(safe.len() > direct.len());
    }

    #[test]
    fn higher_weight_never_expands_more_in_open_field() {
        let grid = Grid::new(30, 30);
        let mut nav = Navigator::new(30, 30);
        nav.find_path(&grid, Vec2::new(0, 0), Vec2::new(29, 29), params(0));
        let dijkstra = nav.expanded_nodes();
        nav.find_path(&grid, Vec2::new(0, 0), Vec2::new(29, 29), params(150));
        let greedy = nav.expanded_nodes();
        assert!(greedy < dijkstra);
    }

    #[test]
    fn no_active_people_means_no_search() {
        let grid = Grid::new(10, 10);
        let mut nav = Navigator::new(10, 10);
        nav.find_path(&grid, Vec2::new(0, 0), Vec2::new(9, 9), params(150));
        assert!(nav.expanded_nodes() > 0);

        let mut gone = person(3, 3);
        gone.state = EntityState::Inactive;
        let path = nav.find_path_to_nearest(&grid, Vec2::new(0, 0), &[gone], params(150));
        assert!(path.is_empty());
        assert_eq!(nav.expanded_nodes(), 0);
    }

    #[test]
    fn target_is_nearest_with_first_index_on_ties() {
        let robot = Vec2::new(5, 5);
        let people = [person(8, 5), person(5, 2), person(9, 9)];
        assert_eq!(select_target(robot, &people), Some(Vec2::new(8, 5)));

        let mut people = people;
        people[0].state = EntityState::Inactive;
        assert_eq!(select_target(robot, &people), Some(Vec2::new(5, 2)));
        assert_eq!(select_target(robot, &[]), None);
    }

    #[test]
    fn navigator_resizes_for_a_different_grid() {
        let grid = Grid::new(4, 9);
        let mut nav = Navigator::new(2, 2);
        let path = nav.find_path(&grid, Vec2::new(0, 0), Vec2::new(3, 8), params(150));
        assert_eq!(path.len(), 11);
    }
}
