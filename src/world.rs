use crate::types::{CellType, Vec2};

// Occupancy cache for the play field. Entities own their positions; the grid
// mirrors them and must always be updated together with the entity.
#[derive(Clone, Debug)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<CellType>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            cells: vec![CellType::Air; (width as usize) * (height as usize)],
        }
    }

    pub fn with_plus_walls(width: i32, height: i32) -> Self {
        let mut grid = Self::new(width, height);
        for x in 4..(width - 4) {
            grid.set(Vec2::new(x, height / 2), CellType::Wall);
        }
        for y in 4..(height - 4) {
            grid.set(Vec2::new(width / 2, y), CellType::Wall);
        }
        grid
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Vec2) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Vec2) -> usize {
        (pos.x * self.height + pos.y) as usize
    }

    pub fn get(&self, pos: Vec2) -> CellType {
        debug_assert!(self.in_bounds(pos), "grid read out of bounds: {pos:?}");
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, pos: Vec2, value: CellType) {
        debug_assert!(self.in_bounds(pos), "grid write out of bounds: {pos:?}");
        let index = self.index(pos);
        self.cells[index] = value;
    }

    pub fn cell(&self, pos: Vec2) -> Option<CellType> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.cells[self.index(pos)])
    }

    pub fn clear_entities(&mut self) {
        for cell in &mut self.cells {
            if *cell != CellType::Wall {
                *cell = CellType::Air;
            }
        }
    }

    pub fn count(&self, value: CellType) -> usize {
        self.cells.iter().filter(|cell| **cell == value).count()
    }

    pub fn is_mine_adjacent(&self, pos: Vec2) -> bool {
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let neighbor = Vec2::new(pos.x + dx, pos.y + dy);
                if self.cell(neighbor) == Some(CellType::Mine) {
                    return true;
                }
            }
        }
        false
    }

    // Only air and wall cells change; entity cells are left alone.
    pub fn paint_line(&mut self, from: Vec2, to: Vec2, value: CellType) -> usize {
        let dx = (to.x - from.x).abs();
        let dy = (to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx - dy;
        let mut x = from.x;
        let mut y = from.y;
        let mut painted = 0;

        loop {
            let pos = Vec2::new(x, y);
            if let Some(current) = self.cell(pos) {
                if matches!(current, CellType::Air | CellType::Wall) && current != value {
                    self.set(pos, value);
                    painted += 1;
                }
            }

            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
        painted
    }

    pub fn nearest_air(&self, origin: Vec2) -> Option<Vec2> {
        let max_radius = self.width + self.height;
        for radius in 0..=max_radius {
            for dx in -radius..=radius {
                let rest = radius - dx.abs();
                let candidates = if rest == 0 {
                    [Some(Vec2::new(origin.x + dx, origin.y)), None]
                } else {
                    [
                        Some(Vec2::new(origin.x + dx, origin.y - rest)),
                        Some(Vec2::new(origin.x + dx, origin.y + rest)),
                    ]
                };
                for pos in candidates.into_iter().flatten() {
                    if self.cell(pos) == Some(CellType::Air) {
                        return Some(pos);
                    }
                }
            }
        }
        None
    }

    pub fn to_tiles(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| self.get(Vec2::new(x, y)).glyph())
                    .collect::<String>()
            })
            .collect()
    }
}
