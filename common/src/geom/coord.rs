use serde::{Deserialize, Serialize};
use std::fmt;

// Expansion order; fixes the tie-break between equally short paths.
pub const STEPS: [(i32, i32); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
}

impl GridCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    pub fn manhattan(&self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    #[inline(always)]
    pub fn is_adjacent(&self, other: GridCoord) -> bool {
        self.manhattan(other) == 1
    }

    #[inline(always)]
    pub fn step(&self, dx: i32, dy: i32, width: u32, height: u32) -> Option<GridCoord> {
        let nx = self.x as i64 + dx as i64;
        let ny = self.y as i64 + dy as i64;
        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
            return None;
        }
        Some(GridCoord::new(nx as u32, ny as u32))
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stays_inside_bounds() {
        let c = GridCoord::new(0, 0);
        assert_eq!(c.step(-1, 0, 5, 5), None);
        assert_eq!(c.step(0, -1, 5, 5), None);
        assert_eq!(c.step(1, 0, 5, 5), Some(GridCoord::new(1, 0)));

        let corner = GridCoord::new(4, 4);
        assert_eq!(corner.step(1, 0, 5, 5), None);
        assert_eq!(corner.step(0, 1, 5, 5), None);
    }

    #[test]
    fn adjacency_is_orthogonal_only() {
        let c = GridCoord::new(3, 3);
        assert!(c.is_adjacent(GridCoord::new(3, 4)));
        assert!(c.is_adjacent(GridCoord::new(2, 3)));
        assert!(!c.is_adjacent(GridCoord::new(4, 4)));
        assert!(!c.is_adjacent(c));
    }
}
