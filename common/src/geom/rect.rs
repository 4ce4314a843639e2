use super::coord::GridCoord;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl GridRect {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width.saturating_sub(1), height.saturating_sub(1))
    }

    pub fn bounding(coords: impl IntoIterator<Item = GridCoord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut rect = Self::new(first.x, first.y, first.x, first.y);
        for c in iter {
            rect.min_x = rect.min_x.min(c.x);
            rect.min_y = rect.min_y.min(c.y);
            rect.max_x = rect.max_x.max(c.x);
            rect.max_y = rect.max_y.max(c.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn contains(&self, c: GridCoord) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    pub fn intersect(&self, other: &GridRect) -> Option<GridRect> {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some(GridRect {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn cells(self) -> impl Iterator<Item = GridCoord> {
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_y..=self.max_y)
            .flat_map(move |y| (min_x..=max_x).map(move |x| GridCoord::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_corners() {
        let r = GridRect::new(5, 7, 1, 2);
        assert_eq!(r, GridRect::new(1, 2, 5, 7));
        assert_eq!(r.width(), 5);
        assert_eq!(r.height(), 6);
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = GridRect::new(0, 0, 3, 3);
        let b = GridRect::new(4, 0, 6, 3);
        assert!(a.intersect(&b).is_none());
        let c = GridRect::new(2, 2, 9, 9);
        assert_eq!(a.intersect(&c), Some(GridRect::new(2, 2, 3, 3)));
    }

    #[test]
    fn bounding_covers_all_points() {
        let r = GridRect::bounding([
            GridCoord::new(3, 1),
            GridCoord::new(0, 4),
            GridCoord::new(2, 2),
        ])
        .unwrap();
        assert_eq!(r, GridRect::new(0, 1, 3, 4));
        assert_eq!(r.cells().count() as u64, r.area());
        assert!(GridRect::bounding(std::iter::empty()).is_none());
    }
}
