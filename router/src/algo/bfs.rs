use crate::grid::TraversableGrid;
use serde::Serialize;
use std::collections::VecDeque;
use wh_common::geom::coord::GridCoord;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PathLeg {
    pub distance: u32,
    pub path: Vec<GridCoord>,
}

// Scratch buffers are reused across floods and invalidated by a generation tag.
#[derive(Clone)]
pub struct ShortestPath {
    dist: Vec<u32>,
    visited_tag: Vec<u32>,
    current_tag: u32,
    capacity: usize,
    queue: VecDeque<u32>,
    width: u32,
    height: u32,
    source: Option<GridCoord>,
}

impl Default for ShortestPath {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortestPath {
    pub fn new() -> Self {
        let cap = 4096;
        Self {
            dist: vec![u32::MAX; cap],
            visited_tag: vec![0; cap],
            current_tag: 1,
            capacity: cap,
            queue: VecDeque::with_capacity(256),
            width: 0,
            height: 0,
            source: None,
        }
    }

    fn ensure_capacity(&mut self, size: usize) {
        if size > self.capacity {
            self.capacity = size.max(self.capacity * 2);
            self.dist.resize(self.capacity, u32::MAX);
            self.visited_tag.resize(self.capacity, 0);
        }
    }

    fn reset(&mut self) {
        self.current_tag = self.current_tag.wrapping_add(1);
        if self.current_tag == 0 {
            self.visited_tag.fill(0);
            self.current_tag = 1;
        }
        self.queue.clear();
        self.source = None;
    }

    #[inline(always)]
    fn index(&self, c: GridCoord) -> usize {
        (c.y as usize) * (self.width as usize) + (c.x as usize)
    }

    #[inline(always)]
    fn coord(&self, idx: u32) -> GridCoord {
        GridCoord::new(idx % self.width, idx / self.width)
    }

    pub fn source(&self) -> Option<GridCoord> {
        self.source
    }

    pub fn flood<G: TraversableGrid + ?Sized>(&mut self, grid: &G, source: GridCoord) -> bool {
        self.flood_until(grid, source, None)
    }

    fn flood_until<G: TraversableGrid + ?Sized>(
        &mut self,
        grid: &G,
        source: GridCoord,
        stop: Option<GridCoord>,
    ) -> bool {
        self.width = grid.width();
        self.height = grid.height();
        self.ensure_capacity((self.width as usize) * (self.height as usize));
        self.reset();

        if !grid.is_traversable(source) {
            return false;
        }

        let start = self.index(source);
        self.dist[start] = 0;
        self.visited_tag[start] = self.current_tag;
        self.queue.push_back(start as u32);
        self.source = Some(source);

        if stop == Some(source) {
            return true;
        }

        let mut neighbors = [GridCoord::new(0, 0); 4];
        while let Some(idx) = self.queue.pop_front() {
            let position = self.coord(idx);
            let next_dist = self.dist[idx as usize] + 1;
            let n_count = grid.neighbors_into(position, &mut neighbors);

            for &neighbor in &neighbors[..n_count] {
                let n_idx = self.index(neighbor);
                if self.visited_tag[n_idx] == self.current_tag {
                    continue;
                }
                self.visited_tag[n_idx] = self.current_tag;
                self.dist[n_idx] = next_dist;
                if stop == Some(neighbor) {
                    return true;
                }
                self.queue.push_back(n_idx as u32);
            }
        }
        true
    }

    #[inline(always)]
    pub fn distance(&self, c: GridCoord) -> Option<u32> {
        if self.source.is_none() || c.x >= self.width || c.y >= self.height {
            return None;
        }
        let idx = self.index(c);
        if self.visited_tag[idx] == self.current_tag {
            Some(self.dist[idx])
        } else {
            None
        }
    }

    // Always steps to the first closer neighbour in `STEPS` order.
    pub fn descend<G: TraversableGrid + ?Sized>(
        &self,
        grid: &G,
        from: GridCoord,
    ) -> Option<Vec<GridCoord>> {
        let mut remaining = self.distance(from)?;
        let mut path = Vec::with_capacity(remaining as usize + 1);
        let mut current = from;
        path.push(current);

        let mut neighbors = [GridCoord::new(0, 0); 4];
        while remaining > 0 {
            let n_count = grid.neighbors_into(current, &mut neighbors);
            let next = neighbors[..n_count]
                .iter()
                .copied()
                .find(|&n| self.distance(n) == Some(remaining - 1))?;
            path.push(next);
            current = next;
            remaining -= 1;
        }
        Some(path)
    }

    pub fn shortest_path<G: TraversableGrid + ?Sized>(
        &mut self,
        grid: &G,
        from: GridCoord,
        to: GridCoord,
    ) -> Option<PathLeg> {
        if !grid.is_traversable(from) || !self.flood_until(grid, to, Some(from)) {
            return None;
        }
        let distance = self.distance(from)?;
        let path = self.descend(grid, from)?;
        Some(PathLeg { distance, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wh_common::db::core::{GridLayout, LayoutBuilder};

    fn grid(rows: &[&str]) -> GridLayout {
        LayoutBuilder::from_rows(rows).unwrap().build().unwrap()
    }

    fn c(x: u32, y: u32) -> GridCoord {
        GridCoord::new(x, y)
    }

    #[test]
    fn straight_corridor() {
        let g = grid(&["D...."]);
        let leg = ShortestPath::new().shortest_path(&g, c(0, 0), c(4, 0)).unwrap();
        assert_eq!(leg.distance, 4);
        assert_eq!(leg.path, (0..5).map(|x| c(x, 0)).collect::<Vec<_>>());
    }

    #[test]
    fn detours_around_shelf() {
        let g = grid(&["D.#..", "..#..", "....."]);
        let leg = ShortestPath::new().shortest_path(&g, c(0, 0), c(4, 0)).unwrap();
        assert_eq!(leg.distance, 8);
        assert_eq!(leg.path.len(), 9);
        assert!(leg.path.windows(2).all(|w| w[0].is_adjacent(w[1])));
        assert!(leg.path.iter().all(|&p| g.is_traversable(p)));
    }

    #[test]
    fn same_cell_is_zero_length() {
        let g = grid(&["D.."]);
        let leg = ShortestPath::new().shortest_path(&g, c(1, 0), c(1, 0)).unwrap();
        assert_eq!(leg.distance, 0);
        assert_eq!(leg.path, vec![c(1, 0)]);
    }

    #[test]
    fn walled_off_target_is_unreachable() {
        let g = grid(&["D.#.", "..#.", "..#."]);
        assert!(ShortestPath::new().shortest_path(&g, c(0, 0), c(3, 1)).is_none());
    }

    #[test]
    fn shelf_endpoint_is_unreachable() {
        let g = grid(&["D#."]);
        let mut sp = ShortestPath::new();
        assert!(sp.shortest_path(&g, c(0, 0), c(1, 0)).is_none());
        assert!(sp.shortest_path(&g, c(1, 0), c(0, 0)).is_none());
    }

    #[test]
    fn tie_break_prefers_smaller_delta_first() {
        // From (1,1) both (1,2) and (2,1) are one step closer to (2,2).
        // Delta (0,1) sorts before (1,0), so the walk moves along y first.
        let g = grid(&["D...", "....", "...."]);
        let leg = ShortestPath::new().shortest_path(&g, c(1, 1), c(2, 2)).unwrap();
        assert_eq!(leg.path, vec![c(1, 1), c(1, 2), c(2, 2)]);

        let back = ShortestPath::new().shortest_path(&g, c(2, 2), c(1, 1)).unwrap();
        assert_eq!(back.path, vec![c(2, 2), c(1, 2), c(1, 1)]);
    }

    #[test]
    fn buffers_are_reused_across_grids() {
        let mut sp = ShortestPath::new();
        let small = grid(&["D."]);
        assert_eq!(sp.shortest_path(&small, c(0, 0), c(1, 0)).unwrap().distance, 1);

        let wide: Vec<String> = (0..80)
            .map(|y| {
                (0..90)
                    .map(|x| if x == 0 && y == 0 { 'D' } else { '.' })
                    .collect()
            })
            .collect();
        let big = LayoutBuilder::from_rows(&wide).unwrap().build().unwrap();
        assert_eq!(
            sp.shortest_path(&big, c(0, 0), c(89, 79)).unwrap().distance,
            89 + 79
        );
        assert_eq!(sp.shortest_path(&small, c(1, 0), c(0, 0)).unwrap().distance, 1);
    }

    #[test]
    fn flood_reports_distances_and_non_traversable_source() {
        let g = grid(&["D.#", "..."]);
        let mut sp = ShortestPath::new();
        assert!(sp.flood(&g, c(0, 0)));
        assert_eq!(sp.distance(c(2, 1)), Some(3));
        assert_eq!(sp.distance(c(2, 0)), None);
        assert!(!sp.flood(&g, c(2, 0)));
        assert_eq!(sp.distance(c(0, 0)), None);
    }
}
