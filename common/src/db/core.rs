use crate::error::{LayoutError, Result, WarehouseError};
use crate::geom::coord::{GridCoord, STEPS};
use crate::geom::rect::GridRect;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CellType {
    Aisle,
    Shelf,
    Depot,
}

impl CellType {
    #[inline(always)]
    pub fn is_traversable(self) -> bool {
        !matches!(self, CellType::Shelf)
    }

    pub fn symbol(self) -> char {
        match self {
            CellType::Aisle => '.',
            CellType::Shelf => '#',
            CellType::Depot => 'D',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(CellType::Aisle),
            '#' => Some(CellType::Shelf),
            'D' | 'd' => Some(CellType::Depot),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bin {
    pub id: String,
    pub cell: GridCoord,
    pub sku_ids: BTreeSet<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BinResolution {
    pub resolved: Vec<(String, GridCoord)>,
    pub missing: Vec<String>,
}

impl BinResolution {
    pub fn get(&self, id: &str) -> Option<GridCoord> {
        self.resolved
            .iter()
            .find(|(bin, _)| bin == id)
            .map(|&(_, c)| c)
    }
}

#[derive(Clone, Debug)]
pub struct GridLayout {
    name: String,
    version: u64,
    width: u32,
    height: u32,
    cells: Vec<CellType>,
    depot: GridCoord,
    bins: Vec<Bin>,
    bin_name_map: HashMap<String, usize>,
}

impl GridLayout {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn version(&self) -> u64 {
        self.version
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn bounds(&self) -> GridRect {
        GridRect::from_size(self.width, self.height)
    }
    pub fn depot(&self) -> GridCoord {
        self.depot
    }
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    #[inline(always)]
    fn index(&self, coord: GridCoord) -> usize {
        (coord.y as usize) * (self.width as usize) + (coord.x as usize)
    }

    #[inline(always)]
    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    pub fn cell_type(&self, coord: GridCoord) -> Option<CellType> {
        if !self.in_bounds(coord) {
            return None;
        }
        Some(self.cells[self.index(coord)])
    }

    #[inline(always)]
    pub fn is_traversable(&self, coord: GridCoord) -> bool {
        self.in_bounds(coord) && self.cells[self.index(coord)].is_traversable()
    }

    #[inline(always)]
    pub fn neighbors_into(&self, coord: GridCoord, out: &mut [GridCoord; 4]) -> usize {
        let mut n = 0;
        for &(dx, dy) in &STEPS {
            if let Some(next) = coord.step(dx, dy, self.width, self.height)
                && self.cells[self.index(next)].is_traversable()
            {
                out[n] = next;
                n += 1;
            }
        }
        n
    }

    pub fn neighbors(&self, coord: GridCoord) -> Vec<GridCoord> {
        let mut buf = [GridCoord::new(0, 0); 4];
        let n = self.neighbors_into(coord, &mut buf);
        buf[..n].to_vec()
    }

    pub fn bin(&self, id: &str) -> Option<&Bin> {
        self.bin_name_map.get(id).map(|&i| &self.bins[i])
    }

    pub fn bin_cell(&self, id: &str) -> Result<GridCoord> {
        self.bin(id)
            .map(|b| b.cell)
            .ok_or_else(|| WarehouseError::UnresolvedBin(id.to_string()))
    }

    pub fn resolve_bins<S: AsRef<str>>(&self, ids: &[S]) -> BinResolution {
        let mut out = BinResolution::default();
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            if !seen.insert(id) {
                continue;
            }
            match self.bin(id) {
                Some(bin) => out.resolved.push((id.to_string(), bin.cell)),
                None => out.missing.push(id.to_string()),
            }
        }
        out
    }

    pub fn traversable_cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.bounds().cells().filter(|&c| self.is_traversable(c))
    }

    pub fn rows(&self) -> Vec<String> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| self.cells[self.index(GridCoord::new(x, y))].symbol())
                    .collect()
            })
            .collect()
    }
}

pub struct LayoutBuilder {
    name: String,
    version: u64,
    width: u32,
    height: u32,
    cells: Vec<CellType>,
    bins: Vec<Bin>,
}

impl LayoutBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            name: "warehouse".to_string(),
            version: 1,
            width,
            height,
            cells: vec![CellType::Aisle; (width as usize) * (height as usize)],
            bins: Vec::new(),
        }
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> std::result::Result<Self, LayoutError> {
        let height = rows.len() as u32;
        let width = rows
            .first()
            .map(|r| r.as_ref().chars().count() as u32)
            .unwrap_or(0);
        let mut builder = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() as u32 != width {
                return Err(LayoutError::Syntax {
                    line: y + 1,
                    msg: format!(
                        "row {} has {} cells, expected {}",
                        y,
                        row.chars().count(),
                        width
                    ),
                });
            }
            for (x, ch) in row.chars().enumerate() {
                let cell = CellType::from_symbol(ch).ok_or_else(|| LayoutError::Syntax {
                    line: y + 1,
                    msg: format!("unknown cell symbol '{}'", ch),
                })?;
                builder.set_cell(GridCoord::new(x as u32, y as u32), cell);
            }
        }
        Ok(builder)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn set_cell(&mut self, coord: GridCoord, cell: CellType) -> &mut Self {
        if coord.x < self.width && coord.y < self.height {
            let idx = (coord.y as usize) * (self.width as usize) + coord.x as usize;
            self.cells[idx] = cell;
        }
        self
    }

    pub fn add_bin<I, S>(&mut self, id: impl Into<String>, cell: GridCoord, skus: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bins.push(Bin {
            id: id.into(),
            cell,
            sku_ids: skus.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn build(self) -> std::result::Result<GridLayout, LayoutError> {
        if self.width == 0 || self.height == 0 {
            return Err(LayoutError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let expected = (self.width as usize) * (self.height as usize);
        if self.cells.len() != expected {
            return Err(LayoutError::CellCount {
                expected,
                actual: self.cells.len(),
            });
        }

        let depots: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == CellType::Depot)
            .map(|(i, _)| i)
            .collect();
        if depots.len() != 1 {
            return Err(LayoutError::DepotCount(depots.len()));
        }
        let depot = GridCoord::new(
            (depots[0] % self.width as usize) as u32,
            (depots[0] / self.width as usize) as u32,
        );

        let mut bin_name_map = HashMap::with_capacity(self.bins.len());
        let mut bin_cell_map: HashMap<GridCoord, usize> = HashMap::with_capacity(self.bins.len());
        for (i, bin) in self.bins.iter().enumerate() {
            if bin.cell.x >= self.width || bin.cell.y >= self.height {
                return Err(LayoutError::BinOutOfBounds {
                    bin: bin.id.clone(),
                    cell: bin.cell,
                });
            }
            let idx = (bin.cell.y as usize) * (self.width as usize) + bin.cell.x as usize;
            if !self.cells[idx].is_traversable() {
                return Err(LayoutError::BinOnShelf {
                    bin: bin.id.clone(),
                    cell: bin.cell,
                });
            }
            if bin_name_map.insert(bin.id.clone(), i).is_some() {
                return Err(LayoutError::DuplicateBin(bin.id.clone()));
            }
            if let Some(prev) = bin_cell_map.insert(bin.cell, i) {
                return Err(LayoutError::SharedBinCell {
                    first: self.bins[prev].id.clone(),
                    second: bin.id.clone(),
                    cell: bin.cell,
                });
            }
        }

        Ok(GridLayout {
            name: self.name,
            version: self.version,
            width: self.width,
            height: self.height,
            cells: self.cells,
            depot,
            bins: self.bins,
            bin_name_map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> GridLayout {
        let mut b = LayoutBuilder::from_rows(&["D...", ".##.", "...."]).unwrap();
        b.add_bin("A", GridCoord::new(0, 1), ["sku-1"]);
        b.add_bin("B", GridCoord::new(3, 1), ["sku-2", "sku-3"]);
        b.build().unwrap()
    }

    #[test]
    fn depot_and_traversability() {
        let layout = small();
        assert_eq!(layout.depot(), GridCoord::new(0, 0));
        assert!(layout.is_traversable(GridCoord::new(0, 0)));
        assert!(!layout.is_traversable(GridCoord::new(1, 1)));
        assert!(!layout.is_traversable(GridCoord::new(9, 0)));
    }

    #[test]
    fn neighbors_skip_shelves_and_edges() {
        let layout = small();
        assert_eq!(
            layout.neighbors(GridCoord::new(1, 0)),
            vec![GridCoord::new(0, 0), GridCoord::new(2, 0)]
        );
        assert_eq!(
            layout.neighbors(GridCoord::new(0, 1)),
            vec![GridCoord::new(0, 0), GridCoord::new(0, 2)]
        );
    }

    #[test]
    fn resolve_bins_reports_missing_and_dedups() {
        let layout = small();
        let res = layout.resolve_bins(&["B", "Z", "A", "B"]);
        assert_eq!(
            res.resolved,
            vec![
                ("B".to_string(), GridCoord::new(3, 1)),
                ("A".to_string(), GridCoord::new(0, 1))
            ]
        );
        assert_eq!(res.missing, vec!["Z".to_string()]);
        assert_eq!(res.get("A"), Some(GridCoord::new(0, 1)));
    }

    #[test]
    fn build_rejects_two_depots() {
        let b = LayoutBuilder::from_rows(&["D.D"]).unwrap();
        assert_eq!(b.build().unwrap_err(), LayoutError::DepotCount(2));
    }

    #[test]
    fn build_rejects_bin_on_shelf() {
        let mut b = LayoutBuilder::from_rows(&["D#."]).unwrap();
        b.add_bin("X", GridCoord::new(1, 0), Vec::<String>::new());
        assert!(matches!(
            b.build().unwrap_err(),
            LayoutError::BinOnShelf { .. }
        ));
    }

    #[test]
    fn build_rejects_duplicate_bin_ids() {
        let mut b = LayoutBuilder::from_rows(&["D.."]).unwrap();
        b.add_bin("X", GridCoord::new(1, 0), Vec::<String>::new());
        b.add_bin("X", GridCoord::new(2, 0), Vec::<String>::new());
        assert_eq!(
            b.build().unwrap_err(),
            LayoutError::DuplicateBin("X".to_string())
        );
    }

    #[test]
    fn traversable_cells_walks_floor_row_major() {
        let layout = small();
        let cells: Vec<GridCoord> = layout.traversable_cells().collect();
        assert_eq!(cells.len(), 10);
        assert_eq!(cells[0], GridCoord::new(0, 0));
        assert_eq!(cells[4], GridCoord::new(0, 1));
        assert_eq!(cells[5], GridCoord::new(3, 1));
        assert!(!cells.contains(&GridCoord::new(1, 1)));
    }

    #[test]
    fn rows_round_trip_symbols() {
        let layout = small();
        assert_eq!(layout.rows(), vec!["D...", ".##.", "...."]);
    }
}
