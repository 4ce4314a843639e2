use wh_common::db::core::GridLayout;
use wh_common::geom::coord::GridCoord;

pub trait TraversableGrid: Sync + Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn is_traversable(&self, coord: GridCoord) -> bool;

    fn neighbors_into(&self, coord: GridCoord, out: &mut [GridCoord; 4]) -> usize;
}

impl TraversableGrid for GridLayout {
    fn width(&self) -> u32 {
        GridLayout::width(self)
    }
    fn height(&self) -> u32 {
        GridLayout::height(self)
    }

    #[inline(always)]
    fn is_traversable(&self, coord: GridCoord) -> bool {
        GridLayout::is_traversable(self, coord)
    }

    #[inline(always)]
    fn neighbors_into(&self, coord: GridCoord, out: &mut [GridCoord; 4]) -> usize {
        GridLayout::neighbors_into(self, coord, out)
    }
}
