use super::coord::GridCoord;
use super::rect::GridRect;
use rstar::{AABB, RTree, RTreeObject};

pub struct SpatialIndex<T> {
    tree: RTree<IndexedCell<T>>,
}

struct IndexedCell<T> {
    point: [i64; 2],
    id: T,
}

impl<T> RTreeObject for IndexedCell<T> {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

fn to_point(c: GridCoord) -> [i64; 2] {
    [c.x as i64, c.y as i64]
}

impl<T: Clone> SpatialIndex<T> {
    pub fn bulk_load(items: impl IntoIterator<Item = (GridCoord, T)>) -> Self {
        let cells = items
            .into_iter()
            .map(|(c, id)| IndexedCell {
                point: to_point(c),
                id,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(cells),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn query(&self, rect: GridRect) -> Vec<T> {
        let aabb = AABB::from_corners(
            [rect.min_x as i64, rect.min_y as i64],
            [rect.max_x as i64, rect.max_y as i64],
        );
        self.tree
            .locate_in_envelope(&aabb)
            .map(|item| item.id.clone())
            .collect()
    }
}
