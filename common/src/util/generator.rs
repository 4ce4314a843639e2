use crate::db::core::{CellType, GridLayout, LayoutBuilder};
use crate::db::parser::events::VisitEvent;
use crate::error::LayoutError;
use crate::geom::coord::GridCoord;
use crate::util::clock::Timestamp;
use rand::Rng;
use rand::seq::SliceRandom;
use rand::distributions::{Distribution, WeightedIndex};

pub fn generate_layout<R: Rng>(
    rng: &mut R,
    width: u32,
    height: u32,
    cross_aisle_every: u32,
    bin_density: f64,
) -> Result<GridLayout, LayoutError> {
    let width = width.max(4);
    let height = height.max(3);
    let cross = cross_aisle_every.max(2);
    let density = bin_density.clamp(0.0, 1.0);

    log::info!(
        "Generating layout: {}x{}, cross aisle every {} rows, bin density {:.0}%",
        width,
        height,
        cross,
        density * 100.0
    );

    let mut builder = LayoutBuilder::new(width, height).name(format!("generated-{}x{}", width, height));
    let is_cross_row = |y: u32| y == 0 || y == height - 1 || y % cross == 0;
    let is_shelf = |x: u32, y: u32| x % 3 != 0 && x < width - 1 && !is_cross_row(y);

    for y in 0..height {
        for x in 0..width {
            if is_shelf(x, y) {
                builder.set_cell(GridCoord::new(x, y), CellType::Shelf);
            }
        }
    }
    builder.set_cell(GridCoord::new(0, 0), CellType::Depot);

    let mut sku_counter = 0u32;
    let mut bin_counter = 0u32;
    for y in 0..height {
        for x in 0..width {
            if is_shelf(x, y) || (x == 0 && y == 0) || is_cross_row(y) {
                continue;
            }
            let faces_shelf = (x > 0 && is_shelf(x - 1, y)) || is_shelf(x + 1, y);
            if !faces_shelf || !rng.gen_bool(density) {
                continue;
            }
            bin_counter += 1;
            let num_skus = rng.gen_range(1..=3);
            let skus: Vec<String> = (0..num_skus)
                .map(|_| {
                    sku_counter += 1;
                    format!("SKU-{:05}", sku_counter)
                })
                .collect();
            builder.add_bin(format!("B{:04}", bin_counter), GridCoord::new(x, y), skus);
        }
    }

    builder.build()
}

// Popularity follows 1 / rank over a shuffled bin order.
pub fn generate_events<R: Rng>(
    rng: &mut R,
    layout: &GridLayout,
    count: usize,
    start: Timestamp,
    span_ms: u64,
) -> Vec<VisitEvent> {
    if layout.bins().is_empty() || count == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<usize> = (0..layout.num_bins()).collect();
    ranked.shuffle(rng);
    let weights: Vec<f64> = (1..=ranked.len()).map(|r| 1.0 / r as f64).collect();
    let dist = match WeightedIndex::new(&weights) {
        Ok(d) => d,
        Err(e) => {
            log::error!("Cannot build visit distribution: {}", e);
            return Vec::new();
        }
    };

    let mut offsets: Vec<u64> = (0..count).map(|_| rng.gen_range(0..=span_ms)).collect();
    offsets.sort_unstable();

    offsets
        .into_iter()
        .map(|off| {
            let bin = &layout.bins()[ranked[dist.sample(&mut *rng)]];
            VisitEvent {
                at: Timestamp(start.millis() + off),
                bin_id: bin.id.clone(),
                weight: 1.0,
            }
        })
        .collect()
}
