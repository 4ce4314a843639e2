use crate::db::core::{CellType, GridLayout};
use crate::geom::coord::GridCoord;
use rayon::prelude::*;
use std::collections::VecDeque;

pub fn verify_route(
    layout: &GridLayout,
    depot: GridCoord,
    path: &[GridCoord],
    stops: &[GridCoord],
    total_distance: u64,
) -> Result<(), String> {
    if path.is_empty() {
        if stops.is_empty() && total_distance == 0 {
            return Ok(());
        }
        return Err(format!(
            "empty path but {} stops and distance {}",
            stops.len(),
            total_distance
        ));
    }

    let (walk, coverage) = rayon::join(
        || check_walk(layout, depot, path, total_distance),
        || check_stops(path, stops),
    );

    let msgs: Vec<String> = [walk, coverage].into_iter().filter_map(|r| r.err()).collect();
    if msgs.is_empty() {
        Ok(())
    } else {
        for m in &msgs {
            log::error!("FAIL: {}", m);
        }
        Err(msgs.join("; "))
    }
}

fn check_walk(
    layout: &GridLayout,
    depot: GridCoord,
    path: &[GridCoord],
    total_distance: u64,
) -> Result<(), String> {
    if path[0] != depot {
        return Err(format!("route starts at {} instead of depot {}", path[0], depot));
    }
    if path[path.len() - 1] != depot {
        return Err(format!(
            "route ends at {} instead of depot {}",
            path[path.len() - 1],
            depot
        ));
    }
    if let Some(c) = path.iter().find(|&&c| !layout.is_traversable(c)) {
        return Err(format!("route crosses non-traversable cell {}", c));
    }
    if let Some(w) = path.windows(2).find(|w| !w[0].is_adjacent(w[1])) {
        return Err(format!("route jumps from {} to {}", w[0], w[1]));
    }
    let steps = (path.len() - 1) as u64;
    if steps != total_distance {
        return Err(format!(
            "route has {} steps but reports distance {}",
            steps, total_distance
        ));
    }
    Ok(())
}

fn check_stops(path: &[GridCoord], stops: &[GridCoord]) -> Result<(), String> {
    // Stops must appear in order along the walk.
    let mut cursor = 0;
    for &stop in stops {
        match path[cursor..].iter().position(|&c| c == stop) {
            Some(offset) => cursor += offset,
            None => return Err(format!("stop {} not visited in order", stop)),
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct LayoutReport {
    pub isolated_bins: Vec<String>,
    pub detached_bins: Vec<String>,
    pub traversable_cells: usize,
    pub reachable_cells: usize,
}

impl LayoutReport {
    pub fn is_clean(&self) -> bool {
        self.isolated_bins.is_empty() && self.detached_bins.is_empty()
    }
}

pub fn verify_layout(layout: &GridLayout) -> LayoutReport {
    log::info!(
        "Verifying layout '{}' v{}",
        layout.name(),
        layout.version()
    );

    let reachable = flood_from_depot(layout);
    let width = layout.width() as usize;
    let idx = |c: GridCoord| c.y as usize * width + c.x as usize;

    let isolated_bins: Vec<String> = layout
        .bins()
        .par_iter()
        .filter(|b| !reachable[idx(b.cell)])
        .map(|b| b.id.clone())
        .collect();

    let detached_bins: Vec<String> = layout
        .bins()
        .par_iter()
        .filter(|b| {
            !crate::geom::coord::STEPS.iter().any(|&(dx, dy)| {
                b.cell
                    .step(dx, dy, layout.width(), layout.height())
                    .and_then(|n| layout.cell_type(n))
                    == Some(CellType::Shelf)
            })
        })
        .map(|b| b.id.clone())
        .collect();

    let report = LayoutReport {
        isolated_bins,
        detached_bins,
        traversable_cells: layout.traversable_cells().count(),
        reachable_cells: reachable.iter().filter(|&&r| r).count(),
    };

    if report.is_clean() {
        log::info!("PASS: every bin faces a shelf and is reachable from the depot.");
    } else {
        for id in &report.isolated_bins {
            log::warn!("Bin '{}' is not reachable from the depot", id);
        }
        for id in &report.detached_bins {
            log::warn!("Bin '{}' does not face any shelf", id);
        }
    }
    if report.reachable_cells < report.traversable_cells {
        log::warn!(
            "{} of {} traversable cells are disconnected from the depot",
            report.traversable_cells - report.reachable_cells,
            report.traversable_cells
        );
    }
    report
}

fn flood_from_depot(layout: &GridLayout) -> Vec<bool> {
    let width = layout.width() as usize;
    let mut seen = vec![false; width * layout.height() as usize];
    let mut queue = VecDeque::new();
    let depot = layout.depot();
    seen[depot.y as usize * width + depot.x as usize] = true;
    queue.push_back(depot);

    let mut buf = [GridCoord::new(0, 0); 4];
    while let Some(c) = queue.pop_front() {
        let n = layout.neighbors_into(c, &mut buf);
        for &next in &buf[..n] {
            let i = next.y as usize * width + next.x as usize;
            if !seen[i] {
                seen[i] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}
