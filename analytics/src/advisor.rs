use crate::heatmap::aggregator::CellActivity;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use wh_common::db::core::{Bin, GridLayout};
use wh_common::geom::coord::GridCoord;
use wh_common::geom::rect::GridRect;
use wh_common::geom::rtree::SpatialIndex;
use wh_common::util::config::AdvisorConfig;
use wh_common::util::profiler::ScopedTimer;
use wh_router::ShortestPath;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Reason {
    #[serde(rename_all = "camelCase")]
    HighTrafficFarFromDepot { score: f64, depot_distance: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub bounds: GridRect,
    pub max_depot_distance: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub bin_id: String,
    pub reason: Reason,
    pub suggested_zone: Zone,
    pub swap_candidate: Option<String>,
}

impl Suggestion {
    pub fn score(&self) -> f64 {
        match self.reason {
            Reason::HighTrafficFarFromDepot { score, .. } => score,
        }
    }
}

struct Placed<'a> {
    bin: &'a Bin,
    depot_distance: u32,
    score: f64,
}

fn quantile(sorted: &[u32], q: f64) -> Option<u32> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = (q.clamp(0.0, 1.0) * n as f64).ceil() as usize;
    Some(sorted[rank.clamp(1, n) - 1])
}

pub fn suggest_rebalancing(
    layout: &GridLayout,
    heatmap: &[CellActivity],
    bins: &[Bin],
    config: &AdvisorConfig,
) -> Vec<Suggestion> {
    let _t = ScopedTimer::new("suggest_rebalancing");

    let depot = layout.depot();
    let mut solver = ShortestPath::new();
    solver.flood(layout, depot);

    let scores: HashMap<GridCoord, f64> = heatmap.iter().map(|a| (a.coord, a.score)).collect();

    let placed: Vec<Placed> = bins
        .iter()
        .filter_map(|bin| {
            let depot_distance = solver.distance(bin.cell)?;
            Some(Placed {
                bin,
                depot_distance,
                score: scores.get(&bin.cell).copied().unwrap_or(0.0),
            })
        })
        .collect();
    if placed.is_empty() {
        return Vec::new();
    }

    let mut distances: Vec<u32> = placed.iter().map(|p| p.depot_distance).collect();
    distances.sort_unstable();
    let (Some(far_cut), Some(zone_cut)) = (
        quantile(&distances, config.far_quantile),
        quantile(&distances, config.zone_quantile),
    ) else {
        return Vec::new();
    };

    // Hot: top share of the bins that saw any activity.
    let mut scored: Vec<&Placed> = placed.iter().filter(|p| p.score > 0.0).collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.bin.id.cmp(&b.bin.id)));
    let hot_count = if config.hot_fraction > 0.0 {
        ((scored.len() as f64 * config.hot_fraction).ceil() as usize).min(scored.len())
    } else {
        0
    };
    let hot: HashSet<&str> = scored[..hot_count].iter().map(|p| p.bin.id.as_str()).collect();

    let zone_cells = placed
        .iter()
        .filter(|p| p.depot_distance <= zone_cut)
        .map(|p| p.bin.cell);
    let Some(zone_bounds) = GridRect::bounding(zone_cells) else {
        return Vec::new();
    };
    let zone = Zone {
        bounds: zone_bounds,
        max_depot_distance: zone_cut,
    };

    let by_id: HashMap<&str, &Placed> = placed.iter().map(|p| (p.bin.id.as_str(), p)).collect();
    let index = SpatialIndex::bulk_load(placed.iter().map(|p| (p.bin.cell, p.bin.id.as_str())));
    let mut in_zone: Vec<&Placed> = index
        .query(zone.bounds)
        .into_iter()
        .filter_map(|id| by_id.get(id).copied())
        .filter(|p| p.depot_distance <= zone_cut && !hot.contains(p.bin.id.as_str()))
        .collect();
    // Coldest first, nearest to the depot on ties.
    in_zone.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then(a.depot_distance.cmp(&b.depot_distance))
            .then_with(|| a.bin.id.cmp(&b.bin.id))
    });
    let mut swaps = in_zone.into_iter();

    let mut suggestions: Vec<Suggestion> = scored[..hot_count]
        .iter()
        .filter(|p| p.depot_distance > far_cut)
        .map(|p| Suggestion {
            bin_id: p.bin.id.clone(),
            reason: Reason::HighTrafficFarFromDepot {
                score: p.score,
                depot_distance: p.depot_distance,
            },
            suggested_zone: zone.clone(),
            swap_candidate: swaps.next().map(|s| s.bin.id.clone()),
        })
        .collect();
    suggestions.sort_by(|a, b| {
        b.score()
            .total_cmp(&a.score())
            .then_with(|| a.bin_id.cmp(&b.bin_id))
    });

    log::info!(
        "{} of {} hot bins are farther than {} steps from the depot",
        suggestions.len(),
        hot_count,
        far_cut
    );
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use wh_common::db::core::LayoutBuilder;
    use wh_common::util::clock::Timestamp;

    fn c(x: u32, y: u32) -> GridCoord {
        GridCoord::new(x, y)
    }

    // One long aisle with ten bins at x = 1..=10.
    fn corridor() -> GridLayout {
        let row: String = std::iter::once('D').chain(std::iter::repeat_n('.', 10)).collect();
        let mut b = LayoutBuilder::from_rows(&[row]).unwrap();
        for x in 1..=10 {
            b.add_bin(format!("B{:02}", x), c(x, 0), [format!("S{}", x)]);
        }
        b.build().unwrap()
    }

    fn activity(cells: &[(u32, f64)]) -> Vec<CellActivity> {
        cells
            .iter()
            .map(|&(x, score)| CellActivity {
                coord: c(x, 0),
                score,
                last_updated: Timestamp(0),
            })
            .collect()
    }

    #[test]
    fn quantile_nearest_rank() {
        let v = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(quantile(&v, 0.5), Some(5));
        assert_eq!(quantile(&v, 0.25), Some(3));
        assert_eq!(quantile(&v, 0.0), Some(1));
        assert_eq!(quantile(&v, 1.0), Some(10));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn busy_far_bin_is_flagged_with_cold_swap() {
        let layout = corridor();
        let heat = activity(&[(9, 50.0), (2, 1.0), (1, 3.0), (4, 2.0)]);
        let out = suggest_rebalancing(&layout, &heat, layout.bins(), &AdvisorConfig::default());

        assert_eq!(out.len(), 1);
        let s = &out[0];
        assert_eq!(s.bin_id, "B09");
        assert_eq!(
            s.reason,
            Reason::HighTrafficFarFromDepot {
                score: 50.0,
                depot_distance: 9
            }
        );
        assert_eq!(s.suggested_zone.max_depot_distance, 3);
        assert_eq!(s.suggested_zone.bounds, GridRect::new(1, 0, 3, 0));
        // B03 never saw a pick, so it is the coldest bin in the zone.
        assert_eq!(s.swap_candidate.as_deref(), Some("B03"));
    }

    #[test]
    fn busy_bin_near_depot_is_left_alone() {
        let layout = corridor();
        let heat = activity(&[(1, 80.0), (8, 1.0)]);
        let out = suggest_rebalancing(&layout, &heat, layout.bins(), &AdvisorConfig::default());
        assert!(out.is_empty());
    }

    #[test]
    fn swap_candidates_are_not_reused() {
        let layout = corridor();
        let heat = activity(&[(10, 9.0), (9, 8.0), (8, 7.0), (1, 0.5), (2, 0.5), (3, 0.5)]);
        let config = AdvisorConfig {
            hot_fraction: 0.5,
            ..AdvisorConfig::default()
        };
        let out = suggest_rebalancing(&layout, &heat, layout.bins(), &config);
        let ids: Vec<&str> = out.iter().map(|s| s.bin_id.as_str()).collect();
        assert_eq!(ids, vec!["B10", "B09", "B08"]);
        let swaps: Vec<Option<&str>> = out.iter().map(|s| s.swap_candidate.as_deref()).collect();
        assert_eq!(swaps, vec![Some("B01"), Some("B02"), Some("B03")]);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        let layout = corridor();
        assert!(suggest_rebalancing(&layout, &[], layout.bins(), &AdvisorConfig::default()).is_empty());
        assert!(suggest_rebalancing(&layout, &activity(&[(9, 1.0)]), &[], &AdvisorConfig::default())
            .is_empty());
    }
}
