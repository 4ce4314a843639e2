use crate::algo::bfs::ShortestPath;
use crate::algo::tour::{self, Distances};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use wh_common::db::core::GridLayout;
use wh_common::error::{Result, WarehouseError};
use wh_common::geom::coord::GridCoord;
use wh_common::util::clock::Timestamp;
use wh_common::util::config::RoutingConfig;
use wh_common::util::profiler::ScopedTimer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRequest {
    // Overrides the layout depot when set.
    pub depot: Option<GridCoord>,
    pub target_bin_ids: Vec<String>,
    pub requested_at: Timestamp,
}

impl RouteRequest {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let target_bin_ids = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| seen.insert(id.clone()))
            .collect();
        Self {
            depot: None,
            target_bin_ids,
            requested_at: Timestamp::now(),
        }
    }

    pub fn with_depot(mut self, depot: GridCoord) -> Self {
        self.depot = Some(depot);
        self
    }

    pub fn at(mut self, ts: Timestamp) -> Self {
        self.requested_at = ts;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    // Effective depot, after any override.
    pub depot: GridCoord,
    pub ordered_bins: Vec<String>,
    pub path: Vec<GridCoord>,
    pub total_distance: u64,
    pub unreachable_bins: Vec<String>,
    pub layout_version: u64,
}

pub struct DistanceMatrix {
    nodes: Vec<GridCoord>,
    dist: Vec<u64>,
}

impl Distances for DistanceMatrix {
    fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    fn get(&self, a: usize, b: usize) -> u64 {
        self.dist[a * self.nodes.len() + b]
    }
}

impl DistanceMatrix {
    // Callers filter unreachable bins beforehand.
    pub fn build(layout: &GridLayout, nodes: Vec<GridCoord>, parallel_threshold: usize) -> Self {
        let n = nodes.len();
        let row = |solver: &mut ShortestPath, i: usize| -> Vec<u64> {
            solver.flood(layout, nodes[i]);
            nodes
                .iter()
                .map(|&c| solver.distance(c).map(u64::from).unwrap_or(u64::MAX))
                .collect()
        };

        let rows: Vec<Vec<u64>> = if n >= parallel_threshold.max(2) {
            (0..n)
                .into_par_iter()
                .map_with(ShortestPath::new(), |solver, i| row(solver, i))
                .collect()
        } else {
            let mut solver = ShortestPath::new();
            (0..n).map(|i| row(&mut solver, i)).collect()
        };

        Self {
            nodes,
            dist: rows.into_iter().flatten().collect(),
        }
    }

    pub fn node(&self, i: usize) -> GridCoord {
        self.nodes[i]
    }
}

// Only a bad depot override is a hard error.
pub fn plan_route(
    layout: &GridLayout,
    request: &RouteRequest,
    config: &RoutingConfig,
) -> Result<RouteResult> {
    let _t = ScopedTimer::new("plan_route");

    let depot = request.depot.unwrap_or_else(|| layout.depot());
    if !layout.is_traversable(depot) {
        return Err(WarehouseError::InvalidInput(format!(
            "depot {} is not a traversable cell of layout v{}",
            depot,
            layout.version()
        )));
    }

    let resolution = layout.resolve_bins(&request.target_bin_ids);

    // Reachability from the depot decides which bins stay in the plan. The
    // grid is undirected, so bins reachable from the depot reach each other.
    let mut solver = ShortestPath::new();
    solver.flood(layout, depot);
    let mut bins: Vec<(String, GridCoord)> = Vec::with_capacity(resolution.resolved.len());
    let mut unreachable: HashSet<String> = resolution.missing.iter().cloned().collect();
    for (id, cell) in resolution.resolved {
        if solver.distance(cell).is_some() {
            bins.push((id, cell));
        } else {
            log::debug!("Bin '{}' at {} is unreachable from depot {}", id, cell, depot);
            unreachable.insert(id);
        }
    }

    // Report in request order.
    let mut unreachable_bins = Vec::with_capacity(unreachable.len());
    for id in &request.target_bin_ids {
        if unreachable.remove(id) {
            unreachable_bins.push(id.clone());
        }
    }

    if !unreachable_bins.is_empty() {
        log::warn!(
            "Skipping {} of {} requested bins: {:?}",
            unreachable_bins.len(),
            request.target_bin_ids.len(),
            unreachable_bins
        );
    }

    if request.target_bin_ids.is_empty() {
        return Ok(RouteResult {
            depot,
            ordered_bins: Vec::new(),
            path: vec![depot],
            total_distance: 0,
            unreachable_bins,
            layout_version: layout.version(),
        });
    }
    if bins.is_empty() {
        return Ok(RouteResult {
            depot,
            ordered_bins: Vec::new(),
            path: Vec::new(),
            total_distance: 0,
            unreachable_bins,
            layout_version: layout.version(),
        });
    }

    let mut nodes = Vec::with_capacity(bins.len() + 1);
    nodes.push(depot);
    nodes.extend(bins.iter().map(|(_, c)| *c));
    let matrix = DistanceMatrix::build(layout, nodes, config.parallel_threshold);

    let order = if bins.len() == 1 {
        vec![1]
    } else {
        let mut order = tour::nearest_neighbor(&matrix);
        let seed_cost = tour::tour_cost(&matrix, &order);
        let moves = tour::two_opt(&matrix, &mut order, config.two_opt_max_passes);
        log::debug!(
            "Tour over {} bins: nearest-neighbour {} -> 2-opt {} ({} moves)",
            bins.len(),
            seed_cost,
            tour::tour_cost(&matrix, &order),
            moves
        );
        order
    };

    let mut stops = Vec::with_capacity(order.len() + 2);
    stops.push(depot);
    stops.extend(order.iter().map(|&i| matrix.node(i)));
    stops.push(depot);
    let path = stitch(layout, &mut solver, &stops)?;

    let total_distance = tour::tour_cost(&matrix, &order);
    debug_assert_eq!(path.len() as u64, total_distance + 1);

    Ok(RouteResult {
        depot,
        ordered_bins: order.iter().map(|&i| bins[i - 1].0.clone()).collect(),
        path,
        total_distance,
        unreachable_bins,
        layout_version: layout.version(),
    })
}

fn stitch(
    layout: &GridLayout,
    solver: &mut ShortestPath,
    stops: &[GridCoord],
) -> Result<Vec<GridCoord>> {
    let mut full_path: Vec<GridCoord> = Vec::new();
    for w in stops.windows(2) {
        let leg = solver
            .shortest_path(layout, w[0], w[1])
            .ok_or(WarehouseError::Unreachable {
                from: w[0],
                to: w[1],
            })?;
        if full_path.is_empty() {
            full_path.extend(leg.path);
        } else {
            full_path.extend(leg.path.into_iter().skip(1));
        }
    }
    Ok(full_path)
}

pub fn plan_batch(
    layout: &GridLayout,
    requests: &[RouteRequest],
    config: &RoutingConfig,
) -> Vec<Result<RouteResult>> {
    log::info!("Planning {} routes on layout v{}", requests.len(), layout.version());
    requests
        .par_iter()
        .map(|req| plan_route(layout, req, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wh_common::db::core::LayoutBuilder;
    use wh_common::util::check::verify_route;

    fn c(x: u32, y: u32) -> GridCoord {
        GridCoord::new(x, y)
    }

    fn layout() -> GridLayout {
        let mut b = LayoutBuilder::from_rows(&["D.....", ".##.#.", ".##.#.", "......"]).unwrap();
        b.add_bin("A", c(0, 2), ["s1"]);
        b.add_bin("B", c(3, 1), ["s2"]);
        b.add_bin("C", c(5, 2), ["s3"]);
        b.build().unwrap()
    }

    #[test]
    fn request_dedups_in_order() {
        let req = RouteRequest::new(["B", "A", "B", "C", "A"]);
        assert_eq!(req.target_bin_ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn empty_request_stays_at_depot() {
        let l = layout();
        let res = plan_route(&l, &RouteRequest::new(Vec::<String>::new()), &RoutingConfig::default())
            .unwrap();
        assert_eq!(res.path, vec![l.depot()]);
        assert_eq!(res.total_distance, 0);
        assert!(res.ordered_bins.is_empty());
    }

    #[test]
    fn single_bin_is_out_and_back() {
        let l = layout();
        let res = plan_route(&l, &RouteRequest::new(["B"]), &RoutingConfig::default()).unwrap();
        assert_eq!(res.ordered_bins, vec!["B"]);
        assert_eq!(res.total_distance, 8);
        verify_route(&l, l.depot(), &res.path, &[c(3, 1)], res.total_distance).unwrap();
    }

    #[test]
    fn unknown_bins_are_reported_not_fatal() {
        let l = layout();
        let res = plan_route(&l, &RouteRequest::new(["nope", "A"]), &RoutingConfig::default())
            .unwrap();
        assert_eq!(res.unreachable_bins, vec!["nope"]);
        assert_eq!(res.ordered_bins, vec!["A"]);
    }

    #[test]
    fn all_unknown_gives_empty_path() {
        let l = layout();
        let res = plan_route(&l, &RouteRequest::new(["x", "y"]), &RoutingConfig::default()).unwrap();
        assert!(res.path.is_empty());
        assert_eq!(res.total_distance, 0);
        assert_eq!(res.unreachable_bins, vec!["x", "y"]);
    }

    #[test]
    fn shelf_depot_override_is_invalid_input() {
        let l = layout();
        let req = RouteRequest::new(["A"]).with_depot(c(1, 1));
        assert!(matches!(
            plan_route(&l, &req, &RoutingConfig::default()),
            Err(WarehouseError::InvalidInput(_))
        ));
    }

    #[test]
    fn depot_override_moves_both_ends() {
        let l = layout();
        let req = RouteRequest::new(["C"]).with_depot(c(5, 3));
        let res = plan_route(&l, &req, &RoutingConfig::default()).unwrap();
        assert_eq!(res.path.first(), Some(&c(5, 3)));
        assert_eq!(res.path.last(), Some(&c(5, 3)));
        assert_eq!(res.total_distance, 2);
        assert_eq!(res.depot, c(5, 3));
        verify_route(&l, res.depot, &res.path, &[c(5, 2)], res.total_distance).unwrap();
    }

    #[test]
    fn matrix_is_symmetric_and_parallel_build_matches() {
        let l = layout();
        let nodes = vec![l.depot(), c(0, 2), c(3, 1), c(5, 2)];
        let seq = DistanceMatrix::build(&l, nodes.clone(), usize::MAX);
        let par = DistanceMatrix::build(&l, nodes, 2);
        for a in 0..seq.len() {
            for b in 0..seq.len() {
                assert_eq!(seq.get(a, b), seq.get(b, a));
                assert_eq!(seq.get(a, b), par.get(a, b));
            }
            assert_eq!(seq.get(a, a), 0);
        }
    }

    #[test]
    fn batch_plans_each_request() {
        let l = layout();
        let reqs = vec![
            RouteRequest::new(["A", "C"]),
            RouteRequest::new(["B"]),
            RouteRequest::new(["zzz"]),
        ];
        let results = plan_batch(&l, &reqs, &RoutingConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().ordered_bins.len(), 2);
        assert_eq!(results[2].as_ref().unwrap().unreachable_bins, vec!["zzz"]);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let l = layout();
        let res = plan_route(&l, &RouteRequest::new(["A"]), &RoutingConfig::default()).unwrap();
        let json = serde_json::to_value(&res).unwrap();
        assert!(json.get("orderedBins").is_some());
        assert!(json.get("totalDistance").is_some());
        assert!(json.get("unreachableBins").is_some());
        assert_eq!(json["path"][0], serde_json::json!({"x": 0, "y": 0}));
    }
}
