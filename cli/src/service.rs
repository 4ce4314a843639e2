use std::sync::Arc;
use wh_analytics::{CellActivity, Heatmap, Suggestion, Sweeper};
use wh_common::db::core::GridLayout;
use wh_common::db::parser::events::VisitEvent;
use wh_common::db::store::LayoutStore;
use wh_common::error::{Result, WarehouseError};
use wh_common::geom::coord::GridCoord;
use wh_common::geom::rect::GridRect;
use wh_common::util::check;
use wh_common::util::clock::Timestamp;
use wh_common::util::config::Config;
use wh_router::{PathLeg, RouteRequest, RouteResult, ShortestPath, parse_path_request, plan_route};

pub struct Warehouse {
    store: LayoutStore,
    heatmap: Arc<Heatmap>,
    config: Config,
}

impl Warehouse {
    pub fn new(config: Config) -> Self {
        Self {
            store: LayoutStore::new(),
            heatmap: Arc::new(Heatmap::from_config(&config.heatmap)),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> Result<Arc<GridLayout>> {
        self.store.snapshot()
    }

    pub fn publish_layout(&self, layout: GridLayout) -> Arc<GridLayout> {
        let report = check::verify_layout(&layout);
        for id in &report.isolated_bins {
            log::warn!("Bin '{}' cannot be reached from the depot", id);
        }
        for id in &report.detached_bins {
            log::warn!("Bin '{}' does not face any shelf", id);
        }
        let layout = self.store.publish(layout);
        self.heatmap.set_bounds(layout.bounds());
        layout
    }

    pub fn plan_path(&self, body: &str) -> Result<RouteResult> {
        let request = parse_path_request(body)?;
        self.plan(&request)
    }

    pub fn plan(&self, request: &RouteRequest) -> Result<RouteResult> {
        let layout = self.layout()?;
        plan_route(&layout, request, &self.config.routing)
    }

    pub fn shortest_path(&self, from: GridCoord, to: GridCoord) -> Result<PathLeg> {
        let layout = self.layout()?;
        ShortestPath::new()
            .shortest_path(layout.as_ref(), from, to)
            .ok_or(WarehouseError::Unreachable { from, to })
    }

    pub fn query_heatmap(&self, bounds: Option<GridRect>, now: Timestamp) -> Result<Vec<CellActivity>> {
        self.layout()?;
        Ok(self.heatmap.query(bounds, now))
    }

    // Unknown bins are dropped; only a missing layout is an error.
    pub fn record_visit_event(&self, event: &VisitEvent) -> Result<bool> {
        let layout = self.layout()?;
        Ok(self
            .heatmap
            .record_bin_visit(&layout, &event.bin_id, event.weight, event.at))
    }

    pub fn replay(&self, events: &[VisitEvent]) -> Result<usize> {
        let layout = self.layout()?;
        Ok(self.heatmap.record_events(&layout, events))
    }

    pub fn suggest_rebalancing(&self, now: Timestamp) -> Result<Vec<Suggestion>> {
        let layout = self.layout()?;
        let activity = self.heatmap.query(None, now);
        Ok(wh_analytics::suggest_rebalancing(
            &layout,
            &activity,
            layout.bins(),
            &self.config.advisor,
        ))
    }

    pub fn start_sweeper<F>(&self, clock: F) -> std::io::Result<Sweeper>
    where
        F: Fn() -> Timestamp + Send + 'static,
    {
        Sweeper::spawn(
            Arc::clone(&self.heatmap),
            self.config.heatmap.sweep_interval(),
            clock,
        )
    }
}
