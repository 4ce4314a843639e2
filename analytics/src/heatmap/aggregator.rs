use super::decay::DecayModel;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use wh_common::db::core::GridLayout;
use wh_common::db::parser::events::VisitEvent;
use wh_common::geom::coord::GridCoord;
use wh_common::geom::rect::GridRect;
use wh_common::util::clock::Timestamp;
use wh_common::util::config::HeatmapConfig;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellActivity {
    #[serde(flatten)]
    pub coord: GridCoord,
    pub score: f64,
    pub last_updated: Timestamp,
}

#[derive(Clone, Copy, Debug)]
struct CellState {
    score: f64,
    last_updated: Timestamp,
}

impl CellState {
    // Older events are decayed forward to `last_updated`; arrival order does not matter.
    fn absorb(&mut self, decay: &DecayModel, weight: f64, at: Timestamp) {
        if at >= self.last_updated {
            self.score = decay.decay(self.score, at.millis_since(self.last_updated)) + weight;
            self.last_updated = at;
        } else {
            self.score += decay.decay(weight, self.last_updated.millis_since(at));
        }
    }

    fn score_at(&self, decay: &DecayModel, now: Timestamp) -> f64 {
        decay.decay(self.score, now.millis_since(self.last_updated))
    }
}

pub struct Heatmap {
    cells: DashMap<GridCoord, CellState>,
    bounds: RwLock<Option<GridRect>>,
    decay: DecayModel,
    epsilon: f64,
}

impl Heatmap {
    pub fn new(decay: DecayModel, epsilon: f64) -> Self {
        Self {
            cells: DashMap::new(),
            bounds: RwLock::new(None),
            decay,
            epsilon: epsilon.max(0.0),
        }
    }

    pub fn from_config(config: &HeatmapConfig) -> Self {
        Self::new(
            DecayModel::from_half_life(config.half_life()),
            config.eviction_epsilon,
        )
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn set_bounds(&self, bounds: GridRect) {
        // Writers hold the read side across their insert, so none can land
        // between the swap and the retain.
        let mut guard = self.bounds.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(bounds);
        let before = self.cells.len();
        self.cells.retain(|c, _| bounds.contains(*c));
        let dropped = before.saturating_sub(self.cells.len());
        drop(guard);
        if dropped > 0 {
            log::info!(
                "Heatmap bounds now {}x{}; discarded {} cells outside",
                bounds.width(),
                bounds.height(),
                dropped
            );
        }
    }

    pub fn record_visit(&self, coord: GridCoord, weight: f64, at: Timestamp) -> bool {
        if !weight.is_finite() || weight < 0.0 {
            log::warn!("Dropping visit at {} with invalid weight {}", coord, weight);
            return false;
        }
        let bounds = self.bounds.read().unwrap_or_else(|e| e.into_inner());
        if let Some(b) = *bounds
            && !b.contains(coord)
        {
            log::warn!("Dropping visit at {}: outside floor bounds", coord);
            return false;
        }

        match self.cells.entry(coord) {
            Entry::Occupied(mut e) => e.get_mut().absorb(&self.decay, weight, at),
            Entry::Vacant(e) => {
                e.insert(CellState {
                    score: weight,
                    last_updated: at,
                });
            }
        }
        drop(bounds);
        true
    }

    pub fn record_bin_visit(
        &self,
        layout: &GridLayout,
        bin_id: &str,
        weight: f64,
        at: Timestamp,
    ) -> bool {
        match layout.bin(bin_id) {
            Some(bin) => self.record_visit(bin.cell, weight, at),
            None => {
                log::warn!(
                    "Dropping visit for bin '{}': unknown to layout v{}",
                    bin_id,
                    layout.version()
                );
                false
            }
        }
    }

    pub fn record_events(&self, layout: &GridLayout, events: &[VisitEvent]) -> usize {
        let applied = AtomicUsize::new(0);
        events.par_iter().for_each(|ev| {
            if self.record_bin_visit(layout, &ev.bin_id, ev.weight, ev.at) {
                applied.fetch_add(1, Ordering::Relaxed);
            }
        });
        let applied = applied.into_inner();
        log::info!(
            "Recorded {}/{} visit events ({} active cells)",
            applied,
            events.len(),
            self.len()
        );
        applied
    }

    pub fn query(&self, bounds: Option<GridRect>, now: Timestamp) -> Vec<CellActivity> {
        let mut out = Vec::new();
        let mut faded = Vec::new();

        for entry in self.cells.iter() {
            let coord = *entry.key();
            let state = *entry.value();
            let score = state.score_at(&self.decay, now);
            if score < self.epsilon {
                faded.push(coord);
                continue;
            }
            if bounds.is_some_and(|b| !b.contains(coord)) {
                continue;
            }
            out.push(CellActivity {
                coord,
                score,
                last_updated: state.last_updated,
            });
        }

        // A writer may have refreshed the cell since the scan; recheck.
        for coord in faded {
            self.cells
                .remove_if(&coord, |_, s| s.score_at(&self.decay, now) < self.epsilon);
        }

        out.sort_by_key(|a| (a.coord.y, a.coord.x));
        out
    }

    pub fn sweep(&self, now: Timestamp) -> usize {
        let mut evicted = 0;
        self.cells.retain(|_, s| {
            let keep = s.score_at(&self.decay, now) >= self.epsilon;
            if !keep {
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            log::debug!("Heatmap sweep evicted {} cells", evicted);
        }
        evicted
    }
}
