use crate::db::core::GridLayout;
use crate::error::{Result, WarehouseError};
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct LayoutStore {
    current: RwLock<Option<Arc<GridLayout>>>,
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A version that does not advance is renumbered to current + 1.
    pub fn publish(&self, mut layout: GridLayout) -> Arc<GridLayout> {
        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = slot.as_ref()
            && layout.version() <= prev.version()
        {
            log::warn!(
                "Layout '{}' version {} does not advance past {}; publishing as {}",
                layout.name(),
                layout.version(),
                prev.version(),
                prev.version() + 1
            );
            layout.set_version(prev.version() + 1);
        }
        let layout = Arc::new(layout);
        log::info!(
            "Published layout '{}' v{} ({}x{}, {} bins)",
            layout.name(),
            layout.version(),
            layout.width(),
            layout.height(),
            layout.num_bins()
        );
        *slot = Some(layout.clone());
        layout
    }

    pub fn snapshot(&self) -> Result<Arc<GridLayout>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(WarehouseError::LayoutUnavailable)
    }

    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
