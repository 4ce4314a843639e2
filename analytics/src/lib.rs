pub mod advisor;
pub mod heatmap;

pub use advisor::{Reason, Suggestion, Zone, suggest_rebalancing};
pub use heatmap::aggregator::{CellActivity, Heatmap};
pub use heatmap::decay::DecayModel;
pub use heatmap::sweeper::Sweeper;
