pub mod aggregator;
pub mod decay;
pub mod sweeper;
