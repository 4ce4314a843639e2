pub mod check;
pub mod clock;
pub mod config;
pub mod generator;
pub mod logger;
pub mod profiler;
pub mod visualization;
