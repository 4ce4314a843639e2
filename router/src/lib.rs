pub mod algo;
pub mod grid;
pub mod optimizer;
pub mod request;

pub use algo::bfs::{PathLeg, ShortestPath};
pub use optimizer::{RouteRequest, RouteResult, plan_batch, plan_route};
pub use request::parse_path_request;
