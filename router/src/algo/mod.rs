pub mod bfs;
pub mod tour;
