pub mod dijkstra;
pub mod xy;
