pub mod costs;
pub mod incremental;
