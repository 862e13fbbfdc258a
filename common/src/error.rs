use crate::db::indices::RouterId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NocError {
    #[error("no route exists from router {src:?} to router {dst:?}")]
    UnreachableRoute { src: RouterId, dst: RouterId },

    #[error(
        "{term} cost drift: tracked {tracked:.12} but recomputed {recomputed:.12} \
         (relative tolerance {tolerance:e})"
    )]
    CostDrift {
        term: &'static str,
        tracked: f64,
        recomputed: f64,
        tolerance: f64,
    },
}
