pub mod algo;

use noc_common::db::core::{NocDb, UsageUpdate};
use noc_common::db::indices::{FlowId, LinkId, RouterId};
use noc_common::error::NocError;
use noc_common::util::config::RoutingConfig;
use rayon::prelude::*;
use std::time::Instant;

/// A flow pathfinding strategy. The returned route is a simple path of
/// directed links from `src` to `dst`.
///
/// Implementations must be deterministic: identical inputs must produce the
/// identical link sequence. The cost tracker relies on this when validating
/// that a rejected move restores the exact pre-move state.
pub trait RoutingStrategy: Send + Sync {
    fn route(&self, src: RouterId, dst: RouterId, db: &NocDb) -> Result<Vec<LinkId>, NocError>;
}

/// Builds the strategy named in the configuration.
pub fn create_strategy(config: &RoutingConfig) -> Result<Box<dyn RoutingStrategy>, String> {
    match config.algorithm.as_str() {
        "xy" => Ok(Box::new(algo::xy::XyRouting)),
        "shortest_latency" => Ok(Box::new(algo::dijkstra::ShortestLatency)),
        "congestion_aware" => Ok(Box::new(algo::dijkstra::CongestionAware {
            penalty: config.congestion_penalty,
        })),
        other => Err(format!("unknown routing algorithm '{}'", other)),
    }
}

/// Initial full routing pass: computes a route for every flow against the
/// unreserved topology, then applies routes and ledger increments serially.
/// Path computation is read-only and runs in parallel; the ledger has a
/// single writer.
pub fn route_all_flows(db: &mut NocDb, strategy: &dyn RoutingStrategy) -> Result<(), NocError> {
    log::info!("Routing {} traffic flows...", db.num_flows());
    let start = Instant::now();

    let computed = (0..db.num_flows())
        .into_par_iter()
        .map(|i| {
            let flow_id = FlowId::new(i);
            let (src, dst) = db.flow_endpoints(flow_id);
            if src == dst {
                return Ok((flow_id, Vec::new()));
            }
            let route = strategy.route(src, dst, db)?;
            Ok((flow_id, route))
        })
        .collect::<Result<Vec<(FlowId, Vec<LinkId>)>, NocError>>()?;

    for (flow_id, route) in computed {
        let bandwidth = db.flows[flow_id.index()].bandwidth;
        db.adjust_link_usage(&route, UsageUpdate::Increment, bandwidth);
        db.set_route(flow_id, route);
    }

    log::info!("Initial NoC routing took {:?}", start.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use noc_common::geom::coord::GridPos;

    #[test]
    fn route_all_reserves_bandwidth_for_every_flow() {
        let mut db = NocDb::new();
        let a = db.add_router("r0".to_string(), GridPos::new(0, 0), 1.0);
        let b = db.add_router("r1".to_string(), GridPos::new(1, 0), 1.0);
        let ab = db.add_link(a, b, 10.0, 1.0);
        db.add_link(b, a, 10.0, 1.0);

        let blk_a = db.add_block("b0".to_string(), a);
        let blk_b = db.add_block("b1".to_string(), b);
        let f0 = db.add_flow("f0".to_string(), blk_a, blk_b, 2.0, 3.0, 1.0);
        let f1 = db.add_flow("f1".to_string(), blk_a, blk_b, 1.5, 3.0, 1.0);

        let strategy = algo::dijkstra::ShortestLatency;
        route_all_flows(&mut db, &strategy).unwrap();

        assert_eq!(db.route(f0), &[ab]);
        assert_eq!(db.route(f1), &[ab]);
        assert_eq!(db.links[ab.index()].reserved_bandwidth, 3.5);
    }

    #[test]
    fn create_strategy_rejects_unknown_names() {
        let config = RoutingConfig {
            algorithm: "steiner".to_string(),
            congestion_penalty: 1.0,
        };
        assert!(create_strategy(&config).is_err());
    }
}
