use noc_common::db::core::NocDb;
use noc_common::db::indices::FlowId;
use noc_common::util::config::CostConfig;
use rayon::prelude::*;

/// Cost contribution of a single routed flow.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlowCost {
    pub aggregate_bandwidth: f64,
    pub latency: f64,
}

/// The two NoC cost totals fed to the outer placement objective.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NocCosts {
    pub aggregate_bandwidth: f64,
    pub latency: f64,
}

/// Bandwidth-distance product of one flow: links traversed times demand,
/// scaled by the flow's priority.
pub fn flow_aggregate_bandwidth_cost(db: &NocDb, flow: FlowId) -> f64 {
    let f = &db.flows[flow.index()];
    db.route(flow).len() as f64 * f.bandwidth * f.priority
}

/// Latency cost of one flow: the route latency plus the amount by which it
/// exceeds the flow's constraint, each under its configured weight, scaled
/// by priority.
pub fn flow_latency_cost(db: &NocDb, flow: FlowId, config: &CostConfig) -> f64 {
    let f = &db.flows[flow.index()];
    let latency = db.route_latency(flow);
    let excess = (latency - f.latency_constraint).max(0.0);
    f.priority * (config.latency_weight * latency + config.constraint_weight * excess)
}

pub fn flow_cost(db: &NocDb, flow: FlowId, config: &CostConfig) -> FlowCost {
    FlowCost {
        aggregate_bandwidth: flow_aggregate_bandwidth_cost(db, flow),
        latency: flow_latency_cost(db, flow, config),
    }
}

/// Derives both totals from scratch out of the current route store. This is
/// the ground truth the incrementally tracked totals are validated against,
/// not a primary code path; it only reads, so flows sum in parallel.
pub fn recompute_costs(db: &NocDb, config: &CostConfig) -> NocCosts {
    let (aggregate_bandwidth, latency) = (0..db.num_flows())
        .into_par_iter()
        .map(|i| {
            let cost = flow_cost(db, FlowId::new(i), config);
            (cost.aggregate_bandwidth, cost.latency)
        })
        .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));

    NocCosts {
        aggregate_bandwidth,
        latency,
    }
}

/// Inverse of a cost total, clamped so a zero or near-zero total maps to the
/// configured ceiling instead of a non-finite factor.
pub fn normalization_factor(total: f64, ceiling: f64) -> f64 {
    if total > 0.0 {
        (1.0 / total).min(ceiling)
    } else {
        ceiling
    }
}

/// Relative closeness test used for drift validation; near-zero magnitudes
/// fall back to an absolute comparison.
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    let diff = (a - b).abs();
    diff <= tolerance * a.abs().max(b.abs()) || diff <= tolerance
}
