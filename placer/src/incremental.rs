use crate::costs::{self, FlowCost, NocCosts};
use noc_common::db::core::{NocDb, UsageUpdate};
use noc_common::db::indices::{BlockId, FlowId, LinkId, RouterId};
use noc_common::error::NocError;
use noc_common::util::config::CostConfig;
use noc_router::RoutingStrategy;
use std::collections::HashSet;

/// One endpoint relocation inside a move batch, as handed over by the outer
/// placement optimizer.
#[derive(Clone, Copy, Debug)]
pub struct MovedBlock {
    pub block: BlockId,
    pub from: RouterId,
    pub to: RouterId,
}

/// Change in the two cost totals caused by a tentative move batch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CostDelta {
    pub aggregate_bandwidth: f64,
    pub latency: f64,
}

struct AffectedFlow {
    flow: FlowId,
    prior_route: Vec<LinkId>,
}

struct PendingMove {
    moved: Vec<MovedBlock>,
    affected: Vec<AffectedFlow>,
    delta: CostDelta,
}

/// Session context for NoC cost tracking during one placement run. Owns the
/// database and the routing strategy; every route transition funnels through
/// one internal re-route path, so the link usage ledger and the route store
/// cannot drift apart. At most one tentative move batch is open at a time
/// and is closed by exactly one of `commit` or `revert`; misusing that
/// protocol is a caller bug and panics.
pub struct NocCostTracker {
    db: NocDb,
    strategy: Box<dyn RoutingStrategy>,
    config: CostConfig,

    flow_costs: Vec<FlowCost>,
    proposed_costs: Vec<FlowCost>,
    seen: HashSet<FlowId>,

    totals: NocCosts,
    inv_bandwidth_norm: f64,
    inv_latency_norm: f64,

    pending: Option<PendingMove>,
}

impl NocCostTracker {
    pub fn new(db: NocDb, strategy: Box<dyn RoutingStrategy>, config: CostConfig) -> Self {
        let num_flows = db.num_flows();
        Self {
            db,
            strategy,
            config,
            flow_costs: vec![FlowCost::default(); num_flows],
            proposed_costs: vec![FlowCost::default(); num_flows],
            seen: HashSet::new(),
            totals: NocCosts::default(),
            inv_bandwidth_norm: config.bandwidth_norm_ceiling,
            inv_latency_norm: config.latency_norm_ceiling,
            pending: None,
        }
    }

    pub fn db(&self) -> &NocDb {
        &self.db
    }

    pub fn costs(&self) -> NocCosts {
        self.totals
    }

    pub fn bandwidth_norm_factor(&self) -> f64 {
        self.inv_bandwidth_norm
    }

    pub fn latency_norm_factor(&self) -> f64 {
        self.inv_latency_norm
    }

    /// Routes every flow for the first time, seeds the per-flow costs and
    /// both totals, and initializes the normalization factors. Called once,
    /// right after the initial placement.
    pub fn route_all(&mut self) -> Result<(), NocError> {
        assert!(
            self.db.routes.iter().all(|r| r.is_empty()),
            "route_all called on an already routed NoC"
        );

        noc_router::route_all_flows(&mut self.db, self.strategy.as_ref())?;

        self.totals = NocCosts::default();
        for i in 0..self.db.num_flows() {
            let flow = FlowId::new(i);
            let cost = costs::flow_cost(&self.db, flow, &self.config);
            self.flow_costs[i] = cost;
            self.totals.aggregate_bandwidth += cost.aggregate_bandwidth;
            self.totals.latency += cost.latency;
        }
        self.refresh_normalization();

        log::info!(
            "Initial NoC costs: aggregate bandwidth {:.3}, latency {:.3}",
            self.totals.aggregate_bandwidth,
            self.totals.latency
        );
        Ok(())
    }

    /// Evaluates a tentative move batch: applies the new block assignments,
    /// re-routes every affected flow exactly once and returns the resulting
    /// change of both cost totals. The update stays pending until `commit`
    /// or `revert`.
    pub fn evaluate_move(&mut self, batch: &[MovedBlock]) -> Result<CostDelta, NocError> {
        assert!(
            self.pending.is_none(),
            "evaluate_move called while another update is pending"
        );

        for moved in batch {
            assert!(
                self.db.block_router(moved.block) == moved.from,
                "move batch disagrees with the current placement of {:?}",
                moved.block
            );
            self.db.assign_block(moved.block, moved.to);
        }

        self.seen.clear();
        let mut affected = Vec::new();
        let mut delta = CostDelta::default();

        for moved in batch {
            let flows = self.db.flows_for_block(moved.block).to_vec();
            for flow in flows {
                if !self.seen.insert(flow) {
                    continue;
                }

                let prior_route = self.db.route(flow).to_vec();
                self.reroute(flow)?;

                let new_cost = costs::flow_cost(&self.db, flow, &self.config);
                let old_cost = self.flow_costs[flow.index()];
                delta.aggregate_bandwidth +=
                    new_cost.aggregate_bandwidth - old_cost.aggregate_bandwidth;
                delta.latency += new_cost.latency - old_cost.latency;

                self.proposed_costs[flow.index()] = new_cost;
                affected.push(AffectedFlow { flow, prior_route });
            }
        }

        self.pending = Some(PendingMove {
            moved: batch.to_vec(),
            affected,
            delta,
        });
        Ok(delta)
    }

    /// Makes the pending move permanent: folds its deltas into the totals
    /// and promotes the tentative per-flow costs.
    pub fn commit(&mut self) {
        let Some(pending) = self.pending.take() else {
            panic!("commit called with no pending move");
        };

        self.totals.aggregate_bandwidth += pending.delta.aggregate_bandwidth;
        self.totals.latency += pending.delta.latency;
        for affected in &pending.affected {
            self.flow_costs[affected.flow.index()] = self.proposed_costs[affected.flow.index()];
        }
    }

    /// Rejects the pending move: restores the pre-move block assignments and
    /// puts every affected flow's prior route back, link for link, so the
    /// ledger and route store return to their exact pre-move state. The
    /// tentative deltas are discarded.
    pub fn revert(&mut self) {
        let Some(pending) = self.pending.take() else {
            panic!("revert called with no pending move");
        };

        for moved in &pending.moved {
            self.db.assign_block(moved.block, moved.from);
        }

        for affected in &pending.affected {
            let bandwidth = self.db.flows[affected.flow.index()].bandwidth;
            let tentative = self.db.route(affected.flow).to_vec();
            self.db
                .adjust_link_usage(&tentative, UsageUpdate::Decrement, bandwidth);
            self.db
                .adjust_link_usage(&affected.prior_route, UsageUpdate::Increment, bandwidth);
            self.db.set_route(affected.flow, affected.prior_route.clone());
        }
    }

    /// Re-routes one flow under the current placement. The ledger sequencing
    /// is fixed: the old reservation comes off before routing, so a failed
    /// route leaves the ledger decremented instead of double-counted.
    fn reroute(&mut self, flow: FlowId) -> Result<(), NocError> {
        let bandwidth = self.db.flows[flow.index()].bandwidth;
        let old_route = self.db.route(flow).to_vec();
        self.db
            .adjust_link_usage(&old_route, UsageUpdate::Decrement, bandwidth);
        self.db.clear_route(flow);

        let (src, dst) = self.db.flow_endpoints(flow);
        if src == dst {
            return Ok(());
        }

        let route = match self.strategy.route(src, dst, &self.db) {
            Ok(route) => route,
            Err(e) => {
                log::error!(
                    "Failed to re-route flow '{}': {}",
                    self.db.flows[flow.index()].name,
                    e
                );
                return Err(e);
            }
        };

        self.db
            .adjust_link_usage(&route, UsageUpdate::Increment, bandwidth);
        self.db.set_route(flow, route);
        Ok(())
    }

    pub fn recompute_costs(&self) -> NocCosts {
        costs::recompute_costs(&self.db, &self.config)
    }

    /// Drift validation: the incrementally tracked totals must agree with a
    /// from-scratch recomputation within the configured relative tolerance.
    pub fn verify_costs(&self) -> Result<(), NocError> {
        let recomputed = self.recompute_costs();
        let tolerance = self.config.error_tolerance;

        if !costs::is_close(
            self.totals.aggregate_bandwidth,
            recomputed.aggregate_bandwidth,
            tolerance,
        ) {
            return Err(NocError::CostDrift {
                term: "aggregate bandwidth",
                tracked: self.totals.aggregate_bandwidth,
                recomputed: recomputed.aggregate_bandwidth,
                tolerance,
            });
        }
        if !costs::is_close(self.totals.latency, recomputed.latency, tolerance) {
            return Err(NocError::CostDrift {
                term: "latency",
                tracked: self.totals.latency,
                recomputed: recomputed.latency,
                tolerance,
            });
        }
        Ok(())
    }

    /// Re-derives both normalization factors from the current totals. Run
    /// after the initial routing pass and periodically by the outer loop to
    /// keep the NoC terms comparable to the rest of the objective.
    pub fn refresh_normalization(&mut self) {
        self.inv_bandwidth_norm = costs::normalization_factor(
            self.totals.aggregate_bandwidth,
            self.config.bandwidth_norm_ceiling,
        );
        self.inv_latency_norm =
            costs::normalization_factor(self.totals.latency, self.config.latency_norm_ceiling);
    }
}
