use crate::db::indices::*;
use crate::geom::coord::GridPos;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct RouterData {
    pub name: String,
    pub pos: GridPos,
    pub latency: f64,
}

#[derive(Clone, Debug)]
pub struct LinkData {
    pub src: RouterId,
    pub dst: RouterId,
    pub capacity: f64,
    pub latency: f64,
    pub reserved_bandwidth: f64,
}

impl LinkData {
    pub fn utilization(&self) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        self.reserved_bandwidth / self.capacity
    }
}

#[derive(Clone, Debug)]
pub struct TrafficFlowData {
    pub name: String,
    pub src: BlockId,
    pub dst: BlockId,
    pub bandwidth: f64,
    pub latency_constraint: f64,
    pub priority: f64,
}

/* Defines how the links of a routed traffic flow are updated in terms of
 * their reserved bandwidth. Decrement removes an old route from the ledger,
 * increment adds a freshly routed one.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageUpdate {
    Increment,
    Decrement,
}

/// In-memory model of one NoC placement run: the static interconnect
/// (routers and directed links), the static traffic flow registry, the
/// current block placement and the current route of every flow. Topology and
/// flows never change after loading; reserved bandwidth, placement and
/// routes are the mutable state.
pub struct NocDb {
    pub routers: Vec<RouterData>,
    pub links: Vec<LinkData>,
    pub flows: Vec<TrafficFlowData>,
    pub block_names: Vec<String>,

    outgoing: Vec<Vec<LinkId>>,
    flows_by_block: Vec<Vec<FlowId>>,

    pub placement: Vec<RouterId>,
    pub routes: Vec<Vec<LinkId>>,

    pub router_name_map: HashMap<String, RouterId>,
    pub block_name_map: HashMap<String, BlockId>,
    pub flow_name_map: HashMap<String, FlowId>,
    grid_map: HashMap<GridPos, RouterId>,
}

impl NocDb {
    pub fn new() -> Self {
        Self {
            routers: Vec::with_capacity(64),
            links: Vec::with_capacity(256),
            flows: Vec::with_capacity(256),
            block_names: Vec::with_capacity(64),
            outgoing: Vec::with_capacity(64),
            flows_by_block: Vec::with_capacity(64),
            placement: Vec::with_capacity(64),
            routes: Vec::with_capacity(256),
            router_name_map: HashMap::new(),
            block_name_map: HashMap::new(),
            flow_name_map: HashMap::new(),
            grid_map: HashMap::new(),
        }
    }

    pub fn num_routers(&self) -> usize {
        self.routers.len()
    }
    pub fn num_links(&self) -> usize {
        self.links.len()
    }
    pub fn num_flows(&self) -> usize {
        self.flows.len()
    }
    pub fn num_blocks(&self) -> usize {
        self.block_names.len()
    }

    pub fn add_router(&mut self, name: String, pos: GridPos, latency: f64) -> RouterId {
        let id = RouterId::new(self.routers.len());
        self.router_name_map.insert(name.clone(), id);
        self.grid_map.insert(pos, id);
        self.routers.push(RouterData { name, pos, latency });
        self.outgoing.push(Vec::new());
        id
    }

    pub fn add_link(&mut self, src: RouterId, dst: RouterId, capacity: f64, latency: f64) -> LinkId {
        let id = LinkId::new(self.links.len());
        self.links.push(LinkData {
            src,
            dst,
            capacity,
            latency,
            reserved_bandwidth: 0.0,
        });
        self.outgoing[src.index()].push(id);
        id
    }

    pub fn add_block(&mut self, name: String, router: RouterId) -> BlockId {
        let id = BlockId::new(self.block_names.len());
        self.block_name_map.insert(name.clone(), id);
        self.block_names.push(name);
        self.placement.push(router);
        self.flows_by_block.push(Vec::new());
        id
    }

    pub fn add_flow(
        &mut self,
        name: String,
        src: BlockId,
        dst: BlockId,
        bandwidth: f64,
        latency_constraint: f64,
        priority: f64,
    ) -> FlowId {
        let id = FlowId::new(self.flows.len());
        self.flow_name_map.insert(name.clone(), id);
        self.flows.push(TrafficFlowData {
            name,
            src,
            dst,
            bandwidth,
            latency_constraint,
            priority,
        });
        self.routes.push(Vec::new());
        self.flows_by_block[src.index()].push(id);
        if dst != src {
            self.flows_by_block[dst.index()].push(id);
        }
        id
    }

    pub fn router_at(&self, pos: GridPos) -> Option<RouterId> {
        self.grid_map.get(&pos).copied()
    }

    pub fn outgoing(&self, router: RouterId) -> &[LinkId] {
        &self.outgoing[router.index()]
    }

    /// All flows that have `block` as source or destination. Each flow
    /// appears exactly once even when it loops back to the same block.
    pub fn flows_for_block(&self, block: BlockId) -> &[FlowId] {
        &self.flows_by_block[block.index()]
    }

    pub fn block_router(&self, block: BlockId) -> RouterId {
        self.placement[block.index()]
    }

    pub fn assign_block(&mut self, block: BlockId, router: RouterId) {
        self.placement[block.index()] = router;
    }

    /// Physical endpoints of a flow under the current placement.
    pub fn flow_endpoints(&self, flow: FlowId) -> (RouterId, RouterId) {
        let f = &self.flows[flow.index()];
        (self.block_router(f.src), self.block_router(f.dst))
    }

    pub fn route(&self, flow: FlowId) -> &[LinkId] {
        &self.routes[flow.index()]
    }

    pub fn set_route(&mut self, flow: FlowId, route: Vec<LinkId>) {
        self.routes[flow.index()] = route;
    }

    pub fn clear_route(&mut self, flow: FlowId) {
        self.routes[flow.index()].clear();
    }

    /// Applies one route transition to the link usage ledger. Must be called
    /// exactly once per transition: decrement for the route being abandoned,
    /// increment for the route replacing it.
    pub fn adjust_link_usage(&mut self, route: &[LinkId], update: UsageUpdate, bandwidth: f64) {
        for &link in route {
            let reserved = &mut self.links[link.index()].reserved_bandwidth;
            match update {
                UsageUpdate::Increment => *reserved += bandwidth,
                UsageUpdate::Decrement => *reserved -= bandwidth,
            }
        }
    }

    /// Latency of a flow's current route: per-link latency plus the latency
    /// of every router visited (links + 1 of them). A same-router flow has an
    /// empty route and pays only its single router.
    pub fn route_latency(&self, flow: FlowId) -> f64 {
        let route = self.route(flow);
        if route.is_empty() {
            let (src, _) = self.flow_endpoints(flow);
            return self.routers[src.index()].latency;
        }

        let mut latency = self.routers[self.links[route[0].index()].src.index()].latency;
        for &link in route {
            let link_data = &self.links[link.index()];
            latency += link_data.latency;
            latency += self.routers[link_data.dst.index()].latency;
        }
        latency
    }
}

impl Default for NocDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_router_db() -> (NocDb, RouterId, RouterId, LinkId, LinkId) {
        let mut db = NocDb::new();
        let a = db.add_router("r0".to_string(), GridPos::new(0, 0), 1.0);
        let b = db.add_router("r1".to_string(), GridPos::new(1, 0), 1.0);
        let ab = db.add_link(a, b, 10.0, 2.0);
        let ba = db.add_link(b, a, 10.0, 2.0);
        (db, a, b, ab, ba)
    }

    #[test]
    fn usage_ledger_increments_and_decrements() {
        let (mut db, _, _, ab, ba) = two_router_db();

        db.adjust_link_usage(&[ab, ba], UsageUpdate::Increment, 2.5);
        assert_eq!(db.links[ab.index()].reserved_bandwidth, 2.5);
        assert_eq!(db.links[ba.index()].reserved_bandwidth, 2.5);

        db.adjust_link_usage(&[ab], UsageUpdate::Decrement, 2.5);
        assert_eq!(db.links[ab.index()].reserved_bandwidth, 0.0);
        assert_eq!(db.links[ba.index()].reserved_bandwidth, 2.5);
    }

    #[test]
    fn flows_are_associated_with_both_endpoints_once() {
        let (mut db, a, b, _, _) = two_router_db();
        let blk_a = db.add_block("b0".to_string(), a);
        let blk_b = db.add_block("b1".to_string(), b);

        let f = db.add_flow("f0".to_string(), blk_a, blk_b, 1.0, 3.0, 1.0);
        let loopback = db.add_flow("f1".to_string(), blk_a, blk_a, 1.0, 3.0, 1.0);

        assert_eq!(db.flows_for_block(blk_a), &[f, loopback]);
        assert_eq!(db.flows_for_block(blk_b), &[f]);
    }

    #[test]
    fn route_latency_counts_links_and_routers() {
        let (mut db, a, b, ab, _) = two_router_db();
        let blk_a = db.add_block("b0".to_string(), a);
        let blk_b = db.add_block("b1".to_string(), b);
        let f = db.add_flow("f0".to_string(), blk_a, blk_b, 1.0, 3.0, 1.0);

        db.set_route(f, vec![ab]);
        // one link (2.0) plus two routers (1.0 each)
        assert_eq!(db.route_latency(f), 4.0);
    }

    #[test]
    fn same_router_flow_has_single_router_latency() {
        let (mut db, a, _, _, _) = two_router_db();
        let blk = db.add_block("b0".to_string(), a);
        let blk2 = db.add_block("b1".to_string(), a);
        let f = db.add_flow("f0".to_string(), blk, blk2, 1.0, 3.0, 1.0);

        assert!(db.route(f).is_empty());
        assert_eq!(db.route_latency(f), 1.0);
    }

    #[test]
    fn grid_lookup_resolves_router_positions() {
        let (db, a, b, _, _) = two_router_db();
        assert_eq!(db.router_at(GridPos::new(0, 0)), Some(a));
        assert_eq!(db.router_at(GridPos::new(1, 0)), Some(b));
        assert_eq!(db.router_at(GridPos::new(5, 5)), None);
    }
}
