use crate::RoutingStrategy;
use noc_common::db::core::{LinkData, NocDb};
use noc_common::db::indices::{LinkId, RouterId};
use noc_common::error::NocError;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Copy, Clone)]
struct State {
    cost: f64,
    node: RouterId,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra over the directed link graph. Deterministic: equal-cost nodes
/// pop in ascending router-id order, links relax in ascending link-id order
/// and only a strict improvement replaces a settled predecessor, so ties
/// between equal-cost paths always resolve to the lowest link ids.
fn shortest_path<F>(
    db: &NocDb,
    src: RouterId,
    dst: RouterId,
    edge_cost: F,
) -> Result<Vec<LinkId>, NocError>
where
    F: Fn(&LinkData) -> f64,
{
    let n = db.num_routers();
    let mut dist = vec![f64::INFINITY; n];
    let mut parent: Vec<Option<LinkId>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[src.index()] = 0.0;
    heap.push(State {
        cost: 0.0,
        node: src,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if node == dst {
            break;
        }
        if cost > dist[node.index()] {
            continue;
        }

        for &link in db.outgoing(node) {
            let link_data = &db.links[link.index()];
            let next = link_data.dst;
            let next_cost = cost + edge_cost(link_data);

            if next_cost < dist[next.index()] {
                dist[next.index()] = next_cost;
                parent[next.index()] = Some(link);
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    if dist[dst.index()].is_infinite() {
        return Err(NocError::UnreachableRoute { src, dst });
    }

    let mut route = Vec::new();
    let mut current = dst;
    while current != src {
        let Some(link) = parent[current.index()] else {
            return Err(NocError::UnreachableRoute { src, dst });
        };
        route.push(link);
        current = db.links[link.index()].src;
    }
    route.reverse();
    Ok(route)
}

/// Minimizes summed link latency.
pub struct ShortestLatency;

impl RoutingStrategy for ShortestLatency {
    fn route(&self, src: RouterId, dst: RouterId, db: &NocDb) -> Result<Vec<LinkId>, NocError> {
        shortest_path(db, src, dst, |link| link.latency)
    }
}

/// Minimizes link latency inflated by a penalty on links reserved beyond
/// their capacity, steering new routes around saturated regions.
pub struct CongestionAware {
    pub penalty: f64,
}

impl RoutingStrategy for CongestionAware {
    fn route(&self, src: RouterId, dst: RouterId, db: &NocDb) -> Result<Vec<LinkId>, NocError> {
        shortest_path(db, src, dst, |link| {
            let overuse = (link.utilization() - 1.0).max(0.0);
            link.latency + self.penalty * overuse
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noc_common::geom::coord::GridPos;

    /// 4-router ring: r0(0,0) r1(1,0) r2(1,1) r3(0,1), bidirectional links
    /// between neighbors, capacity 10, latency 1.
    fn ring() -> (NocDb, Vec<RouterId>, Vec<LinkId>) {
        let mut db = NocDb::new();
        let positions = [(0, 0), (1, 0), (1, 1), (0, 1)];
        let routers: Vec<RouterId> = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| db.add_router(format!("r{}", i), GridPos::new(x, y), 1.0))
            .collect();

        let mut links = Vec::new();
        for i in 0..4 {
            let j = (i + 1) % 4;
            links.push(db.add_link(routers[i], routers[j], 10.0, 1.0));
            links.push(db.add_link(routers[j], routers[i], 10.0, 1.0));
        }
        (db, routers, links)
    }

    #[test]
    fn picks_one_of_the_minimal_paths() {
        let (db, routers, _) = ring();
        let route = ShortestLatency.route(routers[0], routers[2], &db).unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(db.links[route[0].index()].src, routers[0]);
        assert_eq!(db.links[route[1].index()].dst, routers[2]);
    }

    #[test]
    fn tie_break_is_stable_across_calls() {
        let (db, routers, _) = ring();
        let first = ShortestLatency.route(routers[0], routers[2], &db).unwrap();
        for _ in 0..10 {
            let again = ShortestLatency.route(routers[0], routers[2], &db).unwrap();
            assert_eq!(first, again);
        }
        // The r0->r1->r2 side carries the lower link ids and must win the tie.
        assert_eq!(first, vec![LinkId::new(0), LinkId::new(2)]);
    }

    #[test]
    fn unreachable_destination_is_an_error() {
        let mut db = NocDb::new();
        let a = db.add_router("r0".to_string(), GridPos::new(0, 0), 1.0);
        let b = db.add_router("r1".to_string(), GridPos::new(1, 0), 1.0);
        // One-way street: b -> a only.
        db.add_link(b, a, 10.0, 1.0);

        let result = ShortestLatency.route(a, b, &db);
        assert!(matches!(
            result,
            Err(NocError::UnreachableRoute { src, dst }) if src == a && dst == b
        ));
    }

    #[test]
    fn congestion_aware_avoids_saturated_links() {
        let (mut db, routers, links) = ring();
        // Saturate the r0->r1 side past capacity.
        db.links[links[0].index()].reserved_bandwidth = 25.0;

        let congested = CongestionAware { penalty: 20.0 }
            .route(routers[0], routers[2], &db)
            .unwrap();
        assert_eq!(db.links[congested[0].index()].dst, routers[3]);

        // The latency-only strategy still takes the lower-id side.
        let oblivious = ShortestLatency.route(routers[0], routers[2], &db).unwrap();
        assert_eq!(db.links[oblivious[0].index()].dst, routers[1]);
    }

    #[test]
    fn longer_detour_wins_when_latency_says_so() {
        let mut db = NocDb::new();
        let a = db.add_router("r0".to_string(), GridPos::new(0, 0), 1.0);
        let b = db.add_router("r1".to_string(), GridPos::new(1, 0), 1.0);
        let c = db.add_router("r2".to_string(), GridPos::new(2, 0), 1.0);
        // Direct but slow.
        db.add_link(a, c, 10.0, 10.0);
        // Two fast hops.
        let ab = db.add_link(a, b, 10.0, 1.0);
        let bc = db.add_link(b, c, 10.0, 1.0);

        let route = ShortestLatency.route(a, c, &db).unwrap();
        assert_eq!(route, vec![ab, bc]);
    }
}
