use crate::RoutingStrategy;
use noc_common::db::core::NocDb;
use noc_common::db::indices::{LinkId, RouterId};
use noc_common::error::NocError;

/// Dimension-order routing for mesh topologies: travel the full X distance
/// first, then Y. Each hop must strictly close the gap in the active
/// dimension; a topology without such a link is unreachable under XY.
pub struct XyRouting;

impl XyRouting {
    fn step_toward(
        &self,
        db: &NocDb,
        current: RouterId,
        dst: RouterId,
    ) -> Option<LinkId> {
        let cur_pos = db.routers[current.index()].pos;
        let dst_pos = db.routers[dst.index()].pos;

        for &link in db.outgoing(current) {
            let next_pos = db.routers[db.links[link.index()].dst.index()].pos;

            let candidate = if cur_pos.x != dst_pos.x {
                next_pos.y == cur_pos.y
                    && next_pos.x.abs_diff(dst_pos.x) < cur_pos.x.abs_diff(dst_pos.x)
            } else {
                next_pos.x == cur_pos.x
                    && next_pos.y.abs_diff(dst_pos.y) < cur_pos.y.abs_diff(dst_pos.y)
            };

            // First match wins; adjacency lists hold ascending link ids.
            if candidate {
                return Some(link);
            }
        }
        None
    }
}

impl RoutingStrategy for XyRouting {
    fn route(&self, src: RouterId, dst: RouterId, db: &NocDb) -> Result<Vec<LinkId>, NocError> {
        let mut route = Vec::new();
        let mut current = src;

        while current != dst {
            let Some(link) = self.step_toward(db, current, dst) else {
                return Err(NocError::UnreachableRoute { src, dst });
            };
            route.push(link);
            current = db.links[link.index()].dst;
        }
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noc_common::geom::coord::GridPos;

    fn mesh(width: u32, height: u32) -> (NocDb, Vec<RouterId>) {
        let mut db = NocDb::new();
        let mut routers = Vec::new();
        for y in 0..height {
            for x in 0..width {
                routers.push(db.add_router(
                    format!("r{}_{}", x, y),
                    GridPos::new(x, y),
                    1.0,
                ));
            }
        }
        for y in 0..height {
            for x in 0..width {
                let id = (y * width + x) as usize;
                if x + 1 < width {
                    db.add_link(routers[id], routers[id + 1], 10.0, 1.0);
                    db.add_link(routers[id + 1], routers[id], 10.0, 1.0);
                }
                if y + 1 < height {
                    db.add_link(routers[id], routers[id + width as usize], 10.0, 1.0);
                    db.add_link(routers[id + width as usize], routers[id], 10.0, 1.0);
                }
            }
        }
        (db, routers)
    }

    fn positions(db: &NocDb, route: &[LinkId]) -> Vec<GridPos> {
        route
            .iter()
            .map(|&l| db.routers[db.links[l.index()].dst.index()].pos)
            .collect()
    }

    #[test]
    fn routes_x_then_y() {
        let (db, routers) = mesh(3, 3);
        // (0,0) -> (2,1)
        let route = XyRouting.route(routers[0], routers[5], &db).unwrap();
        assert_eq!(
            positions(&db, &route),
            vec![
                GridPos::new(1, 0),
                GridPos::new(2, 0),
                GridPos::new(2, 1)
            ]
        );
    }

    #[test]
    fn straight_line_has_no_turns() {
        let (db, routers) = mesh(4, 1);
        let route = XyRouting.route(routers[0], routers[3], &db).unwrap();
        assert_eq!(route.len(), 3);
    }

    #[test]
    fn fails_off_mesh() {
        let mut db = NocDb::new();
        let a = db.add_router("r0".to_string(), GridPos::new(0, 0), 1.0);
        // Diagonal neighbor: no XY-legal first hop exists.
        let b = db.add_router("r1".to_string(), GridPos::new(1, 1), 1.0);
        db.add_link(a, b, 10.0, 1.0);

        assert!(XyRouting.route(a, b, &db).is_err());
    }
}
