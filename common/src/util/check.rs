use crate::db::core::NocDb;
use crate::db::indices::FlowId;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

const LEDGER_TOLERANCE: f64 = 1e-9;

/// Verifies the two structural invariants of the routed state: every flow's
/// route is a connected simple path between its placed endpoints, and every
/// link's reserved bandwidth equals the demand of the flows routed over it.
pub fn run(db: &NocDb) -> Result<(), String> {
    log::info!("Starting NoC Consistency Verification...");

    let mut valid = true;
    let mut msgs = Vec::new();

    match check_routes(db) {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Invalid Route Detected");
            log::error!("{}", e);
            msgs.push(e);
            valid = false;
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: All routes are connected simple paths."),
    }

    match check_ledger(db) {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Link Usage Ledger Mismatch");
            log::error!("{}", e);
            msgs.push(e);
            valid = false;
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: Link usage ledger matches routed flows."),
    }

    if valid {
        log::info!("\x1b[32mSUCCESS\x1b[0m: CONSISTENT NOC STATE");
        Ok(())
    } else {
        log::error!(
            "\x1b[31mFAILURE\x1b[0m: INCONSISTENT NOC STATE ({} Errors)",
            msgs.len()
        );
        Err(msgs.join("; "))
    }
}

fn check_routes(db: &NocDb) -> Result<(), String> {
    let error_found = AtomicBool::new(false);
    let error_msg = Mutex::new(String::new());

    let report = |msg: String| {
        if !error_found.swap(true, Ordering::Relaxed) {
            *error_msg.lock().unwrap() = msg;
        }
    };

    db.flows.par_iter().enumerate().for_each(|(i, flow)| {
        if error_found.load(Ordering::Relaxed) {
            return;
        }

        let flow_id = FlowId::new(i);
        let (src, dst) = db.flow_endpoints(flow_id);
        let route = db.route(flow_id);

        if route.is_empty() {
            if src != dst {
                report(format!(
                    "Flow '{}': no route but endpoints {:?} and {:?} differ",
                    flow.name, src, dst
                ));
            }
            return;
        }

        let first = &db.links[route[0].index()];
        if first.src != src {
            report(format!(
                "Flow '{}': route starts at {:?}, expected source {:?}",
                flow.name, first.src, src
            ));
            return;
        }

        let mut visited = HashSet::new();
        visited.insert(first.src);
        let mut current = first.src;

        for &link in route {
            let link_data = &db.links[link.index()];
            if link_data.src != current {
                report(format!(
                    "Flow '{}': disconnected route at link {:?}",
                    flow.name, link
                ));
                return;
            }
            if !visited.insert(link_data.dst) {
                report(format!(
                    "Flow '{}': route revisits router {:?}",
                    flow.name, link_data.dst
                ));
                return;
            }
            current = link_data.dst;
        }

        if current != dst {
            report(format!(
                "Flow '{}': route ends at {:?}, expected destination {:?}",
                flow.name, current, dst
            ));
        }
    });

    if error_found.load(Ordering::Relaxed) {
        Err(error_msg.lock().unwrap().clone())
    } else {
        Ok(())
    }
}

fn check_ledger(db: &NocDb) -> Result<(), String> {
    let mut expected = vec![0.0; db.num_links()];
    for (i, flow) in db.flows.iter().enumerate() {
        for &link in db.route(FlowId::new(i)) {
            expected[link.index()] += flow.bandwidth;
        }
    }

    for (i, link) in db.links.iter().enumerate() {
        if (link.reserved_bandwidth - expected[i]).abs() > LEDGER_TOLERANCE {
            return Err(format!(
                "Link {}: reserved {:.6} Gbps but routed flows sum to {:.6} Gbps",
                i, link.reserved_bandwidth, expected[i]
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::core::UsageUpdate;
    use crate::geom::coord::GridPos;

    fn routed_pair() -> NocDb {
        let mut db = NocDb::new();
        let a = db.add_router("r0".to_string(), GridPos::new(0, 0), 1.0);
        let b = db.add_router("r1".to_string(), GridPos::new(1, 0), 1.0);
        let ab = db.add_link(a, b, 10.0, 1.0);
        db.add_link(b, a, 10.0, 1.0);
        let blk_a = db.add_block("b0".to_string(), a);
        let blk_b = db.add_block("b1".to_string(), b);
        let f = db.add_flow("f0".to_string(), blk_a, blk_b, 2.0, 3.0, 1.0);
        db.set_route(f, vec![ab]);
        db.adjust_link_usage(&[ab], UsageUpdate::Increment, 2.0);
        db
    }

    #[test]
    fn consistent_state_passes() {
        let db = routed_pair();
        assert!(run(&db).is_ok());
    }

    #[test]
    fn corrupted_ledger_fails() {
        let mut db = routed_pair();
        db.links[0].reserved_bandwidth += 1.0;
        assert!(run(&db).is_err());
    }

    #[test]
    fn route_not_reaching_destination_fails() {
        let mut db = routed_pair();
        // Point the flow's destination somewhere its route does not end.
        let a = db.block_router(crate::db::indices::BlockId::new(0));
        db.assign_block(crate::db::indices::BlockId::new(1), a);
        assert!(run(&db).is_err());
    }
}
