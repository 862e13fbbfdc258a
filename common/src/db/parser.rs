use crate::db::core::NocDb;
use crate::geom::coord::GridPos;
use anyhow::{Result, anyhow};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Parses a `.noc` design file into the database. The format is line based
/// with four sections (ROUTERS, LINKS, BLOCKS, FLOWS); entries start with
/// `-` and end with `;`, e.g.
///
/// ```text
/// ROUTERS 2 ;
/// - r0 ( 0 0 ) LATENCY 1.0 ;
/// - r1 ( 1 0 ) LATENCY 1.0 ;
/// END ROUTERS
/// LINKS 1 ;
/// - r0 r1 CAP 10.0 LATENCY 1.0 ;
/// END LINKS
/// ```
pub fn parse(db: &mut NocDb, filename: &str) -> Result<()> {
    let file = File::open(filename)?;
    let reader = BufReader::new(file);

    let mut in_routers = false;
    let mut in_links = false;
    let mut in_blocks = false;
    let mut in_flows = false;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0].starts_with('#') {
            continue;
        }

        match parts[0] {
            "NOC" => {}
            "ROUTERS" => in_routers = true,
            "LINKS" => in_links = true,
            "BLOCKS" => in_blocks = true,
            "FLOWS" => in_flows = true,
            "END" => {
                in_routers = false;
                in_links = false;
                in_blocks = false;
                in_flows = false;
            }
            "-" => {
                let context = |msg: &str| anyhow!("line {}: {}", line_no + 1, msg);

                if in_routers {
                    if parts.len() < 8 {
                        return Err(context("malformed router entry"));
                    }
                    let x: u32 = parts[3].parse()?;
                    let y: u32 = parts[4].parse()?;
                    let latency: f64 = parts[7].parse()?;
                    db.add_router(parts[1].to_string(), GridPos::new(x, y), latency);
                } else if in_links {
                    if parts.len() < 7 {
                        return Err(context("malformed link entry"));
                    }
                    let src = *db
                        .router_name_map
                        .get(parts[1])
                        .ok_or_else(|| context("unknown source router"))?;
                    let dst = *db
                        .router_name_map
                        .get(parts[2])
                        .ok_or_else(|| context("unknown destination router"))?;
                    let capacity: f64 = parts[4].parse()?;
                    let latency: f64 = parts[6].parse()?;
                    db.add_link(src, dst, capacity, latency);
                } else if in_blocks {
                    if parts.len() < 3 {
                        return Err(context("malformed block entry"));
                    }
                    let router = *db
                        .router_name_map
                        .get(parts[2])
                        .ok_or_else(|| context("unknown router in block entry"))?;
                    db.add_block(parts[1].to_string(), router);
                } else if in_flows {
                    if parts.len() < 10 {
                        return Err(context("malformed flow entry"));
                    }
                    let src = *db
                        .block_name_map
                        .get(parts[2])
                        .ok_or_else(|| context("unknown source block"))?;
                    let dst = *db
                        .block_name_map
                        .get(parts[3])
                        .ok_or_else(|| context("unknown destination block"))?;
                    let bandwidth: f64 = parts[5].parse()?;
                    let constraint: f64 = parts[7].parse()?;
                    let priority: f64 = parts[9].parse()?;
                    db.add_flow(
                        parts[1].to_string(),
                        src,
                        dst,
                        bandwidth,
                        constraint,
                        priority,
                    );
                } else {
                    return Err(context("entry outside of any section"));
                }
            }
            _ => {}
        }
    }

    log::info!(
        "Loaded NoC: {} routers, {} links, {} blocks, {} flows",
        db.num_routers(),
        db.num_links(),
        db.num_blocks(),
        db.num_flows()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_all_sections() {
        let path = std::env::temp_dir().join("noc_parser_all_sections.noc");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "NOC 1.0 ;").unwrap();
        writeln!(file, "ROUTERS 2 ;").unwrap();
        writeln!(file, "- r0 ( 0 0 ) LATENCY 1.0 ;").unwrap();
        writeln!(file, "- r1 ( 1 0 ) LATENCY 2.0 ;").unwrap();
        writeln!(file, "END ROUTERS").unwrap();
        writeln!(file, "LINKS 2 ;").unwrap();
        writeln!(file, "- r0 r1 CAP 10.0 LATENCY 1.0 ;").unwrap();
        writeln!(file, "- r1 r0 CAP 10.0 LATENCY 1.0 ;").unwrap();
        writeln!(file, "END LINKS").unwrap();
        writeln!(file, "BLOCKS 2 ;").unwrap();
        writeln!(file, "- cpu r0 ;").unwrap();
        writeln!(file, "- mem r1 ;").unwrap();
        writeln!(file, "END BLOCKS").unwrap();
        writeln!(file, "FLOWS 1 ;").unwrap();
        writeln!(file, "- f0 cpu mem BW 2.0 CONSTRAINT 3.0 PRIORITY 1.0 ;").unwrap();
        writeln!(file, "END FLOWS").unwrap();
        drop(file);

        let mut db = NocDb::new();
        parse(&mut db, path.to_str().unwrap()).unwrap();

        assert_eq!(db.num_routers(), 2);
        assert_eq!(db.num_links(), 2);
        assert_eq!(db.num_blocks(), 2);
        assert_eq!(db.num_flows(), 1);
        assert_eq!(db.routers[1].latency, 2.0);
        assert_eq!(db.flows[0].bandwidth, 2.0);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_unknown_router_in_link() {
        let path = std::env::temp_dir().join("noc_parser_bad_link.noc");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "ROUTERS 1 ;").unwrap();
        writeln!(file, "- r0 ( 0 0 ) LATENCY 1.0 ;").unwrap();
        writeln!(file, "END ROUTERS").unwrap();
        writeln!(file, "LINKS 1 ;").unwrap();
        writeln!(file, "- r0 r9 CAP 10.0 LATENCY 1.0 ;").unwrap();
        writeln!(file, "END LINKS").unwrap();
        drop(file);

        let mut db = NocDb::new();
        assert!(parse(&mut db, path.to_str().unwrap()).is_err());

        std::fs::remove_file(path).ok();
    }
}
