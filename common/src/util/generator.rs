use rand::Rng;
use rand::seq::SliceRandom;
use std::fs::File;
use std::io::Write;

const LINK_CAPACITY: f64 = 10.0;
const LINK_LATENCY: f64 = 1.0;
const ROUTER_LATENCY: f64 = 1.0;

/// Generates a random W x H mesh NoC benchmark: bidirectional links between
/// grid neighbors, blocks placed on distinct random routers and random
/// traffic flows between them.
pub fn generate_random_noc(
    filename: &str,
    width: usize,
    height: usize,
    num_blocks: usize,
    num_flows: usize,
) -> std::io::Result<()> {
    let mut file = File::create(filename)?;
    let mut rng = rand::thread_rng();

    let num_routers = width * height;
    let blocks = num_blocks.clamp(1, num_routers);

    log::info!(
        "Generating Benchmark: {}x{} mesh, {} blocks, {} flows",
        width,
        height,
        blocks,
        num_flows
    );

    writeln!(file, "NOC 1.0 ;")?;

    writeln!(file, "ROUTERS {} ;", num_routers)?;
    for y in 0..height {
        for x in 0..width {
            let id = y * width + x;
            writeln!(
                file,
                "- r{} ( {} {} ) LATENCY {} ;",
                id, x, y, ROUTER_LATENCY
            )?;
        }
    }
    writeln!(file, "END ROUTERS")?;

    let mut links = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let id = y * width + x;
            if x + 1 < width {
                links.push((id, id + 1));
                links.push((id + 1, id));
            }
            if y + 1 < height {
                links.push((id, id + width));
                links.push((id + width, id));
            }
        }
    }
    writeln!(file, "LINKS {} ;", links.len())?;
    for (src, dst) in links {
        writeln!(
            file,
            "- r{} r{} CAP {} LATENCY {} ;",
            src, dst, LINK_CAPACITY, LINK_LATENCY
        )?;
    }
    writeln!(file, "END LINKS")?;

    let mut router_ids: Vec<usize> = (0..num_routers).collect();
    router_ids.shuffle(&mut rng);

    writeln!(file, "BLOCKS {} ;", blocks)?;
    for (i, &router) in router_ids.iter().take(blocks).enumerate() {
        writeln!(file, "- b{} r{} ;", i, router)?;
    }
    writeln!(file, "END BLOCKS")?;

    writeln!(file, "FLOWS {} ;", num_flows)?;
    for i in 0..num_flows {
        let src = rng.gen_range(0..blocks);
        let mut dst = rng.gen_range(0..blocks);
        while dst == src && blocks > 1 {
            dst = rng.gen_range(0..blocks);
        }

        let bandwidth = rng.gen_range(0.5..4.0);
        // Loose enough that a minimal mesh route can take a short detour.
        let constraint = (width + height) as f64 * rng.gen_range(0.5..1.5);
        let priority = rng.gen_range(1..=3);

        writeln!(
            file,
            "- f{} b{} b{} BW {:.2} CONSTRAINT {:.2} PRIORITY {} ;",
            i, src, dst, bandwidth, constraint, priority
        )?;
    }
    writeln!(file, "END FLOWS")?;

    Ok(())
}
