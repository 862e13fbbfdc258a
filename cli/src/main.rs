use clap::{Parser, Subcommand};
use noc_common::db::core::NocDb;
use noc_common::db::parser;
use noc_common::util::config::Config;
use noc_common::util::{check, generator, logger, visualization};
use noc_placer::incremental::{MovedBlock, NocCostTracker};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route all traffic flows and report the NoC cost totals.
    Route,
    /// Exercise the incremental engine with a deterministic move sweep.
    Validate,
    Generate {
        #[arg(long, default_value_t = 4)]
        width: usize,
        #[arg(long, default_value_t = 4)]
        height: usize,
        #[arg(long, default_value_t = 8)]
        blocks: usize,
        #[arg(long, default_value_t = 16)]
        flows: usize,
        #[arg(long, default_value = "inputs/mesh.noc")]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    let command = args.command.unwrap_or(Commands::Route);

    match command {
        Commands::Generate {
            width,
            height,
            blocks,
            flows,
            output,
        } => {
            let width = width.clamp(2, 64);
            let height = height.clamp(2, 64);

            if let Some(parent) = Path::new(&output).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            generator::generate_random_noc(&output, width, height, blocks, flows)?;
            log::info!("Generated: {}", output);
        }
        Commands::Route => {
            validate_input_paths(&config)?;
            prepare_output_dir(&config.input.output_image)?;

            if let Err(e) = run_route(&config) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate => {
            validate_input_paths(&config)?;

            if let Err(e) = run_validate(&config) {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn validate_input_paths(config: &Config) -> anyhow::Result<()> {
    if !Path::new(&config.input.design_file).exists() {
        return Err(anyhow::anyhow!(
            "Input NoC design missing: '{}'. Did you run 'generate'?",
            config.input.design_file
        ));
    }
    Ok(())
}

fn prepare_output_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn load_tracker(config: &Config) -> anyhow::Result<NocCostTracker> {
    let mut db = NocDb::new();
    log::info!("Parsing NoC design: {}", config.input.design_file);
    parser::parse(&mut db, &config.input.design_file).map_err(|e| {
        anyhow::anyhow!(
            "Invalid NoC design in '{}': {}",
            config.input.design_file,
            e
        )
    })?;

    let strategy = noc_router::create_strategy(&config.routing)
        .map_err(|e| anyhow::anyhow!(e))?;
    log::info!("Routing algorithm: {}", config.routing.algorithm);

    Ok(NocCostTracker::new(db, strategy, config.costs))
}

fn run_route(config: &Config) -> anyhow::Result<()> {
    let mut tracker = load_tracker(config)?;

    tracker.route_all()?;

    let totals = tracker.costs();
    log::info!(
        "NoC costs: aggregate bandwidth {:.3} (norm {:.3e}), latency {:.3} (norm {:.3e})",
        totals.aggregate_bandwidth,
        tracker.bandwidth_norm_factor(),
        totals.latency,
        tracker.latency_norm_factor()
    );

    check::run(tracker.db()).map_err(|e| anyhow::anyhow!(e))?;
    tracker.verify_costs()?;

    log::info!("Generating NoC visualization...");
    visualization::draw_noc(tracker.db(), &config.input.output_image, 1000, 1000);

    Ok(())
}

/// Walks every block through a neighboring router, committing on even rounds
/// and reverting on odd ones, validating ledger consistency and cost drift
/// after every batch. Deterministic on purpose: the same design always walks
/// the same sweep.
fn run_validate(config: &Config) -> anyhow::Result<()> {
    let mut tracker = load_tracker(config)?;
    tracker.route_all()?;

    let baseline = tracker.costs();
    let num_blocks = tracker.db().num_blocks();
    let mut batches = 0usize;

    for round in 0..2 * num_blocks {
        let block = noc_common::db::indices::BlockId::new(round % num_blocks);
        let from = tracker.db().block_router(block);

        let Some(&out) = tracker.db().outgoing(from).first() else {
            continue;
        };
        let to = tracker.db().links[out.index()].dst;

        let delta = tracker.evaluate_move(&[MovedBlock { block, from, to }])?;

        if round % 2 == 0 {
            tracker.commit();
            log::info!(
                "Batch {}: committed (bandwidth {:+.3}, latency {:+.3})",
                batches,
                delta.aggregate_bandwidth,
                delta.latency
            );
        } else {
            tracker.revert();
            log::info!("Batch {}: reverted", batches);
        }

        check::run(tracker.db()).map_err(|e| anyhow::anyhow!(e))?;
        tracker.verify_costs()?;
        tracker.refresh_normalization();
        batches += 1;
    }

    log::info!(
        "Validated {} move batches (baseline bandwidth {:.3} -> {:.3})",
        batches,
        baseline.aggregate_bandwidth,
        tracker.costs().aggregate_bandwidth
    );
    log::info!("\x1b[32mSUCCESS\x1b[0m: incremental state never drifted");

    Ok(())
}
