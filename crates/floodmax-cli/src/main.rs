//! floodmax binary
//!
//! Generate a random graph, flood maxima across it and report the agreed
//! value. Exit codes: 0 converged, 1 bad configuration or topology,
//! 2 no convergence within budget.

mod args;

use std::process::ExitCode;

use floodmax_gossip::{Error, Simulation};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_INVALID: u8 = 1;
const EXIT_NOT_CONVERGED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floodmax=info,floodmax_gossip=info,floodmax_topology=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let options = match args::parse_args(&argv, &|key| std::env::var(key).ok()) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            args::print_usage();
            return ExitCode::from(EXIT_INVALID);
        }
    };
    if options.help {
        args::print_usage();
        return ExitCode::SUCCESS;
    }

    let sim = match Simulation::from_config(options.config) {
        Ok(sim) => sim,
        Err(e) => {
            error!(error = %e, "Failed to build simulation");
            return ExitCode::from(EXIT_INVALID);
        }
    };

    if options.print_graph {
        print!("{}", sim.world());
    }

    let expected = sim.expected();
    info!(
        nodes = sim.world().node_count(),
        edges = sim.world().edge_count(),
        groups = expected.len(),
        scope = %sim.config().scope,
        "Starting flooding run"
    );

    match sim.run().await {
        Ok(outcome) => {
            if outcome.convergence.groups != expected {
                warn!("Agreed maxima differ from the seeded maxima");
            }
            if options.json {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!(error = %e, "Failed to encode outcome");
                        return ExitCode::from(EXIT_INVALID);
                    }
                }
            } else {
                println!("Max: {}", outcome.convergence.max);
                if outcome.convergence.groups.len() > 1 {
                    for group in &outcome.convergence.groups {
                        println!("  {} nodes: {}", group.nodes.len(), group.max);
                    }
                }
                println!("Messages: {}", outcome.messages_sent());
            }
            ExitCode::SUCCESS
        }
        Err(e @ Error::NotConverged { .. }) => {
            error!(error = %e, "Run did not converge");
            ExitCode::from(EXIT_NOT_CONVERGED)
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::from(EXIT_INVALID)
        }
    }
}
