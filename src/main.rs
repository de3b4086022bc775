/*!
 * ps-runner - Simulator Entry Point
 *
 * Usage: ps-runner <program-file> [policy] [quantum]
 *
 * Positional arguments override PSIM_* environment settings.
 */

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use pseudo_os_sim::presentation::{render_report, to_json, ConsoleResolver};
use pseudo_os_sim::{
    halt_channel, init_tracing, LowestCandidate, Policy, Scheduler, SimConfig, Workload,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured tracing
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: ps-runner <program-file> [policy] [quantum]");
    };

    let mut config = SimConfig::from_env().context("Invalid PSIM_* environment")?;
    if let Some(policy) = args.next() {
        config.policy = policy.parse::<Policy>()?;
    }
    if let Some(quantum) = args.next() {
        config.quantum = quantum
            .parse()
            .with_context(|| format!("Invalid quantum '{}'", quantum))?;
    }

    let workload = Workload::load(&path, config.pool_size)
        .with_context(|| format!("Failed to load {}", path))?;
    info!(
        path = %path,
        processes = workload.len(),
        policy = %config.policy,
        "Workload ready"
    );

    let (handle, signal) = halt_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, halting simulation");
                handle.halt();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl+C"),
        }
    });

    let builder = Scheduler::builder()
        .with_config(config.clone())
        .with_halt(signal);
    let builder = if config.auto_resolve {
        builder.with_resolver(LowestCandidate)
    } else {
        builder.with_resolver(ConsoleResolver::stdio())
    };
    let scheduler = builder.build()?;

    let report = scheduler.run(&workload).await?;

    let json = std::env::var("PSIM_REPORT_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);
    if json {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", render_report(&report));
    }

    Ok(())
}
