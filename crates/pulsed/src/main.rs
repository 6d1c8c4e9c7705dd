//! pulsed — the PulseGrid daemon.
//!
//! Single binary that assembles the host:
//! - Key-value bridge (Redis)
//! - Script engine + function resolver (remote package → local module)
//! - Execution context
//! - Execution loop
//!
//! # Usage
//!
//! ```text
//! pulsed --input-key metrics --output-key metrics-out \
//!        --package-uri https://releases.example.com/metrics-fn.zip
//! ```
//!
//! Every flag is also readable from the environment (`PULSE_*`). Startup
//! failures — missing input key, unreachable store, no resolvable function —
//! abort with a non-zero exit; once the loop is running, nothing ends the
//! process but an external kill.

mod executor;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use pulse_core::{ExecutionContext, PackageUri};
use pulse_runtime::{
    BindingPolicy, FunctionResolver, FunctionSource, LocalModuleSource, RemotePackageSource,
    WELL_KNOWN_MODULE, build_engine,
};
use pulsegrid_bridge::RedisBridge;
use tracing::{info, warn};

use executor::ExecutionLoop;

#[derive(Debug, Parser)]
#[command(name = "pulsed", about = "PulseGrid daemon")]
struct Cli {
    /// Key-value store host.
    #[arg(long, env = "PULSE_STORE_HOST", default_value = "127.0.0.1")]
    store_host: String,

    /// Key-value store port.
    #[arg(long, env = "PULSE_STORE_PORT", default_value = "6379")]
    store_port: u16,

    /// Key the loop reads measurement records from.
    #[arg(long, env = "PULSE_INPUT_KEY")]
    input_key: String,

    /// Key the loop writes function results to. Without it, results are
    /// computed and dropped.
    #[arg(long, env = "PULSE_OUTPUT_KEY")]
    output_key: Option<String>,

    /// Seconds to sleep between ticks.
    #[arg(long, env = "PULSE_INTERVAL_SECS", default_value = "5")]
    interval_secs: u64,

    /// URI of a zip package of function sources. When set, the package
    /// tier is tried before the local module.
    #[arg(long, env = "PULSE_PACKAGE_URI")]
    package_uri: Option<String>,

    /// Name of the entry-point function the sources must define.
    #[arg(long, env = "PULSE_ENTRY_POINT", default_value = "handler")]
    entry_point: String,

    /// Directory the local module tier searches for `usermodule.rhai`.
    #[arg(long, env = "PULSE_MODULE_DIR", default_value = "/opt/pulsegrid")]
    module_dir: PathBuf,

    /// Entry-point binding policy for multi-file packages:
    /// `concatenate` (last definition wins) or `probe` (first file wins).
    #[arg(long, env = "PULSE_BINDING_POLICY", default_value = "concatenate")]
    binding_policy: BindingPolicy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pulsed=debug,pulse=debug".parse().unwrap()),
        )
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("PulseGrid daemon starting");

    if cli.output_key.is_none() {
        warn!("no output key configured, function results will not be stored");
    }

    // Bridge first: an unreachable store is startup-fatal.
    let bridge = RedisBridge::connect(&cli.store_host, cli.store_port)
        .await
        .context("key-value store unreachable")?;

    // Resolver chain: remote package tier (when configured), then the
    // local module tier.
    let engine = build_engine();
    let mut sources: Vec<Box<dyn FunctionSource>> = Vec::new();
    if let Some(raw) = &cli.package_uri {
        let package = PackageUri::parse(raw).context("invalid package URI")?;
        sources.push(Box::new(RemotePackageSource::new(
            engine.clone(),
            package,
            cli.entry_point.clone(),
            cli.binding_policy,
        )));
    }
    sources.push(Box::new(LocalModuleSource::new(
        engine,
        cli.module_dir.clone(),
        cli.entry_point.clone(),
    )));

    let handler = FunctionResolver::new(sources)
        .resolve()
        .await
        .context("no function could be resolved")?;

    let module_path = cli.module_dir.join(WELL_KNOWN_MODULE);
    let ctx = ExecutionContext::new(
        cli.store_host.clone(),
        cli.store_port,
        cli.input_key.clone(),
        cli.output_key.clone(),
        &module_path,
    );

    ExecutionLoop::new(
        bridge,
        handler,
        ctx,
        Duration::from_secs(cli.interval_secs),
        module_path,
    )
    .run()
    .await;

    Ok(())
}
