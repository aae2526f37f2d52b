//! toposyncd - Device-Topology Reconciliation Daemon
//!
//! Entry point for the toposyncd binary. Loads a captured discovery payload
//! from disk and runs one reconciliation against an in-memory inventory,
//! printing the resulting findings. Wiring against the platform store is
//! done by the host process embedding [`netinv_toposyncd::TopoSync`].

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use netinv_common::{AttrMap, FindingKind, MemoryInventory};
use netinv_toposyncd::{DiscoveryPayload, TopoSync};

#[derive(Parser, Debug)]
#[command(name = "toposyncd", about = "Reconcile a discovery payload into an inventory")]
struct Args {
    /// JSON discovery payload (structure table + interface table)
    #[arg(long)]
    payload: PathBuf,

    /// Device display name
    #[arg(long, default_value = "device-1")]
    device_name: String,

    /// Device root class
    #[arg(long, default_value = "Router")]
    device_class: String,

    /// Device model hint for classification
    #[arg(long)]
    model: Option<String>,
}

/// Initializes tracing/logging subsystem
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("reading {}", args.payload.display()))?;
    let payload: DiscoveryPayload =
        serde_json::from_str(&raw).context("parsing discovery payload")?;

    let store = MemoryInventory::new();
    let device = store.seed_root(&args.device_class, &args.device_name, AttrMap::new());

    let mut sync = TopoSync::new(&store, device);
    if let Some(model) = &args.model {
        sync = sync.with_model_hint(model.clone());
    }

    let findings = sync.sync(&payload).await?;
    for finding in &findings {
        match finding.kind {
            FindingKind::Error => error!("{finding}"),
            FindingKind::Warning => warn!("{finding}"),
            _ => info!("{finding}"),
        }
    }
    info!(
        total = findings.len(),
        objects = store.object_count(),
        "reconciliation complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("--- Starting toposyncd (Rust) ---");

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("toposyncd failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
