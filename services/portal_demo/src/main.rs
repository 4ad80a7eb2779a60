//! Portal demo entry point
//!
//! Usage:
//!   portal_demo --data 1,2,3 --moves right,right,left
//!   portal_demo --config config/portal.toml --fault orange
//!   portal_demo --print-config

use anyhow::{Context, Result};
use clap::Parser;
use portal::{DoorSupervisor, Portal, PortalSnapshot};
use portal_config::{LoggingSettings, PortalConfig};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "portal_demo")]
#[command(about = "Move items between two supervised doors")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Color of the left door
    #[arg(long, default_value = "orange")]
    left: String,

    /// Color of the right door
    #[arg(long, default_value = "blue")]
    right: String,

    /// Items pushed into the left door at setup
    #[arg(long, value_delimiter = ',', default_value = "1,2,3")]
    data: Vec<i64>,

    /// Transfers to run, e.g. "toward-right,left"
    #[arg(long, value_delimiter = ',')]
    moves: Vec<String>,

    /// Crash this door after the moves and show its replacement
    #[arg(long)]
    fault: Option<String>,

    /// Print snapshots as JSON lines instead of the portal view
    #[arg(long)]
    json: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = PortalConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    info!("Starting portal demo");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let doors = DoorSupervisor::<i64>::from_config(&config);
    let result = run_session(&doors, &args).await;
    doors.shutdown().await;

    let stats = doors.stats();
    info!(
        messages = stats.messages_processed,
        restarts = stats.restart_stats.total_restarts,
        "Portal demo finished"
    );
    result
}

async fn run_session(doors: &DoorSupervisor<i64>, args: &Args) -> Result<()> {
    let left = doors
        .start_child(args.left.as_str())
        .await
        .with_context(|| format!("Failed to create door '{}'", args.left))?;
    let right = doors
        .start_child(args.right.as_str())
        .await
        .with_context(|| format!("Failed to create door '{}'", args.right))?;

    let portal = Portal::setup(left, right, args.data.iter().copied()).await?;
    show(&portal.snapshot().await?, "setup", args.json)?;

    for step in &args.moves {
        portal
            .transfer_named(step)
            .await
            .with_context(|| format!("Transfer '{}' failed", step))?;
        show(&portal.snapshot().await?, step, args.json)?;
    }

    if let Some(color) = &args.fault {
        let door = doors.door(color.as_str()).await?;
        door.fault("requested from command line").await?;
        let fresh = doors.await_restart(&door).await?;
        warn!(
            color = %fresh.color(),
            generation = fresh.generation(),
            "Door restarted, previous contents dropped"
        );

        let portal = Portal::setup(
            doors.door(args.left.as_str()).await?,
            doors.door(args.right.as_str()).await?,
            std::iter::empty(),
        )
        .await?;
        show(&portal.snapshot().await?, "fault", args.json)?;
    }

    Ok(())
}

fn show(snapshot: &PortalSnapshot<i64>, step: &str, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({ "step": step, "portal": snapshot });
        println!("{}", serde_json::to_string(&line)?);
    } else {
        println!("{}\n{}", step, snapshot);
    }
    Ok(())
}

fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .context("Invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}
