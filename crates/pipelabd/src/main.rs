//! pipelabd — the PipeLab simulation daemon.
//!
//! Single binary that assembles the pipeline session and drives it
//! from the terminal:
//! - `demo` walks the first three stages (review fix, image audit and
//!   build, cluster config), then enters monitoring until Ctrl-C.
//! - `monitor` runs only the autoscaling simulation, optionally
//!   injecting a timed load spike.
//!
//! # Usage
//!
//! ```text
//! pipelabd monitor --tick-ms 1000 --spike-after 10 --spike-for 15
//! pipelabd demo
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use pipelab_stages::PipelineSession;
use pipelab_state::StageId;

#[derive(Parser)]
#[command(name = "pipelabd", about = "PipeLab simulation daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the pipeline end to end, then monitor until Ctrl-C.
    Demo {
        /// Monitor tick interval in milliseconds.
        #[arg(long, default_value = "1000")]
        tick_ms: u64,

        /// Image build step interval in milliseconds.
        #[arg(long, default_value = "100")]
        build_step_ms: u64,
    },

    /// Run only the monitoring stage until Ctrl-C.
    Monitor {
        /// Tick interval in milliseconds.
        #[arg(long, default_value = "1000")]
        tick_ms: u64,

        /// Ticks to wait before injecting a load spike (0 disables).
        #[arg(long, default_value = "10")]
        spike_after: u32,

        /// Ticks the spike lasts before it is released.
        #[arg(long, default_value = "15")]
        spike_for: u32,

        /// Emit each post-tick snapshot as a JSON line on stdout.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pipelabd=debug,pipelab=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Demo {
            tick_ms,
            build_step_ms,
        } => run_demo(tick_ms, build_step_ms).await,
        Command::Monitor {
            tick_ms,
            spike_after,
            spike_for,
            json,
        } => run_monitor(tick_ms, spike_after, spike_for, json).await,
    }
}

async fn run_demo(tick_ms: u64, build_step_ms: u64) -> anyhow::Result<()> {
    let mut session = PipelineSession::new(Duration::from_millis(tick_ms));

    // ── Stage 1: assisted development ──────────────────────────
    info!("stage: assisted development");
    if let Some(finding) = session.review().advisory() {
        info!(severity = ?finding.severity, title = %finding.title, "advisory");
    }
    session.review_mut().apply_fix();
    info!(line = session.review().flagged_line(), "fix applied");

    // ── Stage 2: image audit and build ─────────────────────────
    session.select_stage(StageId::Build).await?;
    info!("stage: image build");
    session.build_mut().audit()?;
    for finding in session.build().findings() {
        info!(severity = ?finding.severity, title = %finding.title, "audit finding");
    }
    session.build_mut().apply_recommendations()?;
    session
        .run_build(Duration::from_millis(build_step_ms))
        .await?;

    // ── Stage 3: cluster configuration ─────────────────────────
    session.select_stage(StageId::Cluster).await?;
    info!("stage: cluster configuration");
    session.cluster_mut().apply_recommended();

    // ── Stage 4: monitoring ────────────────────────────────────
    session.select_stage(StageId::Monitor).await?;
    info!("stage: monitoring; press Ctrl-C to exit");
    session.monitor().on_change(Box::new(log_tick));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    session.shutdown().await;

    info!("pipelab daemon stopped");
    Ok(())
}

async fn run_monitor(
    tick_ms: u64,
    spike_after: u32,
    spike_for: u32,
    json: bool,
) -> anyhow::Result<()> {
    let interval = Duration::from_millis(tick_ms);
    let mut session = PipelineSession::new(interval);
    session.select_stage(StageId::Monitor).await?;

    if json {
        session.monitor().on_change(Box::new(|state| {
            match serde_json::to_string(&state) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "snapshot serialization failed"),
            }
        }));
    } else {
        session.monitor().on_change(Box::new(log_tick));
    }

    // Timed spike scenario; pends forever once played out so the
    // select below only ever completes on Ctrl-C.
    let scenario = async {
        let monitor = session.monitor();
        if spike_after > 0 {
            tokio::time::sleep(interval * spike_after).await;
            monitor.toggle_load_spike();
            info!("load spike injected");

            tokio::time::sleep(interval * spike_for).await;
            monitor.toggle_load_spike();
            info!("load spike released");
        }
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = scenario => {}
    }

    session.shutdown().await;
    info!("pipelab daemon stopped");
    Ok(())
}

fn log_tick(state: pipelab_state::LoadState) {
    info!(
        load = state.load,
        replicas = state.replicas,
        spike = state.spike_active,
        "tick"
    );
}
