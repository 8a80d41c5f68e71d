//! CLI entry point for stallwatch.
//!
//! Runs a phased load experiment against a frame stream: a quiescent
//! Baseline window, then an Attack window with a competing bulk transfer,
//! with a stall-aware measurement log written throughout.
//!
//! # Usage
//!
//! Run with defaults (synthetic 30fps stream, iperf3 injector):
//! ```bash
//! stallwatch run
//! ```
//!
//! Shorter phases, no competing load:
//! ```bash
//! stallwatch run --baseline-sec 5 --attack-sec 10 --no-injector
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};

use stallwatch::config::Config;
use stallwatch::injector::iperf::ProcessInjector;
use stallwatch::injector::mock::NullInjector;
use stallwatch::injector::LoadInjector;
use stallwatch::run::{abort_channel, Orchestrator};
use stallwatch::source::SyntheticSource;
use stallwatch::storage::CsvSink;
use stallwatch::telemetry;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "stallwatch")]
#[command(about = "Stall-aware stream monitor with phased competing-load experiments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one Baseline + Attack experiment
    Run {
        /// Path to a stallwatch.toml configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for the log and run artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override the Baseline window, seconds
        #[arg(long)]
        baseline_sec: Option<u64>,

        /// Override the Attack window, seconds
        #[arg(long)]
        attack_sec: Option<u64>,

        /// Synthetic stream frame rate
        #[arg(long, default_value = "30.0")]
        fps: f64,

        /// Run the Attack window without launching the competing load
        #[arg(long)]
        no_injector: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            baseline_sec,
            attack_sec,
            fps,
            no_injector,
        } => {
            let mut config = match config {
                Some(path) => Config::load_from(&path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => Config::load().context("loading config")?,
            };

            if let Some(dir) = output_dir {
                config.output.directory = dir;
            }
            if let Some(sec) = baseline_sec {
                config.experiment.baseline_duration_sec = sec;
            }
            if let Some(sec) = attack_sec {
                config.experiment.attack_duration_sec = sec;
            }
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

            telemetry::init_from_config(&config).map_err(|e| anyhow::anyhow!(e))?;
            run_experiment(config, fps, no_injector).await
        }
    }
}

async fn run_experiment(config: Config, fps: f64, no_injector: bool) -> Result<()> {
    let log_path = config.output.directory.join(format!(
        "run_{}.csv",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let sink = CsvSink::create(&log_path, config.flush_interval())?;

    let injector: Box<dyn LoadInjector> = if no_injector {
        Box::new(NullInjector)
    } else {
        Box::new(ProcessInjector::new(config.injector.binary.clone()))
    };

    // The synthetic source runs long enough to cover both windows; the
    // orchestrator stops consuming once the Attack window elapses.
    let total_sec = config.experiment.baseline_duration_sec + config.experiment.attack_duration_sec;
    let (tx, rx) = mpsc::channel(256);
    let source_handle = SyntheticSource::steady(fps)
        .with_jitter(2.0)
        .with_max_frames((total_sec + 5) * fps.ceil() as u64)
        .spawn(tx);

    let (abort_handle, abort_rx) = abort_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; aborting run");
            abort_handle.trigger();
        }
    });

    let orchestrator = Orchestrator::new(config.clone(), injector);
    let sealed = orchestrator.run(rx, abort_rx, Box::new(sink)).await?;
    source_handle.abort();

    sealed.write_artifacts(&config.output.directory)?;
    print_summary(&sealed);

    info!(
        run_uid = %sealed.run_uid,
        log = %log_path.display(),
        "Experiment finished"
    );

    if sealed.completed() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "run aborted: {}",
            sealed
                .summary
                .abort_reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ))
    }
}

fn print_summary(sealed: &stallwatch::SealedRun) {
    let summary = &sealed.summary;
    info!("============================================================");
    info!("RUN SUMMARY");
    info!(
        completed = summary.completed,
        total_frames = summary.total_frames,
        total_stalls = summary.total_stalls,
        suspect = summary.suspect,
        "Outcome"
    );
    info!(
        average_fps = format_args!("{:.1}", summary.average_fps),
        average_bitrate_kbps = format_args!("{:.0}", summary.average_bitrate_kbps),
        stall_percent = format_args!("{:.1}", summary.stall_percent),
        "Stream quality"
    );
    if let Some(jitter) = &summary.jitter {
        info!(
            mean_ms = format_args!("{:.2}", jitter.mean_ms),
            stdev_ms = format_args!("{:.2}", jitter.stdev_ms),
            p95_ms = format_args!("{:.2}", jitter.p95_ms),
            p99_ms = format_args!("{:.2}", jitter.p99_ms),
            "Inter-frame jitter"
        );
    }
    for (rank, stall) in summary.longest_stalls.iter().enumerate() {
        info!(
            rank = rank + 1,
            duration_ms = format_args!("{:.0}", stall.duration_ms),
            frame = stall.frame_number,
            at_sec = format_args!("{:.1}", stall.elapsed_sec),
            "Longest stall"
        );
    }
    info!("============================================================");
}
