use anyhow::Context;
use clap::Parser;
use std::time::Duration;

use coremeter_agent::collectors;
use coremeter_agent::metrics::{DisplaySignal, MultiCoreSnapshot};
use coremeter_agent::mode::{OutputFormat, SamplingMode};
use coremeter_agent::monitor::{self, MonitorLoop};
use coremeter_agent::output;
use coremeter_agent::smoother::{self, SmoothingConfig};

/// Gap between the baseline read and the measured read in one-shot mode.
const ONE_SHOT_DELAY: Duration = Duration::from_millis(200);

fn main() -> anyhow::Result<()> {
    // Info by default, RUST_LOG overrides
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let interval = monitor::interval_from_secs(cli.period)?;
    let hostname = output::hostname();

    if !cli.continuous {
        // Detect topology once for the classification of every row
        let topology = collectors::platform_topology().detect();
        let mut sampler = collectors::new_sampler(cli.mode, collectors::platform_tick_sampler(), topology);
        // First read only sets the baseline
        sampler.sample();
        std::thread::sleep(ONE_SHOT_DELAY);
        let snapshot = sampler.sample();
        if cli.smooth {
            print_signal(&DisplaySignal::from_snapshot(&snapshot), &hostname, cli.format)?;
        } else {
            print_snapshot(&snapshot, &hostname, cli.format)?;
        }
        return Ok(());
    }

    // Subscribe before starting so the baseline pass is not missed
    let mut monitor = MonitorLoop::for_platform(cli.mode);
    let raw = monitor.subscribe();
    monitor.start(interval)?;
    log::info!("Starting continuous monitoring with period {}s", cli.period);

    let mut printed = 0usize;
    let limit_reached = |printed: usize| cli.count.is_some_and(|n| printed >= n);

    if cli.smooth {
        let signals = smoother::spawn_smoother(raw, SmoothingConfig::default())?;
        while let Ok(signal) = signals.recv() {
            print_signal(&signal, &hostname, cli.format)?;
            printed += 1;
            if limit_reached(printed) {
                break;
            }
        }
    } else {
        while let Ok(snapshot) = raw.recv() {
            print_snapshot(&snapshot, &hostname, cli.format)?;
            printed += 1;
            if limit_reached(printed) {
                break;
            }
        }
    }

    // Joins the sampling thread; the smoother flushes and exits once its input closes
    monitor.stop();
    Ok(())
}

fn print_snapshot(snapshot: &MultiCoreSnapshot, hostname: &str, format: OutputFormat) -> anyhow::Result<()> {
    let line = output::render_snapshot(snapshot, hostname, output::unix_timestamp(), format)
        .context("failed to render snapshot")?;
    println!("{}", line);
    Ok(())
}

fn print_signal(signal: &DisplaySignal, hostname: &str, format: OutputFormat) -> anyhow::Result<()> {
    let line = output::render_signal(signal, hostname, output::unix_timestamp(), format)
        .context("failed to render display signal")?;
    println!("{}", line);
    Ok(())
}

#[derive(Parser)]
#[command(name = "coremeter")]
#[command(about = "Per-core CPU utilization monitor", long_about = None)]
struct Cli {
    /// Run continuously
    #[arg(long, default_value_t = false)]
    continuous: bool,

    /// Sampling period in seconds
    #[arg(short, long, default_value_t = 1.0)]
    period: f64,

    /// Counter set to sample
    #[arg(long, value_enum, default_value_t = SamplingMode::MultiCore)]
    mode: SamplingMode,

    /// Print the debounced display stream instead of raw snapshots
    #[arg(long, default_value_t = false)]
    smooth: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Stop after this many records (continuous mode)
    #[arg(short = 'n', long)]
    count: Option<usize>,
}
