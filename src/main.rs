//! Tethered - command line reporter
//!
//! Runs one reporting operation per invocation. Schedule `tethered sync` with
//! cron or a systemd timer to keep a monitor up to date.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tethered::{tags, ClientOptions, RequestResult, Snapshot, Tethered, DEFAULT_STATUS_CODE};
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "tethered")]
#[command(about = "Push uptime status, host metrics and incidents to Tethered")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API key (overrides the config file)
    #[arg(long, global = true)]
    apikey: Option<String>,

    /// Monitor id (overrides the config file)
    #[arg(short, long, global = true)]
    monitor_id: Option<u64>,

    /// JSON options file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Push status and metrics as configured by the sync flags
    Sync,

    /// Push an uptime status
    Status(StatusArgs),

    /// Push a single custom metric
    Metric(MetricArgs),

    /// Snapshot the host and push the enabled metrics
    Metrics,

    /// Print a host snapshot without sending it
    Snapshot(SnapshotArgs),

    /// List the monitors on the account
    Monitors,

    /// List incidents on the account
    Incidents(IncidentsArgs),

    /// Open an incident
    Incident(IncidentArgs),
}

impl Commands {
    /// Whether the command talks to the API and so needs credentials.
    fn sends_report(&self) -> bool {
        !matches!(self, Commands::Snapshot(_))
    }
}

#[derive(Args)]
struct StatusArgs {
    /// Status code to log
    #[arg(long, default_value_t = DEFAULT_STATUS_CODE)]
    code: u16,

    /// Response or operation time to log
    #[arg(long, default_value_t = 0)]
    time: u64,
}

#[derive(Args)]
struct MetricArgs {
    /// Metric key slug
    key: String,

    /// Metric value
    value: f64,

    /// Display label; "{{}}" marks a suffix, e.g. "Queue {{}}jobs"
    #[arg(long)]
    label: Option<String>,

    /// Aggregation type, e.g. counter, average, percentage
    #[arg(long = "type")]
    kind: Option<String>,

    /// Dashboard widget, e.g. line, area, pie, donut, radar, heatmap
    #[arg(long)]
    widget: Option<String>,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[derive(Args)]
struct IncidentsArgs {
    /// Page to load
    #[arg(long, default_value = "1")]
    page: String,
}

#[derive(Args)]
struct IncidentArgs {
    /// Incident title
    title: String,

    /// Incident description
    description: String,

    /// Where the incident was raised from
    #[arg(long)]
    source: Option<String>,

    /// Incident status; 0 is ongoing
    #[arg(long, default_value_t = 0)]
    status: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let client = Tethered::new(load_options(&cli)?);

    if cli.command.sends_report() && !client.is_ready() {
        bail!("An API key and a monitor id are required (use --apikey/--monitor-id or --config)");
    }

    match &cli.command {
        Commands::Sync => {
            let report = client.sync();
            print_json(&report)?;
        }
        Commands::Status(args) => print_result(client.push_status(args.code, args.time))?,
        Commands::Metric(args) => print_result(client.push_metric(
            &args.key,
            Some(args.value),
            args.label.as_deref(),
            args.kind.as_deref(),
            args.widget.as_deref(),
        ))?,
        Commands::Metrics => print_metrics_result(client.push_metrics())?,
        Commands::Monitors => print_result(client.get_monitors())?,
        Commands::Incidents(args) => print_result(client.get_incidents(args.page.as_str()))?,
        Commands::Incident(args) => print_result(client.push_incident(
            &args.title,
            &args.description,
            args.source.as_deref(),
            args.status,
        ))?,
        Commands::Snapshot(args) => snapshot_command(&client, args)?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn load_options(cli: &Cli) -> anyhow::Result<ClientOptions> {
    let mut options = match &cli.config {
        Some(path) => ClientOptions::from_file(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => ClientOptions::new(),
    };

    if let Some(apikey) = &cli.apikey {
        options = options.with_apikey(apikey.clone());
    }
    if let Some(monitor_id) = cli.monitor_id {
        options = options.with_monitor_id(monitor_id);
    }

    Ok(options.with_listener(tags::REQUEST, |request: &tethered::RequestInfo| {
        debug!(url = %request.url, "Calling Tethered API");
    }))
}

fn snapshot_command(client: &Tethered, args: &SnapshotArgs) -> anyhow::Result<()> {
    info!("Sampling host resources...");
    let snapshot = client.snapshot();

    match args.format.as_str() {
        "json" => print_json(&snapshot)?,
        "pretty" => print_pretty_snapshot(&snapshot),
        other => bail!("Unsupported format: {other}. Use 'json' or 'pretty'"),
    }

    Ok(())
}

fn print_result(result: Option<RequestResult>) -> anyhow::Result<()> {
    match result {
        Some(result) => print_json(&result),
        None => bail!("Nothing was sent: check the arguments"),
    }
}

/// `None` here means the metric list came out empty, which is not a failure.
fn print_metrics_result(result: Option<RequestResult>) -> anyhow::Result<()> {
    match result {
        Some(result) => print_json(&result),
        None => {
            info!("No metrics to push");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_pretty_snapshot(snapshot: &Snapshot) {
    println!(
        "Host Snapshot ({})",
        snapshot.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");

    match snapshot.cpu {
        Some(cpu) => println!("  CPU:    {:.1}%", cpu),
        None => println!("  CPU:    unavailable"),
    }
    match snapshot.memory {
        Some(memory) => println!("  Memory: {:.1} MB", memory),
        None => println!("  Memory: unavailable"),
    }
    match &snapshot.disk {
        Some(disk) => println!("  Disk:   {} {:.1}% used", disk.name, disk.capacity),
        None => println!("  Disk:   unavailable"),
    }
}
