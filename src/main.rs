use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qrep::config::{Command, CommandLineArgs, Config, DiffArgs, IntersectArgs, LoggingConfig};
use qrep::services::{
    CaptureService, Denylist, DiffEngine, FilterPolicy, IntersectionEngine, MySQLClient,
    StatementSource, SweepService, diff_summary, intersection_summary, read_host_map, render_diff,
    render_intersection,
};
use qrep::utils::{QrepResult, StringExt};

#[tokio::main]
async fn main() -> ExitCode {
    // DSN and QREP_* may come from a local .env file
    dotenvy::dotenv().ok();

    let args = CommandLineArgs::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        },
    }
}

async fn run(args: CommandLineArgs) -> anyhow::Result<()> {
    let config = Config::load(&args)?;
    let _guard = init_logging(&config.logging);
    tracing::debug!("Configuration loaded");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Command::Capture(_) => capture(&config, &mut out).await?,
        Command::Diff(diff) => compare(&config, diff, &mut out)?,
        Command::Intersect(intersect) => rank(&config, intersect, &mut out)?,
        Command::Sweep(_) => sweep(&config, &mut out, &mut io::stderr().lock()).await?,
    }

    out.flush().context("failed to flush output")?;
    Ok(())
}

/// Logs go to stderr; stdout carries the reports
fn init_logging(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_filter = tracing_subscriber::EnvFilter::new(&logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    let Some(log_file) = &logging.file else {
        registry.with(tracing_subscriber::fmt::layer().with_writer(io::stderr)).init();
        return None;
    };

    let log_path = std::path::Path::new(log_file);
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_dir = log_path
        .parent()
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty())
        .unwrap_or(".");
    let file_name = log_path.file_name().and_then(|n| n.to_str()).unwrap_or("qrep.log");
    // The rolling appender adds a date suffix
    let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

    let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    registry
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    Some(guard)
}

fn filter_policy(config: &Config) -> anyhow::Result<FilterPolicy> {
    let denylist = Denylist::load(config.denylist_path().as_deref())?;
    tracing::debug!(entries = denylist.len(), "Denylist ready");
    Ok(FilterPolicy::new(denylist))
}

async fn capture<W: Write>(config: &Config, out: &mut W) -> anyhow::Result<()> {
    let dsn = config.capture.dsn.clean().context("no DSN given: use --dsn or set DSN")?;

    let service = CaptureService::new(filter_policy(config)?);
    let client = MySQLClient::from_url(&dsn)?;

    let captured = service.capture(&client, &config.capture_options(), out).await;
    let disconnected = client.disconnect().await;
    captured?;
    disconnected?;
    Ok(())
}

fn compare<W: Write>(config: &Config, args: &DiffArgs, out: &mut W) -> anyhow::Result<()> {
    let engine = DiffEngine::new(config.diff.deviation)?;
    let results = engine.compare_files(&args.old, &args.new)?;

    render_diff(&results, out)?;
    writeln!(out, "{}", diff_summary(&results, engine.deviation()))?;
    Ok(())
}

fn rank<W: Write>(config: &Config, args: &IntersectArgs, out: &mut W) -> anyhow::Result<()> {
    let engine = IntersectionEngine::new(config.intersection_config());
    let outcome = engine.intersect_files(args.files.as_slice())?;

    render_intersection(&outcome, args.top, out)?;
    if !outcome.entries.is_empty() {
        writeln!(out)?;
    }
    writeln!(out, "{}", intersection_summary(&outcome, engine.config().min_count))?;
    Ok(())
}

async fn sweep<W, E>(config: &Config, out: &mut W, err: &mut E) -> anyhow::Result<()>
where
    W: Write,
    E: Write,
{
    let hosts = read_host_map(&config.sweep.map)?;
    let options = config.sweep_options();
    tracing::info!(hosts = hosts.len(), old = %options.old, new = %options.new, "Starting sweep");

    let service = SweepService::new(
        CaptureService::new(filter_policy(config)?),
        Box::new(|dsn: &str| -> QrepResult<Box<dyn StatementSource>> {
            let client = MySQLClient::from_url(dsn)?;
            Ok(Box::new(client) as Box<dyn StatementSource>)
        }),
    );
    service.run(&hosts, &options, out, err).await?;
    Ok(())
}
