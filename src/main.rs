use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};

use vitalrs::api::SimulationRequest;
use vitalrs::config::AppConfig;
use vitalrs::detail::{DetailResolver, SimulationDayDetail};
use vitalrs::error::VitalError;
use vitalrs::features::format_feature;
use vitalrs::logging::{init_logging, LogLevel};
use vitalrs::models::{DayDetail, MergedSeries, Metric, TimeWindow};
use vitalrs::overlay::OverlayLoader;
use vitalrs::reconcile::merge;
use vitalrs::series::SeriesLoader;
use vitalrs::session::{Poller, QuerySlot};
use vitalrs::HttpMetricsApi;

/// vitalrs - actual vs. simulated health-metric series
///
/// Loads 1-5 scored health measurements from the backend, overlays them
/// with digital-twin forecasts, and resolves per-day detail records.
#[derive(Parser)]
#[command(name = "vitalrs")]
#[command(version = "0.1.0")]
#[command(about = "Health metric overlay engine", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the raw measurement series for a window
    Series {
        /// Metric to load (sleep, stress, activity)
        #[arg(short, long)]
        metric: Metric,

        /// Relative window: last N minutes
        #[arg(long, default_value = "60")]
        minutes: i64,

        /// Absolute window start (RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Absolute window end (RFC 3339)
        #[arg(long)]
        to: Option<String>,
    },

    /// Merge the real series with the latest forecast overlay
    Merged {
        #[arg(short, long)]
        metric: Metric,

        #[arg(long, default_value = "60")]
        minutes: i64,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },

    /// Resolve a single day's full record
    Detail {
        #[arg(short, long)]
        metric: Metric,

        /// Exact sample timestamp (RFC 3339)
        #[arg(long, conflicts_with = "date")]
        ts: Option<String>,

        /// Calendar date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Fall back to the sample nearest to noon when the date has no
        /// day-level record
        #[arg(long)]
        nearest: bool,

        /// Show the forecast entry for the date instead of the real record
        #[arg(long, requires = "date", conflicts_with_all = ["ts", "nearest"])]
        sim: bool,
    },

    /// Ask the simulation service for a fresh forecast
    Simulate {
        #[arg(short, long)]
        metric: Metric,

        /// Forecast horizon in minutes
        #[arg(long)]
        horizon: Option<i64>,
    },

    /// Clear stored forecasts for a metric
    Reset {
        #[arg(short, long)]
        metric: Metric,
    },

    /// Poll the merged view on an interval until interrupted
    Watch {
        #[arg(short, long)]
        metric: Metric,

        /// Window size per tick in minutes
        #[arg(long)]
        minutes: Option<i64>,

        /// Seconds between refreshes
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show the active configuration
    Config,
}

#[derive(Tabled)]
struct MergedRow {
    #[tabled(rename = "time")]
    ts: String,
    real: String,
    simulated: String,
}

fn score_cell(score: Option<u8>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow::anyhow!("invalid timestamp '{}': {}", s, e))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Build the active window from the CLI's relative/absolute arguments
fn resolve_window(minutes: i64, from: Option<&str>, to: Option<&str>) -> Result<TimeWindow> {
    match (from, to) {
        (Some(from), Some(to)) => {
            Ok(TimeWindow::new(parse_instant(from)?, parse_instant(to)?)?)
        }
        (None, None) => Ok(TimeWindow::last_minutes(minutes, Utc::now())?),
        _ => anyhow::bail!("--from and --to must be given together"),
    }
}

fn print_merged(series: &MergedSeries) {
    if series.records.is_empty() {
        println!("{}", "No measurements in this window".yellow());
        return;
    }

    let rows: Vec<MergedRow> = series
        .records
        .iter()
        .map(|r| MergedRow {
            ts: r.ts.to_rfc3339(),
            real: score_cell(r.real),
            simulated: if series.has_overlay {
                score_cell(r.simulated)
            } else {
                String::new()
            },
        })
        .collect();

    println!("{}", Table::new(rows));
    if !series.has_overlay {
        println!("{}", "No forecast overlay for this window".dimmed());
    }
}

fn print_detail(detail: &DayDetail) {
    println!("{} {}", "Timestamp:".bold(), detail.ts.to_rfc3339());
    println!("{} {}", "Score:".bold(), score_cell(detail.score));
    if let Some(source) = &detail.source {
        println!("{} {}", "Source:".bold(), source);
    }
    if let Some(scored_at) = detail.scored_at {
        println!("{} {}", "Scored at:".bold(), scored_at.to_rfc3339());
    }
    if let Some(advice) = &detail.advice {
        println!("{} {}", "Advice:".bold(), advice);
    }
    if !detail.features.is_empty() {
        println!("{}", "Features:".bold());
        for (key, value) in &detail.features {
            println!("  {}: {}", key, format_feature(key, value));
        }
    }
}

fn print_simulation_detail(detail: &SimulationDayDetail) {
    println!("{} {}", "Timestamp:".bold(), detail.ts.to_rfc3339());
    println!("{} {}", "Base score:".bold(), score_cell(detail.base));
    println!("{} {}", "Simulated:".bold(), score_cell(detail.simulated));
    if let Some(delta) = detail.delta {
        println!("{} {:+}", "Delta:".bold(), delta);
    }
    if let Some(created_at) = detail.created_at {
        println!("{} {}", "Generated:".bold(), created_at.to_rfc3339());
    }
    if let Some(rationale) = &detail.rationale {
        println!("{} {}", "Rationale:".bold(), rationale);
    }
    if !detail.interventions.is_empty() {
        println!("{}", "Interventions:".bold());
        for iv in &detail.interventions {
            println!("  {}: {}", iv.title, iv.description);
        }
    }
}

/// Empty results render as placeholders, not error banners
fn report_error(err: VitalError) -> Result<()> {
    if err.is_empty_result() {
        println!("{}", err.user_message().yellow());
        Ok(())
    } else {
        Err(anyhow::anyhow!(err.user_message()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    // Verbosity flag overrides the configured log level
    match cli.verbose {
        0 => {}
        1 => config.logging.level = LogLevel::Debug,
        _ => config.logging.level = LogLevel::Trace,
    }
    init_logging(&config.logging)?;

    let api = Arc::new(HttpMetricsApi::new(&config.server)?);
    let series_loader = SeriesLoader::new(api.clone());
    let overlay_loader = OverlayLoader::new(api.clone());
    let resolver = DetailResolver::new(api.clone());

    match cli.command {
        Commands::Series { metric, minutes, from, to } => {
            let window = resolve_window(minutes, from.as_deref(), to.as_deref())?;
            match series_loader.load(metric, &window).await {
                Ok(points) => {
                    if points.is_empty() {
                        println!("{}", "No measurements in this window".yellow());
                    }
                    for p in points {
                        println!("{}  {}", p.ts.to_rfc3339(), score_cell(vitalrs::normalize(p.value)));
                    }
                }
                Err(err) => return report_error(err),
            }
        }

        Commands::Merged { metric, minutes, from, to } => {
            // Relative selections go through the server-side `minutes` shape;
            // explicit bounds use the absolute from/to shape
            let merged = if from.is_none() && to.is_none() {
                let (real, overlay) = tokio::join!(
                    series_loader.load_last_minutes(metric, minutes),
                    overlay_loader.load_latest(metric),
                );
                match (real, overlay) {
                    (Ok((window, real)), Ok(overlay)) => {
                        Ok((merge(&real, &overlay, &window), overlay.created_at))
                    }
                    (Err(err), _) | (_, Err(err)) => Err(err),
                }
            } else {
                let window = resolve_window(minutes, from.as_deref(), to.as_deref())?;
                let (real, overlay) = tokio::join!(
                    series_loader.load(metric, &window),
                    overlay_loader.load_latest(metric),
                );
                match (real, overlay) {
                    (Ok(real), Ok(overlay)) => {
                        Ok((merge(&real, &overlay, &window), overlay.created_at))
                    }
                    (Err(err), _) | (_, Err(err)) => Err(err),
                }
            };
            match merged {
                Ok((series, created_at)) => {
                    print_merged(&series);
                    if series.has_overlay {
                        if let Some(created_at) = created_at {
                            println!(
                                "{}",
                                format!("Forecast generated {}", created_at.to_rfc3339()).dimmed()
                            );
                        }
                    }
                }
                Err(err) => return report_error(err),
            }
        }

        Commands::Detail { metric, ts, date, nearest, sim } => {
            if sim {
                let date = date.ok_or_else(|| anyhow::anyhow!("--sim requires --date"))?;
                match resolver.simulation_for_date(metric, date).await {
                    Ok(detail) => print_simulation_detail(&detail),
                    Err(err) => return report_error(err),
                }
            } else {
                let result = match (ts, date) {
                    (Some(ts), None) => resolver.by_timestamp(metric, parse_instant(&ts)?).await,
                    (None, Some(date)) if nearest => resolver.resolve_for_date(metric, date).await,
                    (None, Some(date)) => resolver.by_date(metric, date).await,
                    _ => anyhow::bail!("exactly one of --ts or --date is required"),
                };
                match result {
                    Ok(detail) => print_detail(&detail),
                    Err(err) => return report_error(err),
                }
            }
        }

        Commands::Simulate { metric, horizon } => {
            println!("{}", format!("Generating {} forecast...", metric).blue().bold());
            let request = SimulationRequest { horizon_minutes: horizon };
            match overlay_loader.generate(metric, &request).await {
                Ok(overlay) => {
                    println!(
                        "{}",
                        format!("Forecast ready: {} points", overlay.points.len()).blue()
                    );
                }
                Err(err) => return report_error(err),
            }
        }

        Commands::Reset { metric } => match overlay_loader.reset(metric).await {
            Ok(deleted) => {
                println!("{}", format!("Cleared {} forecast(s) for {}", deleted, metric).green());
            }
            Err(err) => return report_error(err),
        },

        Commands::Watch { metric, minutes, interval } => {
            let minutes = minutes.unwrap_or(config.polling.default_minutes);
            let interval = Duration::from_secs(interval.unwrap_or(config.polling.interval_seconds));

            let slot: Arc<QuerySlot<MergedSeries>> = Arc::new(QuerySlot::new());
            let poller = {
                let api = api.clone();
                Poller::spawn(interval, slot.clone(), move || {
                    let series_loader = SeriesLoader::new(api.clone());
                    let overlay_loader = OverlayLoader::new(api.clone());
                    async move {
                        let (window, real) =
                            series_loader.load_last_minutes(metric, minutes).await?;
                        let overlay = overlay_loader.load_latest(metric).await?;
                        Ok(merge(&real, &overlay, &window))
                    }
                })
            };

            println!(
                "{}",
                format!("Watching {} every {}s (Ctrl-C to stop)", metric, interval.as_secs())
                    .bold()
            );
            let mut print_tick = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = print_tick.tick() => {
                        if let Some(series) = slot.latest() {
                            print_merged(&series);
                        }
                    }
                }
            }
            poller.stop().await;
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
