use std::path::PathBuf;

use chrono::{Local, TimeDelta};
use clap::{Parser, Subcommand};
use color_eyre::Result;
use env_logger::Env;
use log::info;

use netaudit::analysis::{self, AuditOutcome, ReportOptions, SourceReport};
use netaudit::config_loader::{self, CliOverrides};
use netaudit::freshness::{self, DEFAULT_MAX_DELAY_MINUTES};

/// Internet performance audit and ISP complaint report generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

/// Inputs shared by the commands that run the audit
#[derive(clap::Args, Debug)]
struct AuditArgs {
    /// Measurement report to merge (repeatable, replaces configured sources)
    #[arg(short, long = "source")]
    sources: Vec<PathBuf>,

    /// Traceroute log to scan for packet loss
    #[arg(short, long)]
    traceroute: Option<PathBuf>,

    /// Gap in minutes between samples that counts as an outage
    #[arg(long)]
    threshold_minutes: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the audit and print the complaint report
    Report {
        #[command(flatten)]
        audit: AuditArgs,

        /// Subscribed plan speed in Mbps
        #[arg(long)]
        plan_speed: Option<f64>,

        /// Provider addressed by the complaint
        #[arg(long)]
        provider: Option<String>,

        /// Also write the report text to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the computed statistics as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Run the audit and print summary statistics only
    Summary {
        #[command(flatten)]
        audit: AuditArgs,
    },

    /// Check whether the speed-test collector is still writing
    Status {
        /// Collector output file
        #[arg(short, long, default_value = "network_performance_report.csv")]
        file: PathBuf,

        /// Minutes without a write before the collector counts as stopped
        #[arg(long, default_value_t = DEFAULT_MAX_DELAY_MINUTES)]
        max_delay_minutes: i64,
    },
}

impl AuditArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            sources: self.sources.clone(),
            traceroute: self.traceroute.clone(),
            threshold_minutes: self.threshold_minutes,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging: flag, then config file, then "info"
    let level = args
        .log_level
        .clone()
        .or_else(|| config_loader::peek_log_level(args.config.as_deref()))
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut config = config_loader::load_or_default(args.config.as_deref())?;

    match args.command {
        Commands::Report {
            audit,
            plan_speed,
            provider,
            output,
            json,
        } => {
            let overrides = CliOverrides {
                plan_speed_mbps: plan_speed,
                provider,
                ..audit.overrides()
            };
            config_loader::apply_overrides(&mut config, &overrides)?;

            let report = match analysis::run_audit(&config)? {
                AuditOutcome::Complete(report) => report,
                AuditOutcome::NoData { sources } => return report_no_data(&sources),
            };

            let options = ReportOptions::from(&config);
            println!("{}", analysis::render_complaint(&report, &options));

            if let Some(path) = output {
                analysis::generate_text_report(&report, &options, &path)?;
            }
            if let Some(path) = json {
                analysis::generate_json_report(&report, &path)?;
            }
        }
        Commands::Summary { audit } => {
            config_loader::apply_overrides(&mut config, &audit.overrides())?;

            match analysis::run_audit(&config)? {
                AuditOutcome::Complete(report) => analysis::report::print_summary(&report),
                AuditOutcome::NoData { sources } => return report_no_data(&sources),
            }
        }
        Commands::Status {
            file,
            max_delay_minutes,
        } => {
            let status = freshness::check_freshness(
                &file,
                TimeDelta::minutes(max_delay_minutes),
                Local::now(),
            )?;
            println!("{}", status);
        }
    }

    info!("Audit completed successfully");
    Ok(())
}

fn report_no_data(sources: &[SourceReport]) -> Result<()> {
    for source in sources {
        info!("Source {}: {:?}", source.path().display(), source);
    }
    println!("No data found.");
    Ok(())
}
