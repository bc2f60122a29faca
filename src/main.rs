//! Search Console weekly report CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use search_console_report::{
    ReportConfig, ReportFetcher, ReportOutcome, SearchConsoleClient,
};

#[derive(Parser, Debug)]
#[command(name = "search-console-report")]
#[command(author, version, about = "Weekly Search Console performance report", long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Property to query, overriding the configuration
    #[arg(long)]
    site_url: Option<String>,

    /// Service account key file, overriding the configuration
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Query as the service account itself instead of the delegated subject
    #[arg(long)]
    no_subject: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<ReportConfig, Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };

    if let Some(ref site_url) = args.site_url {
        config.site_url = site_url.clone();
    }
    if let Some(ref credentials) = args.credentials {
        config.credentials_path = credentials.clone();
    }
    if args.no_subject {
        config.delegated_subject = None;
    }
    config.debug |= args.debug;
    config.validate()?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args)?;
    init_tracing(config.debug);

    tracing::debug!(
        site_url = %config.site_url,
        credentials = %config.credentials_path.display(),
        subject = ?config.delegated_subject,
        "Configuration loaded"
    );

    let client = SearchConsoleClient::new(config.clone())?;
    let fetcher = ReportFetcher::new(config, client);

    match fetcher.fetch_weekly_report().await {
        Ok(ReportOutcome::Report(report)) => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Ok(ReportOutcome::NoData) => {
            eprintln!("No search analytics data for the reporting period");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(category = %e.category(), "Search Console API error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
