#![cfg(not(tarpaulin_include))]

use clap::Parser;
use growth_sheet::app;
use growth_sheet::config::AnalysisConfig;
use std::path::PathBuf;

/// Web front end for uploading assessment sessions
#[derive(Parser, Debug)]
#[command(name = "website", version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// JSON configuration file (sheet range, allowed columns, upload slots)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Main entry point for the web application
///
/// Initializes logging from `RUST_LOG` (default `info`), loads the optional
/// configuration file and serves the upload page.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    app::run(&args.addr, config).await
}
