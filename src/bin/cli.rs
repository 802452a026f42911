#![cfg(not(tarpaulin_include))]

use clap::Parser;
use growth_sheet::aggregator::SessionAggregator;
use growth_sheet::config::AnalysisConfig;
use growth_sheet::graph::{self, GraphOptions};
use growth_sheet::loader::{label_from_file_name, load_table};
use growth_sheet::report::{AnalysisReport, SummaryKind};
use std::fs;
use std::path::PathBuf;

/// Batch analysis of assessment sessions
///
/// Files are ingested in the order given. Without `--label`, each session is
/// labelled from its file name (`2015.xlsx` becomes `2015`).
#[derive(Parser, Debug)]
#[command(name = "cli", version)]
struct Args {
    /// Session files (.xlsx, .xls, .ods, .csv) in measurement order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Label for each file, in the same order; repeat once per file
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Column to plot and fit
    #[arg(long)]
    column: Option<String>,

    /// Summary to print: averages, changes or trend
    #[arg(long, default_value = "averages")]
    summary: SummaryKind,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for line.png, radar.png and averages.csv
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print the full report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    let mut aggregator = SessionAggregator::new(config);
    for (i, path) in args.files.iter().enumerate() {
        let label = match args.labels.get(i) {
            Some(label) => label.clone(),
            None => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(label_from_file_name)
                .unwrap_or_default(),
        };
        match load_table(path, &aggregator.config().range) {
            Ok(table) => aggregator.ingest(table, &label),
            Err(e) => eprintln!("warning: skipping {}: {}", path.display(), e),
        }
    }

    let report = AnalysisReport::build(&aggregator, args.column.as_deref(), args.summary)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }

    if let Some(out_dir) = &args.out_dir {
        fs::create_dir_all(out_dir)?;
        fs::write(
            out_dir.join("averages.csv"),
            growth_sheet::downloader::to_csv(&aggregator)?,
        )?;

        if let Some(column) = &report.selected_column {
            if !report.series.is_empty() {
                let options = GraphOptions {
                    title: format!("{} Growth Over Time", column),
                    ..GraphOptions::default()
                };
                let png = graph::create_line_chart(&report.series, report.trend.as_ref(), &options)?;
                fs::write(out_dir.join("line.png"), png)?;
            }
        }
        if let Some(snapshot) = &report.snapshot {
            let png = graph::create_radar_chart(snapshot, None, &GraphOptions::default())?;
            fs::write(out_dir.join("radar.png"), png)?;
        }
        println!("wrote charts to {}", out_dir.display());
    }

    Ok(())
}
