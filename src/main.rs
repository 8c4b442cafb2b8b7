// Entry point: turn yearly Return A fixed-width files into CSV tables.
//
// Every file in the input directory is named after its year
// (`2005_RETA.DAT`). Each one is sliced with the keyfile layout, the
// per-month offense sub-counts are collapsed into one count per category,
// the number of reported months is derived, FIPS codes are attached when a
// crosswalk is configured, and the result is written to `RETA{year}.csv`.
mod aggregate;
mod batch;
mod config;
mod error;
mod extract;
mod geo;
mod output;
mod reporting;
mod schema;
mod types;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use log::warn;
use std::path::PathBuf;
use types::RunSummary;

/// Convert Return A fixed-width files to one CSV per year
#[derive(Parser)]
#[command(name = "reta_extract")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML configuration file; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of yearly Return A files
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,

    /// Directory for the RETA{year}.csv outputs
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Keyfile workbook (or CSV export of its sheet)
    #[arg(short, long, value_name = "FILE")]
    keyfile: Option<PathBuf>,

    /// Keyfile sheet name
    #[arg(long)]
    sheet: Option<String>,

    /// ICPSR crosswalk TSV (35158-0001-Data.tsv)
    #[arg(short = 'x', long, value_name = "FILE")]
    crosswalk: Option<PathBuf>,

    /// Skip writing run_summary.json
    #[arg(long)]
    no_summary: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(keyfile) = self.keyfile {
            config.keyfile = keyfile;
        }
        if let Some(sheet) = self.sheet {
            config.keyfile_sheet = sheet;
        }
        if self.crosswalk.is_some() {
            config.crosswalk_path = self.crosswalk;
        }
        if self.no_summary {
            config.summary_json = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = cli.into_config()?;

    if config.crosswalk_path.is_none() {
        warn!("ICPSR crosswalk not set; no STATE, COUNTY, or PLACE fips codes will be attached");
        println!("ICPSR Crosswalk file can be found at https://www.icpsr.umich.edu/web/ICPSR/studies/35158.");
        println!("Once downloaded, pass the path to 35158-0001-Data.tsv with --crosswalk.\n");
    }

    batch::prepare_dirs(&config).context("Failed to create data directories")?;
    let summaries = batch::run(&config).context("Batch run failed")?;

    output::preview_table(
        &format!("Processed {} files", util::format_count(summaries.len())),
        &summaries,
    );

    if config.summary_json {
        let path = config.output_dir.join("run_summary.json");
        let summary = RunSummary::new(summaries);
        output::write_summary_json(&path, &summary)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "Run summary written to {} ({} rows, {} coerced fields, {} truncated fields)",
            path.display(),
            util::format_count(summary.total_rows),
            util::format_count(summary.total_coerced),
            util::format_count(summary.total_truncated)
        );
    }
    Ok(())
}
