//! Year batch driver: one fixed-width input file in, one CSV out.
//!
//! Files are processed one after another, each fully in memory. The first
//! failure aborts the run; outputs already written stay on disk.
use crate::aggregate::AggregationPlan;
use crate::config::Config;
use crate::error::{Result, RetaError};
use crate::extract::{extract, read_lines};
use crate::geo::Crosswalk;
use crate::output::write_table_csv;
use crate::reporting::ReportingPlan;
use crate::schema::load_keyfile;
use crate::types::{FileSummary, Schema, Table, Value};
use crate::util::format_count;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Create the input and output directories when they do not exist yet.
pub fn prepare_dirs(config: &Config) -> Result<()> {
    for dir in [&config.input_dir, &config.output_dir] {
        if !dir.exists() {
            info!("creating {}", dir.display());
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

/// Files of `dir`, sorted by name.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        } else {
            debug!("skipping non-file {}", entry.path().display());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if files.is_empty() {
        return Err(RetaError::NoInputFiles(dir.to_path_buf()));
    }
    Ok(files)
}

/// Year from the first four characters of a file name (`2005_RETA.DAT`).
pub fn parse_year(file_name: &str) -> Result<i32> {
    let prefix: String = file_name.chars().take(4).collect();
    prefix
        .trim()
        .parse()
        .map_err(|_| RetaError::FileNaming(file_name.to_string()))
}

/// Everything derived from the keyfile and crosswalk, built once per run.
#[derive(Debug)]
pub struct Pipeline {
    pub schema: Schema,
    pub aggregation: AggregationPlan,
    pub reporting: ReportingPlan,
    pub crosswalk: Option<Crosswalk>,
    pub join_column: String,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Result<Self> {
        let schema = load_keyfile(&config.keyfile, &config.keyfile_sheet)?;
        let crosswalk = match &config.crosswalk_path {
            Some(path) => Some(Crosswalk::from_tsv_file(path)?),
            None => None,
        };
        Ok(Self::new(schema, crosswalk, &config.join_column))
    }

    pub fn new(schema: Schema, crosswalk: Option<Crosswalk>, join_column: &str) -> Self {
        let aggregation = AggregationPlan::from_schema(&schema);
        let reporting = ReportingPlan::from_schema(&schema);
        Self {
            schema,
            aggregation,
            reporting,
            crosswalk,
            join_column: join_column.to_string(),
        }
    }

    /// Extract, aggregate, count reporting months and attach geo codes.
    pub fn run_lines<L: AsRef<[u8]>>(&self, lines: &[L]) -> (Table, FileSummary) {
        let (mut table, stats) = extract(lines, &self.schema);
        self.aggregation.apply(&mut table);
        self.reporting.apply(&mut table);
        let geo_matched = self
            .crosswalk
            .as_ref()
            .map(|cw| cw.join(&mut table, &self.join_column));

        let summary = FileSummary {
            year: 0,
            file: String::new(),
            rows: table.n_rows(),
            columns: table.n_cols(),
            blank_numeric: stats.blank_numeric_fields,
            coerced: stats.coerced_fields,
            truncated: stats.truncated_fields,
            geo_matched,
            output: String::new(),
        };
        (table, summary)
    }

    pub fn process_file(&self, path: &Path) -> Result<(Table, FileSummary)> {
        let lines = read_lines(path)?;
        Ok(self.run_lines(&lines))
    }
}

/// Process every file of the input directory and write one CSV per year.
pub fn run(config: &Config) -> Result<Vec<FileSummary>> {
    let files = discover_inputs(&config.input_dir)?;
    println!(
        "I identified {} files in {}.",
        format_count(files.len()),
        config.input_dir.display()
    );

    let pipeline = Pipeline::from_config(config)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut summaries = Vec::with_capacity(files.len());
    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let year = parse_year(&file_name)?;
        pb.set_message(file_name.clone());
        pb.suspend(|| {
            println!("==================  {year}  =======================");
            println!("filename: {file_name}");
        });

        let (mut table, mut summary) = pipeline.process_file(path)?;
        table.set_column(&config.year_column, vec![Value::Number(f64::from(year)); table.n_rows()]);

        let out = config.output_path(year);
        pb.suspend(|| println!("Writing result to {}", out.display()));
        write_table_csv(&out, &table)?;

        summary.year = year;
        summary.file = file_name;
        summary.columns = table.n_cols();
        summary.output = out.display().to_string();
        info!(
            "{}: {} rows, {} columns, {} coerced, {} truncated",
            summary.file,
            format_count(summary.rows),
            format_count(summary.columns),
            format_count(summary.coerced),
            format_count(summary.truncated)
        );
        summaries.push(summary);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(summaries)
}
