//! Run configuration.
//!
//! Built once in `main` and passed down to the batch driver. Every field can
//! come from a TOML file:
//!
//! ```toml
//! input_dir = "RETA_data"
//! output_dir = "output"
//! keyfile = "RETURN-A_Keyfile.xlsx"
//! crosswalk_path = "35158-0001-Data.tsv"
//! ```
//!
//! and command-line flags override the file.
use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_DIR: &str = "RETA_data";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_KEYFILE: &str = "RETURN-A_Keyfile.xlsx";
pub const DEFAULT_KEYFILE_SHEET: &str = "New Variables";
pub const DEFAULT_JOIN_COLUMN: &str = "hea||ori";
pub const DEFAULT_YEAR_COLUMN: &str = "hea||year";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory of fixed-width Return A files, one per year.
    pub input_dir: PathBuf,
    /// Directory receiving `RETA{year}.csv`.
    pub output_dir: PathBuf,
    pub keyfile: PathBuf,
    pub keyfile_sheet: String,
    /// ICPSR crosswalk TSV; geo codes are skipped when unset.
    pub crosswalk_path: Option<PathBuf>,
    /// Column matched against the crosswalk `ORI7`.
    pub join_column: String,
    /// Column stamped with the year parsed from each file name.
    pub year_column: String,
    /// Write `run_summary.json` next to the outputs.
    pub summary_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            keyfile: PathBuf::from(DEFAULT_KEYFILE),
            keyfile_sheet: DEFAULT_KEYFILE_SHEET.to_string(),
            crosswalk_path: None,
            join_column: DEFAULT_JOIN_COLUMN.to_string(),
            year_column: DEFAULT_YEAR_COLUMN.to_string(),
            summary_json: true,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn output_path(&self, year: i32) -> PathBuf {
        self.output_dir.join(format!("RETA{year}.csv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = Config::from_toml(
            r#"
            input_dir = "data"
            crosswalk_path = "xwalk.tsv"
            summary_json = false
            "#,
        )
        .unwrap();
        assert_eq!(config.input_dir, PathBuf::from("data"));
        assert_eq!(config.crosswalk_path, Some(PathBuf::from("xwalk.tsv")));
        assert!(!config.summary_json);
        assert_eq!(config.keyfile_sheet, DEFAULT_KEYFILE_SHEET);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("crosswalk = 1").is_err());
    }

    #[test]
    fn output_is_named_by_year() {
        let config = Config::default();
        assert_eq!(config.output_path(2005), PathBuf::from("output/RETA2005.csv"));
    }
}
