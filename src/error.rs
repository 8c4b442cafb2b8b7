use std::path::PathBuf;

/// Failures that abort a batch run.
///
/// Lenient cases (non-numeric text in a numeric field, lines shorter than the
/// layout) are not errors; they are counted in `ExtractStats` instead.
#[derive(Debug, thiserror::Error)]
pub enum RetaError {
    /// Keyfile or crosswalk missing, unreadable, or lacking a required column
    #[error("failed to load {}: {reason}", .path.display())]
    SchemaLoad { path: PathBuf, reason: String },

    /// A keyfile row whose `Type_Length` cell cannot be used
    #[error("malformed keyfile entry at row {row}: {reason}")]
    SchemaFormat { row: usize, reason: String },

    /// Input file name does not start with a four digit year
    #[error(
        "cannot read a year from file name {0:?}; rename each file to start with the year (ex: RETA05.DAT -> 2005_RETA.DAT)"
    )]
    FileNaming(String),

    /// Input directory holds no data files
    #[error("no input files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl RetaError {
    pub fn schema_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SchemaLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RetaError>;
