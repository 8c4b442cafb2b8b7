use crate::util::parse_f64_safe;
use serde::Serialize;
use std::collections::HashSet;
use tabled::Tabled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Numeric,
    Alpha,
}

/// One keyfile row: a field of `length` bytes for a given month.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    /// Three letter lower-case month code (`jan`..`dec`, or `hea` for header fields).
    pub month: String,
    pub field_name: String,
    pub field_type: FieldType,
    pub length: usize,
}

impl SchemaEntry {
    /// Composite column key, `"{month}||{field_name}"`.
    pub fn key(&self) -> String {
        format!("{}||{}", self.month, self.field_name)
    }
}

/// Ordered keyfile layout. Position in `entries` determines byte offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub entries: Vec<SchemaEntry>,
}

impl Schema {
    pub fn line_width(&self) -> usize {
        self.entries.iter().map(|e| e.length).sum()
    }
}

/// Byte range of one field inside a record line.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpan {
    pub key: String,
    pub field_type: FieldType,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Numeric view of the cell; text is coerced leniently, failures are `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(s) => parse_f64_safe(Some(s)),
            Value::Missing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Column-oriented table; every column holds exactly `rows` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: usize,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Insert or overwrite a column. An existing column keeps its position.
    /// Returns `true` when a column of that name was replaced.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> bool {
        debug_assert_eq!(values.len(), self.rows, "column {name} has wrong length");
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => {
                existing.values = values;
                true
            }
            None => {
                self.columns.push(Column {
                    name: name.to_string(),
                    values,
                });
                false
            }
        }
    }

    /// Drop every column whose name is listed; unknown names are ignored.
    pub fn remove_columns(&mut self, names: &[String]) -> usize {
        if names.is_empty() {
            return 0;
        }
        let names: HashSet<&str> = names.iter().map(String::as_str).collect();
        let before = self.columns.len();
        self.columns.retain(|c| !names.contains(c.name.as_str()));
        before - self.columns.len()
    }

    /// Cell values of row `idx`, in column order.
    pub fn row(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(move |c| &c.values[idx])
    }
}

/// Leniency counters from one extraction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub lines: usize,
    /// Numeric fields that were blank.
    pub blank_numeric_fields: usize,
    /// Numeric fields holding non-blank text that is not a number.
    pub coerced_fields: usize,
    /// Fields whose byte range ran past the end of the line.
    pub truncated_fields: usize,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct FileSummary {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "File")]
    #[tabled(rename = "File")]
    pub file: String,
    #[serde(rename = "Rows")]
    #[tabled(rename = "Rows")]
    pub rows: usize,
    #[serde(rename = "Columns")]
    #[tabled(rename = "Columns")]
    pub columns: usize,
    #[serde(rename = "BlankNumeric")]
    #[tabled(rename = "BlankNumeric")]
    pub blank_numeric: usize,
    #[serde(rename = "Coerced")]
    #[tabled(rename = "Coerced")]
    pub coerced: usize,
    #[serde(rename = "Truncated")]
    #[tabled(rename = "Truncated")]
    pub truncated: usize,
    #[serde(rename = "GeoMatched")]
    #[tabled(rename = "GeoMatched", display_with = "display_geo")]
    pub geo_matched: Option<usize>,
    #[serde(rename = "Output")]
    #[tabled(rename = "Output")]
    pub output: String,
}

fn display_geo(v: &Option<usize>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "-".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileSummary>,
    pub total_rows: usize,
    pub total_coerced: usize,
    pub total_truncated: usize,
}

impl RunSummary {
    pub fn new(files: Vec<FileSummary>) -> Self {
        let total_rows = files.iter().map(|f| f.rows).sum();
        let total_coerced = files.iter().map(|f| f.coerced).sum();
        let total_truncated = files.iter().map(|f| f.truncated).sum();
        Self {
            files,
            total_rows,
            total_coerced,
            total_truncated,
        }
    }
}
