// Utility helpers for lenient parsing and rendering.
//
// Historical Return A files are dirty: blank numeric fields, stray letters,
// short lines. Everything forgiving about that lives here so the pipeline
// stages can stay strict about structure.
use crate::types::Value;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64`, returning `None` for anything that
/// is not a number.
///
/// - Trims surrounding whitespace (fixed-width fields are space padded).
/// - Blank text is `None`.
/// - `NaN` is treated as missing, never as a value.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Decode Latin-1 bytes. Each byte maps to the code point of the same value,
/// so byte offsets in the source line equal character offsets.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Split raw file contents into record lines.
///
/// A trailing `\r` is stripped from each line and the empty remainder after
/// a final newline is not a record.
pub fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = data
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect();
    if data.is_empty() || data.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

/// Render a cell for CSV output. Integral numbers drop the decimal point,
/// missing values are empty.
pub fn render_value(v: &Value) -> String {
    match v {
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
            format!("{}", *n as i64)
        }
        Value::Number(n) => n.to_string(),
        Value::Text(s) => s.clone(),
        Value::Missing => String::new(),
    }
}

/// Row, column and file counts for console lines: `18712` -> `18,712`.
pub fn format_count(n: usize) -> String {
    n.to_formatted_string(&Locale::en)
}
