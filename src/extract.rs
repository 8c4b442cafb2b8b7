//! Fixed-width field extraction.
use crate::error::Result;
use crate::schema::offset_plan;
use crate::types::{ExtractStats, FieldType, Schema, Table, Value};
use crate::util::{decode_latin1, parse_f64_safe, split_lines};
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Read a data file as raw Latin-1 record lines.
pub fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    let data = fs::read(path)?;
    Ok(split_lines(&data).into_iter().map(<[u8]>::to_vec).collect())
}

/// Slice every line into one column per schema entry.
///
/// Offsets accumulate in schema order. A line shorter than the layout yields
/// truncated or empty text, and numeric text that does not parse becomes
/// `Value::Missing`; both are counted in the returned stats, never raised.
pub fn extract<L: AsRef<[u8]>>(lines: &[L], schema: &Schema) -> (Table, ExtractStats) {
    let mut table = Table::new(lines.len());
    let mut stats = ExtractStats {
        lines: lines.len(),
        ..Default::default()
    };

    for span in offset_plan(schema) {
        let mut values = Vec::with_capacity(lines.len());
        for line in lines {
            let line = line.as_ref();
            if span.end > line.len() {
                stats.truncated_fields += 1;
            }
            let start = span.start.min(line.len());
            let end = span.end.min(line.len());
            let text = decode_latin1(&line[start..end]);
            let value = match span.field_type {
                FieldType::Alpha => Value::Text(text),
                FieldType::Numeric => match parse_f64_safe(Some(&text)) {
                    Some(v) => Value::Number(v),
                    None => {
                        if text.trim().is_empty() {
                            stats.blank_numeric_fields += 1;
                        } else {
                            stats.coerced_fields += 1;
                        }
                        Value::Missing
                    }
                },
            };
            values.push(value);
        }
        if table.set_column(&span.key, values) {
            warn!("duplicate keyfile column {}; later entry overwrites it", span.key);
        }
    }

    debug!(
        "extracted {} lines x {} columns ({} coerced, {} truncated)",
        stats.lines,
        table.n_cols(),
        stats.coerced_fields,
        stats.truncated_fields
    );
    (table, stats)
}
