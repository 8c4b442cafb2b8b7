//! Keyfile loading.
//!
//! The keyfile describes the fixed-width layout of a Return A record: one row
//! per field, in line order, with the month it belongs to, a `Type_Length`
//! cell such as `N5` or `A7`, and the field name. Workbooks are read with
//! `calamine`; a CSV export of the same sheet is also accepted.
use crate::error::{Result, RetaError};
use crate::types::{FieldSpan, FieldType, Schema, SchemaEntry};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use log::{debug, info};
use std::path::Path;

pub const MONTH_COLUMN: &str = "month";
pub const TYPE_LENGTH_COLUMN: &str = "Type_Length";
pub const NAME_COLUMN: &str = "new_names_for_real_this_time";

pub fn load_keyfile(path: &Path, sheet: &str) -> Result<Schema> {
    if !path.exists() {
        return Err(RetaError::schema_load(path, "keyfile not found"));
    }
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let rows = if is_csv {
        read_csv_rows(path)?
    } else {
        read_workbook_rows(path, sheet)?
    };
    let schema = parse_rows(path, rows)?;
    info!(
        "loaded {} keyfile entries from {} (line width {})",
        schema.entries.len(),
        path.display(),
        schema.line_width()
    );
    Ok(schema)
}

fn read_workbook_rows(path: &Path, sheet: &str) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| RetaError::schema_load(path, e))?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| RetaError::schema_load(path, format!("sheet {sheet:?}: {e}")))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| RetaError::schema_load(path, e))?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| RetaError::schema_load(path, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Build a schema from raw sheet rows, the first of which is the header.
pub fn parse_rows(path: &Path, rows: Vec<Vec<String>>) -> Result<Schema> {
    let mut rows = rows.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| RetaError::schema_load(path, "keyfile is empty"))?;
    let find = |name: &str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| RetaError::schema_load(path, format!("missing column {name:?}")))
    };
    let month_idx = find(MONTH_COLUMN)?;
    let type_idx = find(TYPE_LENGTH_COLUMN)?;
    let name_idx = find(NAME_COLUMN)?;

    let mut entries = Vec::new();
    for (i, row) in rows.enumerate() {
        // header is sheet row 1
        let sheet_row = i + 2;
        if row.iter().all(|c| c.trim().is_empty()) {
            debug!("skipping blank keyfile row {sheet_row}");
            continue;
        }
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");
        let (field_type, length) = parse_type_length(cell(type_idx)).map_err(|reason| {
            RetaError::SchemaFormat {
                row: sheet_row,
                reason,
            }
        })?;
        entries.push(SchemaEntry {
            month: month_code(cell(month_idx)),
            field_name: cell(name_idx).to_string(),
            field_type,
            length,
        });
    }
    Ok(Schema { entries })
}

/// `January` -> `jan`, `Header` -> `hea`.
pub fn month_code(month: &str) -> String {
    month.to_lowercase().chars().take(3).collect()
}

/// Split a `Type_Length` cell (`N5`, `A12`) into its type and byte length.
pub fn parse_type_length(raw: &str) -> std::result::Result<(FieldType, usize), String> {
    let mut chars = raw.chars();
    let field_type = match chars.next() {
        Some('N') => FieldType::Numeric,
        Some('A') => FieldType::Alpha,
        Some(other) => return Err(format!("unknown type character {other:?} in {raw:?}")),
        None => return Err("empty Type_Length".to_string()),
    };
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("length {digits:?} in {raw:?} is not a positive integer"));
    }
    let length: usize = digits
        .parse()
        .map_err(|_| format!("length {digits:?} in {raw:?} is not a positive integer"))?;
    if length == 0 {
        return Err(format!("length in {raw:?} must be positive"));
    }
    Ok((field_type, length))
}

/// Running offset plan: each field starts where the previous one ended.
pub fn offset_plan(schema: &Schema) -> Vec<FieldSpan> {
    let mut offset = 0;
    schema
        .entries
        .iter()
        .map(|e| {
            let span = FieldSpan {
                key: e.key(),
                field_type: e.field_type,
                start: offset,
                end: offset + e.length,
            };
            offset += e.length;
            span
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_keyfile(body: &str) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_csv_keyfile_in_order() {
        let f = csv_keyfile(
            "month,Type_Length,new_names_for_real_this_time,notes\n\
             Header,A7,ori,x\n\
             January,N5,murder_2,\n\
             ,,,\n\
             December,N5,murder_2,\n",
        );
        let schema = load_keyfile(f.path(), "New Variables").unwrap();
        let keys: Vec<String> = schema.entries.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["hea||ori", "jan||murder_2", "dec||murder_2"]);
        assert_eq!(schema.entries[0].field_type, FieldType::Alpha);
        assert_eq!(schema.line_width(), 17);
    }

    #[test]
    fn missing_keyfile_is_a_load_error() {
        let err = load_keyfile(Path::new("/nonexistent/keyfile.xlsx"), "New Variables");
        assert!(matches!(err, Err(RetaError::SchemaLoad { .. })));
    }

    #[test]
    fn missing_column_is_a_load_error() {
        let f = csv_keyfile("month,Type_Length\nJanuary,N5\n");
        let err = load_keyfile(f.path(), "New Variables").unwrap_err();
        match err {
            RetaError::SchemaLoad { reason, .. } => assert!(reason.contains(NAME_COLUMN)),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bad_length_fails_fast_with_row() {
        let f = csv_keyfile(
            "month,Type_Length,new_names_for_real_this_time\n\
             January,N5,a\n\
             January,N0,b\n",
        );
        let err = load_keyfile(f.path(), "New Variables").unwrap_err();
        assert!(matches!(err, RetaError::SchemaFormat { row: 3, .. }));
    }

    #[test]
    fn type_length_cells() {
        assert_eq!(parse_type_length("N3"), Ok((FieldType::Numeric, 3)));
        assert_eq!(parse_type_length("A12"), Ok((FieldType::Alpha, 12)));
        assert!(parse_type_length("").is_err());
        assert!(parse_type_length("X3").is_err());
        assert!(parse_type_length("N").is_err());
        assert!(parse_type_length("N-2").is_err());
        assert!(parse_type_length("Nabc").is_err());
        assert!(parse_type_length("N+5").is_err());
        assert!(parse_type_length("A 4").is_err());
    }

    #[test]
    fn offsets_partition_the_line() {
        let schema = Schema {
            entries: vec![
                SchemaEntry {
                    month: "hea".into(),
                    field_name: "a".into(),
                    field_type: FieldType::Numeric,
                    length: 3,
                },
                SchemaEntry {
                    month: "hea".into(),
                    field_name: "b".into(),
                    field_type: FieldType::Alpha,
                    length: 2,
                },
            ],
        };
        let plan = offset_plan(&schema);
        assert_eq!((plan[0].start, plan[0].end), (0, 3));
        assert_eq!((plan[1].start, plan[1].end), (3, 5));
        assert_eq!(plan[1].key, "hea||b");
    }

    #[test]
    fn month_codes_are_three_lowercase_letters() {
        assert_eq!(month_code("January"), "jan");
        assert_eq!(month_code("HEADER"), "hea");
        assert_eq!(month_code("de"), "de");
    }
}
