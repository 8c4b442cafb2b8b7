//! Reporting completeness: how many months an agency actually submitted.
use crate::types::{Schema, Table, Value};
use log::debug;

/// Field name fragment of the per-month card 1 report type code.
pub const INDICATOR_MARKER: &str = "card1_type";
/// Type codes meaning the month was reported (2: with activity, 5: no activity).
pub const REPORTED_CODES: [f64; 2] = [2.0, 5.0];
pub const MONTHS_REPORTED_COLUMN: &str = "manual_months_reported";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportingPlan {
    pub indicators: Vec<String>,
}

impl ReportingPlan {
    pub fn from_schema(schema: &Schema) -> Self {
        let mut indicators: Vec<String> = Vec::new();
        for entry in &schema.entries {
            let key = entry.key();
            if entry.field_name.contains(INDICATOR_MARKER) && !indicators.contains(&key) {
                indicators.push(key);
            }
        }
        Self { indicators }
    }

    /// Append `manual_months_reported`, the count of indicator columns holding
    /// a reported code. Indicator columns are left in place.
    pub fn apply(&self, table: &mut Table) {
        let mut counts = vec![0u32; table.n_rows()];
        for key in &self.indicators {
            let Some(col) = table.column(key) else {
                continue;
            };
            for (count, v) in counts.iter_mut().zip(&col.values) {
                if v.as_number().is_some_and(|code| REPORTED_CODES.contains(&code)) {
                    *count += 1;
                }
            }
        }
        debug!("derived months reported from {} indicator columns", self.indicators.len());
        table.set_column(
            MONTHS_REPORTED_COLUMN,
            counts.into_iter().map(|c| Value::Number(f64::from(c))).collect(),
        );
    }
}
