//! Attaching FIPS codes from the ICPSR law enforcement crosswalk (study 35158).
use crate::error::{Result, RetaError};
use crate::types::{Table, Value};
use crate::util::render_value;
use csv::ReaderBuilder;
use log::{info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// `ORI7` value of crosswalk rows with no agency.
pub const INVALID_ORI: &str = "-1";

/// Crosswalk columns and the output names they are joined under.
pub const GEO_COLUMNS: [(&str, &str); 3] = [
    ("FIPS_ST", "STATEFP"),
    ("FIPS_COUNTY", "COUNTYFP"),
    ("FPLACE", "PLACEFP"),
];
const ORI_COLUMN: &str = "ORI7";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoCodes {
    pub state: Option<String>,
    pub county: Option<String>,
    pub place: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Crosswalk {
    entries: HashMap<String, GeoCodes>,
    pub duplicates: usize,
}

impl Crosswalk {
    pub fn from_tsv_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| RetaError::schema_load(path, e))?;
        let crosswalk = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            RetaError::SchemaLoad { reason, .. } => RetaError::schema_load(path, reason),
            other => other,
        })?;
        info!(
            "loaded {} crosswalk agencies from {}",
            crosswalk.len(),
            path.display()
        );
        if crosswalk.is_empty() {
            warn!("crosswalk {} has no usable agencies", path.display());
        }
        if crosswalk.duplicates > 0 {
            warn!(
                "{} duplicate ORI7 rows in crosswalk; first occurrence kept",
                crosswalk.duplicates
            );
        }
        Ok(crosswalk)
    }

    /// Parse a tab separated crosswalk. All values are kept as text.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| RetaError::schema_load("crosswalk", format!("missing column {name:?}")))
        };
        let ori_idx = position(ORI_COLUMN)?;
        let state_idx = position(GEO_COLUMNS[0].0)?;
        let county_idx = position(GEO_COLUMNS[1].0)?;
        let place_idx = position(GEO_COLUMNS[2].0)?;

        let mut crosswalk = Crosswalk::default();
        for record in rdr.records() {
            let record = record?;
            let Some(ori) = record.get(ori_idx) else {
                continue;
            };
            if ori == INVALID_ORI {
                continue;
            }
            let text = |idx: usize| {
                record
                    .get(idx)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            let codes = GeoCodes {
                state: text(state_idx),
                county: text(county_idx),
                place: text(place_idx),
            };
            if crosswalk.entries.contains_key(ori) {
                crosswalk.duplicates += 1;
            } else {
                crosswalk.entries.insert(ori.to_string(), codes);
            }
        }
        Ok(crosswalk)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, ori: &str) -> Option<&GeoCodes> {
        self.entries.get(ori)
    }

    /// Left join on `key_column`: every row is kept, unmatched rows get
    /// missing codes. Returns the number of matched rows.
    pub fn join(&self, table: &mut Table, key_column: &str) -> usize {
        let rows = table.n_rows();
        let matches: Vec<Option<&GeoCodes>> = match table.column(key_column) {
            Some(col) => col
                .values
                .iter()
                .map(|v| match v {
                    Value::Missing => None,
                    other => self.get(&render_value(other)),
                })
                .collect(),
            None => {
                warn!("join column {key_column} not in table; geo codes left missing");
                vec![None; rows]
            }
        };
        let matched = matches.iter().filter(|m| m.is_some()).count();

        let text = |v: Option<&String>| v.map_or(Value::Missing, |s| Value::Text(s.clone()));
        let mut state = Vec::with_capacity(rows);
        let mut county = Vec::with_capacity(rows);
        let mut place = Vec::with_capacity(rows);
        for m in &matches {
            state.push(text(m.and_then(|c| c.state.as_ref())));
            county.push(text(m.and_then(|c| c.county.as_ref())));
            place.push(text(m.and_then(|c| c.place.as_ref())));
        }
        table.set_column(GEO_COLUMNS[0].1, state);
        table.set_column(GEO_COLUMNS[1].1, county);
        table.set_column(GEO_COLUMNS[2].1, place);
        matched
    }
}
