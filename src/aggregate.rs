//! Collapsing the per-month offense sub-columns into canonical counts.
//!
//! The December entries of the keyfile name the offense categories. Each
//! category except the last three (summary fields kept under their own name)
//! has four sub-counts, suffixed `_1` to `_4`; only the `_2` count (actual
//! offenses) survives, summed over every month. The `_1`, `_3` and `_4`
//! columns (unfounded, cleared by arrest, cleared under 18) are dropped, as
//! are the `card0`/`card2`/`card3` bookkeeping fields describing them.
//!
//! Which column feeds which category is decided once, from the schema, in
//! [`AggregationPlan::from_schema`]. Applying the plan is then a pure lookup.
use crate::types::{Schema, Table, Value};
use log::debug;

pub const CANONICAL_MONTH: &str = "dec";
pub const CANONICAL_SUFFIX: &str = "_2";
pub const SIBLING_SUFFIXES: [&str; 3] = ["_1", "_3", "_4"];
pub const AUXILIARY_MARKERS: [&str; 3] = ["card0", "card2", "card3"];
/// Trailing December entries that keep their name and have no sub-counts.
pub const CARRIED_THROUGH: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Output column name, e.g. `murder_2`.
    pub name: String,
    /// Composite keys summed into this category.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationPlan {
    pub categories: Vec<Category>,
    /// `_1`/`_3`/`_4` sub-count columns.
    pub sibling_drops: Vec<String>,
    /// Every column still named after `card0`/`card2`/`card3` once the sums
    /// are in place: unclaimed fields and marker-named sum columns alike.
    pub auxiliary_drops: Vec<String>,
}

impl AggregationPlan {
    pub fn from_schema(schema: &Schema) -> Self {
        let december: Vec<&str> = schema
            .entries
            .iter()
            .filter(|e| e.month == CANONICAL_MONTH)
            .map(|e| e.field_name.as_str())
            .collect();
        let split = december.len().saturating_sub(CARRIED_THROUGH);

        let mut base_keys: Vec<String> = Vec::new();
        let mut sibling_keys: Vec<String> = Vec::new();
        for (i, field) in december.iter().enumerate() {
            if i < split {
                let stem = strip_suffix(field);
                push_unique(&mut base_keys, format!("{stem}{CANONICAL_SUFFIX}"));
                for suffix in SIBLING_SUFFIXES {
                    push_unique(&mut sibling_keys, format!("{stem}{suffix}"));
                }
            } else {
                push_unique(&mut base_keys, field.to_string());
            }
        }

        let mut categories: Vec<Category> = base_keys
            .iter()
            .map(|k| Category {
                name: k.clone(),
                sources: Vec::new(),
            })
            .collect();
        let mut plan_sibling = Vec::new();
        let mut plan_auxiliary = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for entry in &schema.entries {
            let key = entry.key();
            if seen.contains(&key) {
                continue;
            }
            seen.push(key.clone());

            if let Some(idx) = best_match(&entry.field_name, &base_keys) {
                categories[idx].sources.push(key);
            } else if best_match(&entry.field_name, &sibling_keys).is_some() {
                plan_sibling.push(key);
            } else if has_marker(&key) {
                plan_auxiliary.push(key);
            }
        }

        categories.retain(|c| {
            if c.sources.is_empty() {
                debug!("category {} has no source columns, skipped", c.name);
            }
            !c.sources.is_empty()
        });
        for c in &categories {
            debug!("category {} <- {} columns", c.name, c.sources.len());
            if has_marker(&c.name) {
                plan_auxiliary.push(c.name.clone());
            }
        }
        Self {
            categories,
            sibling_drops: plan_sibling,
            auxiliary_drops: plan_auxiliary,
        }
    }

    /// Replace each category's source columns with their row-wise sum.
    ///
    /// Missing cells count as zero, so a row where every source is missing
    /// sums to 0. Sum columns are appended in category order. Sibling columns
    /// go next, then anything left whose name carries a card marker.
    pub fn apply(&self, table: &mut Table) {
        for category in &self.categories {
            let mut sums = vec![0.0; table.n_rows()];
            for source in &category.sources {
                let Some(col) = table.column(source) else {
                    continue;
                };
                for (acc, v) in sums.iter_mut().zip(&col.values) {
                    if let Some(x) = v.as_number() {
                        *acc += x;
                    }
                }
            }
            table.remove_columns(&category.sources);
            table.set_column(&category.name, sums.into_iter().map(Value::Number).collect());
        }
        let dropped = table.remove_columns(&self.sibling_drops)
            + table.remove_columns(&self.auxiliary_drops);
        debug!(
            "aggregated {} categories, dropped {} sub-count columns",
            self.categories.len(),
            dropped
        );
    }
}

/// Drop the two-character sub-count suffix (`murder_1` -> `murder`).
fn strip_suffix(field: &str) -> &str {
    let cut = field
        .char_indices()
        .rev()
        .nth(1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &field[..cut]
}

fn has_marker(name: &str) -> bool {
    AUXILIARY_MARKERS.iter().any(|m| name.contains(m))
}

fn push_unique(keys: &mut Vec<String>, key: String) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

/// `needle` occurs in `name` with `_` or the name edge on both sides.
fn contains_token(name: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    name.match_indices(needle).any(|(i, _)| {
        let before = name[..i].chars().next_back();
        let after = name[i + needle.len()..].chars().next();
        matches!(before, None | Some('_')) && matches!(after, None | Some('_'))
    })
}

/// Index of the longest key found in `name`; the first one wins a tie.
fn best_match(name: &str, keys: &[String]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, key) in keys.iter().enumerate() {
        if !contains_token(name, key) {
            continue;
        }
        match best {
            Some(b) if keys[b].len() >= key.len() => {
                debug!("{name} also matches {key}, keeping {}", keys[b]);
            }
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldType, SchemaEntry};

    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];

    fn entry(month: &str, name: &str) -> SchemaEntry {
        SchemaEntry {
            month: month.into(),
            field_name: name.into(),
            field_type: FieldType::Numeric,
            length: 2,
        }
    }

    /// A card0 field, three categories with four sub-counts each, and three
    /// summary fields, for every month.
    fn return_a_schema() -> Schema {
        let mut entries = vec![entry("hea", "ori")];
        for m in MONTHS {
            entries.push(entry(m, "card0_type"));
            for cat in ["murder", "rape", "attempted_rape"] {
                for n in 1..=4 {
                    entries.push(entry(m, &format!("{cat}_{n}")));
                }
            }
            entries.push(entry(m, "total_1"));
            entries.push(entry(m, "total_2"));
            entries.push(entry(m, "officers_killed"));
        }
        Schema { entries }
    }

    #[test]
    fn plan_names_categories_from_december() {
        let plan = AggregationPlan::from_schema(&return_a_schema());
        let names: Vec<&str> = plan.categories.iter().map(|c| c.name.as_str()).collect();
        // card0_type would become card0_ty_2, which nothing feeds
        assert_eq!(
            names,
            vec![
                "murder_2",
                "rape_2",
                "attempted_rape_2",
                "total_1",
                "total_2",
                "officers_killed"
            ]
        );
        assert!(plan.categories.iter().all(|c| !c.sources.is_empty()));
    }

    #[test]
    fn longest_key_claims_overlapping_names() {
        let plan = AggregationPlan::from_schema(&return_a_schema());
        let rape = plan.categories.iter().find(|c| c.name == "rape_2").unwrap();
        assert_eq!(rape.sources.len(), 12);
        assert!(rape.sources.iter().all(|s| !s.contains("attempted")));
        let attempted = plan
            .categories
            .iter()
            .find(|c| c.name == "attempted_rape_2")
            .unwrap();
        assert_eq!(attempted.sources.len(), 12);
    }

    #[test]
    fn siblings_and_cards_are_dropped() {
        let plan = AggregationPlan::from_schema(&return_a_schema());
        assert!(plan.sibling_drops.contains(&"jan||murder_1".to_string()));
        assert!(plan.sibling_drops.contains(&"dec||rape_4".to_string()));
        assert!(plan.sibling_drops.contains(&"may||attempted_rape_3".to_string()));
        assert_eq!(plan.sibling_drops.len(), 12 * 9);
        assert_eq!(plan.auxiliary_drops.len(), 12);
    }

    #[test]
    fn sums_four_sub_columns_and_removes_them() {
        let schema = Schema {
            entries: vec![
                entry("jan", "murder_1"),
                entry("jan", "murder_2"),
                entry("feb", "murder_2"),
                entry("mar", "murder_2"),
                entry("apr", "murder_2"),
                entry("dec", "murder_2"),
                entry("dec", "a"),
                entry("dec", "b"),
                entry("dec", "c"),
            ],
        };
        let plan = AggregationPlan::from_schema(&schema);
        let mut table = Table::new(2);
        table.set_column("jan||murder_1", vec![Value::Number(9.0), Value::Number(9.0)]);
        table.set_column("jan||murder_2", vec![Value::Number(1.0), Value::Missing]);
        table.set_column("feb||murder_2", vec![Value::Number(2.0), Value::Missing]);
        table.set_column("mar||murder_2", vec![Value::Text(" 3".into()), Value::Missing]);
        table.set_column("apr||murder_2", vec![Value::Missing, Value::Missing]);
        table.set_column("dec||murder_2", vec![Value::Number(4.0), Value::Text("x".into())]);

        plan.apply(&mut table);

        assert_eq!(
            table.column("murder_2").unwrap().values,
            vec![Value::Number(10.0), Value::Number(0.0)]
        );
        assert!(table.column_names().all(|n| !n.contains("||murder")));
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn no_card_column_survives_apply() {
        let mut entries = Vec::new();
        for m in MONTHS {
            entries.push(entry(m, "card0_type"));
            entries.push(entry(m, "card2_type"));
            entries.push(entry(m, "card2_total_1"));
            entries.push(entry(m, "card2_total_2"));
            entries.push(entry(m, "murder_1"));
            entries.push(entry(m, "murder_2"));
        }
        for name in ["a", "b", "c"] {
            entries.push(entry("dec", name));
        }
        let schema = Schema { entries };
        let plan = AggregationPlan::from_schema(&schema);
        assert!(plan.auxiliary_drops.contains(&"card2_total_2".to_string()));

        let mut table = Table::new(1);
        for e in &schema.entries {
            table.set_column(&e.key(), vec![Value::Number(1.0)]);
        }
        plan.apply(&mut table);

        let names: Vec<&str> = table.column_names().collect();
        for marker in AUXILIARY_MARKERS {
            assert!(names.iter().all(|n| !n.contains(marker)), "{marker} left in {names:?}");
        }
        assert_eq!(names, vec!["murder_2", "a", "b", "c"]);
        assert_eq!(table.column("murder_2").unwrap().values, vec![Value::Number(12.0)]);
    }

    #[test]
    fn header_only_categories_are_skipped() {
        let schema = Schema {
            entries: vec![
                entry("jan", "murder_2"),
                entry("dec", "card1_type"),
                entry("dec", "murder_2"),
                entry("dec", "a"),
                entry("dec", "b"),
                entry("dec", "c"),
            ],
        };
        let plan = AggregationPlan::from_schema(&schema);
        assert!(plan.categories.iter().all(|c| c.name != "card1_ty_2"));
        assert!(plan.categories.iter().any(|c| c.name == "murder_2"));
    }

    #[test]
    fn strip_suffix_handles_short_names() {
        assert_eq!(strip_suffix("murder_1"), "murder");
        assert_eq!(strip_suffix("x"), "");
    }

    #[test]
    fn tokens_respect_underscore_boundaries() {
        assert!(contains_token("attempted_rape_2", "rape_2"));
        assert!(contains_token("rape_2", "rape_2"));
        assert!(!contains_token("grape_2", "rape_2"));
        assert!(!contains_token("rape_21", "rape_2"));
    }
}
