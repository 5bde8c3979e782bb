use std::{cmp::Ordering, collections::HashMap};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    error::{PrepError, Result},
    table::Table,
};

/// Columns of the England and Wales measles tables that are not lag features.
pub const DEFAULT_DROP: [&str; 6] = [
    "susc",
    "pop",
    "births",
    "nearest_big_city",
    "nearest_big_city_distances_unscaled",
    "nbc_cases",
];

/// Name fragments of the susceptibles, big city and nearest city lag columns.
pub const DEFAULT_EXCLUDE_SUBSTRINGS: [&str; 28] = [
    "susc",
    "london",
    "birmingham",
    "liverpool",
    "manchester",
    "sheffield",
    "leeds",
    "bristol",
    "_nc_1",
    "_nc_2",
    "_nc_3",
    "_nc_4",
    "_nc_5",
    "_nc_6",
    "_nc_7",
    "_nc_8",
    "_nc_9",
    "_nc_10",
    "nearest_1_city",
    "nearest_2_city",
    "nearest_3_city",
    "nearest_4_city",
    "nearest_5_city",
    "nearest_6_city",
    "nearest_7_city",
    "nearest_8_city",
    "nearest_9_city",
    "nearest_10_city",
];

/// Drops named columns, then every column whose name contains one of the substrings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnFilter {
    pub drop: Vec<String>,
    pub exclude_substrings: Vec<String>,
}

impl Default for ColumnFilter {
    fn default() -> Self {
        Self {
            drop: DEFAULT_DROP.iter().map(|s| s.to_string()).collect(),
            exclude_substrings: DEFAULT_EXCLUDE_SUBSTRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ColumnFilter {
    /// Applies the filter to `table` in place.
    ///
    /// # Returns
    /// The names of the dropped columns, or a schema error if one of the `drop`
    /// columns is not in the table. The table is left untouched on error.
    pub fn apply(&self, table: &mut Table) -> Result<Vec<String>> {
        if let Some(missing) = self.drop.iter().find(|d| table.column_index(d).is_none()) {
            return Err(PrepError::schema(format!(
                "cannot drop missing column '{missing}'"
            )));
        }

        let mut dropped = table.retain_columns(|name| !self.drop.iter().any(|d| d == name));
        dropped.extend(table.retain_columns(|name| {
            !self
                .exclude_substrings
                .iter()
                .any(|s| name.contains(s.as_str()))
        }));

        debug!("dropped columns: {dropped:?}");
        info!(
            "kept {} columns: {}",
            table.ncols(),
            table.headers().join(", ")
        );

        Ok(dropped)
    }
}

/// Keeps the rows of the `n` groups with the largest maximum of `value`.
///
/// Groups are ranked by the maximum `value` over their rows, descending, ties broken by
/// group name. Row order is preserved.
pub fn top_groups_by_max(table: &Table, group: &str, value: &str, n: usize) -> Result<Table> {
    let groups = table.require_column(group)?;
    let values = table.require_column(value)?;

    let mut max_by_group: HashMap<&str, f64> = HashMap::new();
    for (row, (g, v)) in groups.iter().zip(values).enumerate() {
        let v: f64 = v.trim().parse().map_err(|_| {
            PrepError::schema(format!("column '{value}' row {row}: cannot parse '{v}'"))
        })?;

        max_by_group
            .entry(g.as_str())
            .and_modify(|m| *m = m.max(v))
            .or_insert(v);
    }

    let mut ranked: Vec<(&str, f64)> = max_by_group.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.truncate(n);

    let kept: Vec<&str> = ranked.iter().map(|(g, _)| *g).collect();
    info!("keeping the top {} groups by '{value}': {kept:?}", kept.len());

    let rows: Vec<usize> = groups
        .iter()
        .enumerate()
        .filter(|(_, g)| kept.contains(&g.as_str()))
        .map(|(row, _)| row)
        .collect();

    Ok(table.select_rows(&rows))
}

/// What the `filter` command does to its input tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub group_column: String,
    pub rank_column: String,
    pub top_n: usize,
    #[serde(flatten)]
    pub columns: ColumnFilter,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            group_column: "city".into(),
            rank_column: "pop".into(),
            top_n: 10,
            columns: ColumnFilter::default(),
        }
    }
}

/// Concatenates the tables, keeps the most populous groups and filters out the
/// non feature columns.
pub fn run_filter(tables: Vec<Table>, config: &FilterConfig) -> Result<Table> {
    let table = Table::concat(tables)?;
    debug!("concatenated {} rows", table.nrows());

    let mut table =
        top_groups_by_max(&table, &config.group_column, &config.rank_column, config.top_n)?;
    config.columns.apply(&mut table)?;

    Ok(table)
}
