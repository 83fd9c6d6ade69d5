use std::collections::HashSet;

use super::error::DataError;
use super::model::{CellValue, ColumnType, Table};

/// Typed description of a wide table: an entity identifier column followed
/// by an ordered list of integer-keyed value columns (one per year).
///
/// Column names are parsed once, here, so a bad header fails before any
/// reshaping happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideSchema {
    pub id_column: String,
    /// (parsed key, source column name), in the order they will be melted.
    pub value_columns: Vec<(i64, String)>,
}

/// A table that has been checked against a [`WideSchema`]: the id column and
/// every value column exist, value columns are numeric, entity ids are unique.
#[derive(Debug)]
pub struct ValidatedWide<'a> {
    pub table: &'a Table,
    pub id_index: usize,
    /// (parsed key, column index) for each value column.
    pub value_indices: Vec<(i64, usize)>,
}

impl WideSchema {
    /// One value column per year in `min_year..=max_year`, ascending.
    pub fn years(id_column: &str, min_year: i64, max_year: i64) -> Self {
        WideSchema {
            id_column: id_column.to_string(),
            value_columns: (min_year..=max_year).map(|y| (y, y.to_string())).collect(),
        }
    }

    /// Build a schema from raw column names. Each name must be exactly an
    /// integer (no padding, no fractional part).
    pub fn from_columns<S: AsRef<str>>(
        id_column: &str,
        value_columns: &[S],
    ) -> Result<Self, DataError> {
        let value_columns = value_columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                parse_key(name).map(|key| (key, name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WideSchema {
            id_column: id_column.to_string(),
            value_columns,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.value_columns.iter().map(|(k, _)| *k)
    }

    /// Check `table` against this schema.
    pub fn validate<'a>(&self, table: &'a Table) -> Result<ValidatedWide<'a>, DataError> {
        let id_index = table.column_index(&self.id_column)?;

        let mut value_indices = Vec::with_capacity(self.value_columns.len());
        for (key, name) in &self.value_columns {
            let idx = table.column_index(name)?;
            let dtype = table.columns[idx].dtype;
            if !dtype.is_numeric() && dtype != ColumnType::Null {
                return Err(DataError::Schema(format!(
                    "{}: value column '{name}' is {dtype}, expected numeric",
                    table.name
                )));
            }
            value_indices.push((*key, idx));
        }

        let mut seen: HashSet<&CellValue> = HashSet::with_capacity(table.len());
        for (row_no, row) in table.rows.iter().enumerate() {
            let id = &row[id_index];
            if id.is_null() {
                return Err(DataError::Schema(format!(
                    "{}: row {row_no} has no '{}'",
                    table.name, self.id_column
                )));
            }
            if !seen.insert(id) {
                return Err(DataError::Schema(format!(
                    "{}: duplicate '{}' value {id}",
                    table.name, self.id_column
                )));
            }
        }

        Ok(ValidatedWide {
            table,
            id_index,
            value_indices,
        })
    }
}

fn parse_key(name: &str) -> Result<i64, DataError> {
    name.parse::<i64>()
        .ok()
        // Reject "+1960" / "01960": the key must print back to the column name.
        .filter(|key| key.to_string() == name)
        .ok_or_else(|| DataError::Schema(format!("column '{name}' is not an integer key")))
}
