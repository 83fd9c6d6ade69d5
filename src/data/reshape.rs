use std::ops::RangeInclusive;

use super::error::DataError;
use super::model::{CellValue, Column, ColumnType, Table};
use super::schema::{ValidatedWide, WideSchema};

// ---------------------------------------------------------------------------
// LongTable – the melted form of a wide table
// ---------------------------------------------------------------------------

/// One (entity, key, value) observation.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub entity: CellValue,
    pub key: i64,
    /// `None` where the wide table had a missing cell.
    pub value: Option<f64>,
}

/// One row per (entity, key) pair. Rows are grouped by entity in source
/// order, keys in value-column order within each entity.
#[derive(Debug, Clone, PartialEq)]
pub struct LongTable {
    pub id_column: String,
    pub key_name: String,
    pub value_name: String,
    pub rows: Vec<LongRow>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct entities in the order they first appear.
    pub fn entities(&self) -> Vec<&CellValue> {
        let mut out: Vec<&CellValue> = Vec::new();
        for row in &self.rows {
            // Rows are grouped by entity, so comparing with the last one suffices.
            if out.last() != Some(&&row.entity) {
                out.push(&row.entity);
            }
        }
        out
    }

    /// Smallest and largest key present.
    pub fn key_bounds(&self) -> Option<(i64, i64)> {
        let min = self.rows.iter().map(|r| r.key).min()?;
        let max = self.rows.iter().map(|r| r.key).max()?;
        Some((min, max))
    }

    /// `[key, value]` points for one entity within `keys`, skipping missing values.
    pub fn series(&self, entity: &CellValue, keys: RangeInclusive<i64>) -> Vec<[f64; 2]> {
        self.rows
            .iter()
            .filter(|r| &r.entity == entity && keys.contains(&r.key))
            .filter_map(|r| r.value.map(|v| [r.key as f64, v]))
            .collect()
    }

    /// Convert back to a generic [`Table`] (for tabular display).
    pub fn to_table(&self, name: &str) -> Table {
        let entity_type = self
            .rows
            .iter()
            .fold(ColumnType::Null, |acc, r| acc.merge(r.entity.column_type()));
        Table {
            name: name.to_string(),
            columns: vec![
                Column::new(self.id_column.clone(), entity_type),
                Column::new(self.key_name.clone(), ColumnType::Integer),
                Column::new(self.value_name.clone(), ColumnType::Float),
            ],
            rows: self
                .rows
                .iter()
                .map(|r| {
                    vec![
                        r.entity.clone(),
                        CellValue::Integer(r.key),
                        r.value.map(CellValue::Float).unwrap_or(CellValue::Null),
                    ]
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// melt
// ---------------------------------------------------------------------------

/// Unpivot `value_columns` of `table` into (id, key, value) rows.
///
/// Every value column name must be an integer; the output has exactly
/// `table.len() * value_columns.len()` rows, missing values included.
pub fn melt<S: AsRef<str>>(
    table: &Table,
    id_column: &str,
    value_columns: &[S],
    key_name: &str,
    value_name: &str,
) -> Result<LongTable, DataError> {
    let schema = WideSchema::from_columns(id_column, value_columns)?;
    let wide = schema.validate(table)?;
    Ok(melt_validated(&wide, id_column, key_name, value_name))
}

/// Melt a table already checked against its schema. Cannot fail.
pub fn melt_validated(
    wide: &ValidatedWide<'_>,
    id_column: &str,
    key_name: &str,
    value_name: &str,
) -> LongTable {
    let mut rows = Vec::with_capacity(wide.table.len() * wide.value_indices.len());
    for row in &wide.table.rows {
        let entity = &row[wide.id_index];
        for &(key, idx) in &wide.value_indices {
            rows.push(LongRow {
                entity: entity.clone(),
                key,
                value: row[idx].as_f64(),
            });
        }
    }

    log::debug!(
        "Melted {} rows x {} columns of {} into {} rows",
        wide.table.len(),
        wide.value_indices.len(),
        wide.table.name,
        rows.len()
    );

    LongTable {
        id_column: id_column.to_string(),
        key_name: key_name.to_string(),
        value_name: value_name.to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(ids: &[&str], years: &[&str], values: &[&[Option<f64>]]) -> Table {
        let mut columns = vec![Column::new("Country Code", ColumnType::Text)];
        columns.extend(years.iter().map(|y| Column::new(*y, ColumnType::Float)));
        let rows = ids
            .iter()
            .zip(values)
            .map(|(id, vals)| {
                let mut row = vec![CellValue::from(*id)];
                row.extend(
                    vals.iter()
                        .map(|v| v.map(CellValue::Float).unwrap_or(CellValue::Null)),
                );
                row
            })
            .collect();
        Table::new("gdp_data", columns, rows).unwrap()
    }

    fn row(entity: &str, key: i64, value: Option<f64>) -> LongRow {
        LongRow {
            entity: entity.into(),
            key,
            value,
        }
    }

    #[test]
    fn melt_orders_by_entity_then_column() {
        let table = wide(
            &["AAA", "BBB"],
            &["1960", "1961"],
            &[&[Some(1.0), Some(2.0)], &[Some(3.0), Some(4.0)]],
        );
        let long = melt(&table, "Country Code", &["1960", "1961"], "Year", "GDP").unwrap();

        assert_eq!(long.key_name, "Year");
        assert_eq!(long.value_name, "GDP");
        assert_eq!(
            long.rows,
            vec![
                row("AAA", 1960, Some(1.0)),
                row("AAA", 1961, Some(2.0)),
                row("BBB", 1960, Some(3.0)),
                row("BBB", 1961, Some(4.0)),
            ]
        );
    }

    #[test]
    fn melt_follows_the_given_column_order() {
        let table = wide(&["AAA"], &["1960", "1961"], &[&[Some(1.0), Some(2.0)]]);
        let long = melt(&table, "Country Code", &["1961", "1960"], "Year", "GDP").unwrap();
        assert_eq!(
            long.rows,
            vec![row("AAA", 1961, Some(2.0)), row("AAA", 1960, Some(1.0))]
        );
    }

    #[test]
    fn melt_keeps_missing_values() {
        let table = wide(
            &["AAA", "BBB", "CCC"],
            &["1960", "1961", "1962"],
            &[
                &[None, Some(2.0), None],
                &[Some(3.0), None, Some(5.0)],
                &[None, None, None],
            ],
        );
        let long = melt(&table, "Country Code", &["1960", "1961", "1962"], "Year", "GDP").unwrap();

        assert_eq!(long.len(), 3 * 3);
        assert_eq!(long.rows.iter().filter(|r| r.value.is_none()).count(), 6);
        for (i, source) in table.rows.iter().enumerate() {
            for (j, key) in [1960, 1961, 1962].into_iter().enumerate() {
                let out = &long.rows[i * 3 + j];
                assert_eq!(out.entity, source[0]);
                assert_eq!(out.key, key);
                assert_eq!(out.value, source[j + 1].as_f64());
            }
        }
    }

    #[test]
    fn melt_is_deterministic() {
        let table = wide(
            &["AAA", "BBB"],
            &["1960", "1961"],
            &[&[Some(1.0), None], &[Some(3.0), Some(4.0)]],
        );
        let a = melt(&table, "Country Code", &["1960", "1961"], "Year", "GDP").unwrap();
        let b = melt(&table, "Country Code", &["1960", "1961"], "Year", "GDP").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn melt_rejects_non_integer_key_columns() {
        let table = wide(&["AAA"], &["1960", "GDP 1961"], &[&[Some(1.0), Some(2.0)]]);
        let err = melt(&table, "Country Code", &["1960", "GDP 1961"], "Year", "GDP").unwrap_err();
        assert!(matches!(err, DataError::Schema(_)), "{err}");
    }

    #[test]
    fn melt_rejects_absent_id_column() {
        let table = wide(&["AAA"], &["1960"], &[&[Some(1.0)]]);
        let err = melt(&table, "Country Name", &["1960"], "Year", "GDP").unwrap_err();
        assert!(matches!(err, DataError::Schema(_)), "{err}");
    }

    #[test]
    fn melt_of_empty_table_is_empty() {
        let table = wide(&[], &["1960", "1961"], &[]);
        let long = melt(&table, "Country Code", &["1960", "1961"], "Year", "GDP").unwrap();
        assert!(long.is_empty());
        assert_eq!(long.key_bounds(), None);
    }

    #[test]
    fn series_skips_missing_and_respects_range() {
        let table = wide(
            &["AAA", "BBB"],
            &["1960", "1961", "1962"],
            &[&[Some(1.0), None, Some(3.0)], &[Some(9.0), Some(9.0), Some(9.0)]],
        );
        let long = melt(&table, "Country Code", &["1960", "1961", "1962"], "Year", "GDP").unwrap();

        assert_eq!(
            long.series(&"AAA".into(), 1960..=1962),
            vec![[1960.0, 1.0], [1962.0, 3.0]]
        );
        assert_eq!(long.series(&"AAA".into(), 1961..=1961), Vec::<[f64; 2]>::new());
        assert_eq!(long.entities(), vec![&CellValue::from("AAA"), &"BBB".into()]);
        assert_eq!(long.key_bounds(), Some((1960, 1962)));
    }

    #[test]
    fn to_table_round_trips_the_long_shape() {
        let table = wide(&["AAA"], &["1960"], &[&[None]]);
        let long = melt(&table, "Country Code", &["1960"], "Year", "GDP").unwrap();
        let flat = long.to_table("gdp");
        assert_eq!(
            flat.column_names().collect::<Vec<_>>(),
            vec!["Country Code", "Year", "GDP"]
        );
        assert_eq!(
            flat.rows,
            vec![vec!["AAA".into(), CellValue::Integer(1960), CellValue::Null]]
        );
    }
}
