use std::collections::HashSet;
use std::sync::Arc;

use super::assets::derive_file_pattern;
use super::error::DataError;
use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Row selection by key
// ---------------------------------------------------------------------------

/// Return indices of rows whose `key_column` equals `key_value`, in table order.
pub fn selected_indices(
    table: &Table,
    key_column: &str,
    key_value: &CellValue,
) -> Result<Vec<usize>, DataError> {
    let idx = table.column_index(key_column)?;
    Ok(table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| &row[idx] == key_value)
        .map(|(i, _)| i)
        .collect())
}

/// The rows of `table` matching `key_value`. No match is an empty table,
/// not an error; a missing `key_column` is a `Schema` error.
pub fn select(table: &Table, key_column: &str, key_value: &CellValue) -> Result<Table, DataError> {
    let indices = selected_indices(table, key_column, key_value)?;
    Ok(table.take_rows(&indices))
}

/// Distinct non-missing values of `key_column` in first-appearance order.
/// Duplicate source rows collapse into one entry.
pub fn site_names(table: &Table, key_column: &str) -> Result<Vec<CellValue>, DataError> {
    let idx = table.column_index(key_column)?;
    let mut seen = HashSet::new();
    Ok(table
        .rows
        .iter()
        .map(|row| &row[idx])
        .filter(|v| !v.is_null() && seen.insert(*v))
        .cloned()
        .collect())
}

// ---------------------------------------------------------------------------
// Selection – everything derived from one chosen site
// ---------------------------------------------------------------------------

/// A site table together with the column that holds its site key.
#[derive(Debug, Clone)]
pub struct SiteSource {
    /// Display name (e.g. "summary", "strength").
    pub name: String,
    pub table: Arc<Table>,
    pub key_column: String,
}

/// The chosen site plus every view derived from it. Re-derived from scratch
/// whenever the chosen site changes.
#[derive(Debug, Clone)]
pub struct Selection {
    pub site: CellValue,
    /// Matching rows of each source, in source order.
    pub subsets: Vec<Table>,
    /// Glob pattern locating this site's image assets.
    pub asset_pattern: String,
}

impl Selection {
    pub fn derive(
        site: &CellValue,
        sources: &[SiteSource],
        template: &str,
    ) -> Result<Selection, DataError> {
        let subsets = sources
            .iter()
            .map(|src| select(&src.table, &src.key_column, site))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Selection {
            site: site.clone(),
            subsets,
            asset_pattern: derive_file_pattern(&site.to_string(), template),
        })
    }

    /// Whether any source had rows for this site.
    pub fn has_rows(&self) -> bool {
        self.subsets.iter().any(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnType};

    fn strength() -> Table {
        Table::new(
            "strength",
            vec![
                Column::new("site", ColumnType::Text),
                Column::new("range", ColumnType::Integer),
            ],
            vec![
                vec!["A1094".into(), CellValue::Integer(1)],
                vec!["B2201".into(), CellValue::Integer(1)],
                vec!["A1094".into(), CellValue::Integer(5)],
                vec![CellValue::Null, CellValue::Integer(7)],
                vec!["A1094".into(), CellValue::Integer(10)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn select_keeps_matching_rows_in_order() {
        let table = strength();
        let subset = select(&table, "site", &"A1094".into()).unwrap();

        assert_eq!(subset.columns, table.columns);
        assert_eq!(subset.len(), 3);
        assert!(subset.rows.iter().all(|r| r[0] == CellValue::from("A1094")));
        let ranges: Vec<_> = subset.rows.iter().map(|r| r[1].clone()).collect();
        assert_eq!(
            ranges,
            vec![CellValue::Integer(1), CellValue::Integer(5), CellValue::Integer(10)]
        );
    }

    #[test]
    fn select_with_unknown_site_is_empty() {
        let subset = select(&strength(), "site", &"Z9999".into()).unwrap();
        assert!(subset.is_empty());
    }

    #[test]
    fn select_is_type_strict() {
        let subset = select(&strength(), "range", &CellValue::Float(1.0)).unwrap();
        assert!(subset.is_empty());
        let subset = select(&strength(), "range", &CellValue::Integer(1)).unwrap();
        assert_eq!(subset.len(), 2);
    }

    #[test]
    fn select_on_absent_column_is_a_schema_error() {
        let err = select(&strength(), "site_name", &"A1094".into()).unwrap_err();
        assert!(matches!(err, DataError::Schema(_)), "{err}");
    }

    #[test]
    fn site_names_are_distinct_in_first_appearance_order() {
        assert_eq!(
            site_names(&strength(), "site").unwrap(),
            vec![CellValue::from("A1094"), "B2201".into()]
        );
    }

    #[test]
    fn selection_derives_subsets_and_pattern() {
        let sites = Table::new(
            "sites",
            vec![Column::new("site_name", ColumnType::Text)],
            vec![vec!["A1094".into()], vec!["B2201".into()]],
        )
        .unwrap();
        let sources = vec![
            SiteSource {
                name: "sites".to_string(),
                table: Arc::new(sites),
                key_column: "site_name".to_string(),
            },
            SiteSource {
                name: "strength".to_string(),
                table: Arc::new(strength()),
                key_column: "site".to_string(),
            },
        ];

        let selection = Selection::derive(&"B2201".into(), &sources, "*_*_{site}_*.jpg").unwrap();
        assert_eq!(selection.asset_pattern, "*_*_B2201_*.jpg");
        assert_eq!(selection.subsets.len(), 2);
        assert_eq!(selection.subsets[0].len(), 1);
        assert_eq!(selection.subsets[1].len(), 1);
        assert!(selection.has_rows());

        let nothing = Selection::derive(&"Z9999".into(), &sources, "*_*_{site}_*.jpg").unwrap();
        assert!(!nothing.has_rows());
    }
}
