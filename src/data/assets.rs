use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use super::error::DataError;

/// Placeholder substituted with the site name in asset templates.
pub const SITE_PLACEHOLDER: &str = "{site}";

/// Default template: `{a}_{b}_{site}_{range}.jpg`.
pub const DEFAULT_TEMPLATE: &str = "*_*_{site}_*.jpg";

/// Substitute `site_name` into a glob template. Glob metacharacters in the
/// site name are escaped so they match literally.
pub fn derive_file_pattern(site_name: &str, template: &str) -> String {
    template.replace(SITE_PLACEHOLDER, &Pattern::escape(site_name))
}

/// All files in `dir` matching `pattern`. No match is an empty list.
pub fn find_assets(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DataError> {
    let full = format!(
        "{}/{pattern}",
        Pattern::escape(&dir.to_string_lossy()).trim_end_matches('/')
    );
    let entries = glob::glob(&full)
        .map_err(|e| DataError::Format(format!("bad asset pattern '{full}': {e}")))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DataError::Io {
            path: e.path().to_path_buf(),
            source: std::io::Error::from(e),
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// Where the numeric "range" lives in an asset filename: the stem is split on
/// `separator` into exactly `field + 1` fields and the last one must parse as
/// an unsigned integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    pub separator: String,
    #[serde(rename = "range_field")]
    pub field: usize,
}

impl Default for NamingConvention {
    fn default() -> Self {
        NamingConvention {
            separator: "_".to_string(),
            field: 3,
        }
    }
}

impl NamingConvention {
    /// Numeric sort key of one asset path.
    pub fn range_sort_key(&self, path: &Path) -> Result<u64, DataError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DataError::NamingConvention(format!("{}: no file name", path.display())))?;

        let fields: Vec<&str> = stem.split(self.separator.as_str()).collect();
        if fields.len() != self.field + 1 {
            return Err(DataError::NamingConvention(format!(
                "{}: expected {} '{}'-separated fields, found {}",
                path.display(),
                self.field + 1,
                self.separator,
                fields.len()
            )));
        }
        let field = fields[self.field];

        field.parse::<u64>().map_err(|_| {
            DataError::NamingConvention(format!(
                "{}: field {} ('{field}') is not a number",
                path.display(),
                self.field
            ))
        })
    }

    /// Sort assets by their numeric range field (ascending, stable).
    /// Any non-conforming name fails the whole sort.
    pub fn sort_by_range(&self, paths: Vec<PathBuf>) -> Result<Vec<PathBuf>, DataError> {
        let mut keyed = paths
            .into_iter()
            .map(|p| self.range_sort_key(&p).map(|k| (k, p)))
            .collect::<Result<Vec<_>, _>>()?;
        keyed.sort_by_key(|(k, _)| *k);
        Ok(keyed.into_iter().map(|(_, p)| p).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_substitutes_site_name() {
        assert_eq!(derive_file_pattern("A1094", DEFAULT_TEMPLATE), "*_*_A1094_*.jpg");
        assert_eq!(derive_file_pattern("A1094", "{site}/*.png"), "A1094/*.png");
    }

    #[test]
    fn pattern_escapes_glob_metacharacters() {
        let pattern = derive_file_pattern("Site[1]", DEFAULT_TEMPLATE);
        let glob = Pattern::new(&pattern).unwrap();
        assert!(glob.matches("1_2_Site[1]_5.jpg"));
        assert!(!glob.matches("1_2_Site1_5.jpg"));
    }

    #[test]
    fn sorts_numerically_not_lexicographically() {
        let naming = NamingConvention::default();
        let sorted = naming
            .sort_by_range(vec![
                PathBuf::from("1_2_SiteA_5.jpg"),
                PathBuf::from("1_2_SiteA_10.jpg"),
                PathBuf::from("1_2_SiteA_1.jpg"),
            ])
            .unwrap();
        assert_eq!(
            sorted,
            vec![
                PathBuf::from("1_2_SiteA_1.jpg"),
                PathBuf::from("1_2_SiteA_5.jpg"),
                PathBuf::from("1_2_SiteA_10.jpg"),
            ]
        );
    }

    #[test]
    fn malformed_names_are_rejected() {
        let naming = NamingConvention::default();
        for bad in ["1_2_SiteA.jpg", "1_2_SiteA_far.jpg", "1_2_SiteA_-3.jpg"] {
            let err = naming
                .sort_by_range(vec![PathBuf::from("1_2_SiteA_1.jpg"), PathBuf::from(bad)])
                .unwrap_err();
            assert!(matches!(err, DataError::NamingConvention(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn custom_separator_and_field() {
        let naming = NamingConvention {
            separator: "-".to_string(),
            field: 1,
        };
        assert_eq!(naming.range_sort_key(Path::new("/img/A1094-250.jpg")).unwrap(), 250);
        assert!(naming.range_sort_key(Path::new("/img/A1094-250-x.jpg")).is_err());
    }

    #[test]
    fn extra_fields_are_rejected() {
        let naming = NamingConvention::default();
        let err = naming
            .range_sort_key(Path::new("1_2_SiteA_5_extra.jpg"))
            .unwrap_err();
        assert!(matches!(err, DataError::NamingConvention(_)), "{err}");
    }

    #[test]
    fn site_name_containing_separator_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1_2_A_1094_5.jpg", "1_2_A_1094_10.jpg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let found = find_assets(dir.path(), &derive_file_pattern("A_1094", DEFAULT_TEMPLATE)).unwrap();
        assert_eq!(found.len(), 2);
        let err = NamingConvention::default().sort_by_range(found).unwrap_err();
        assert!(matches!(err, DataError::NamingConvention(_)), "{err}");
    }

    #[test]
    fn find_assets_matches_only_the_site() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "1_2_A1094_10.jpg",
            "1_2_A1094_2.jpg",
            "1_2_B2201_1.jpg",
            "1_2_A1094_3.png",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let pattern = derive_file_pattern("A1094", DEFAULT_TEMPLATE);
        let found = find_assets(dir.path(), &pattern).unwrap();
        let sorted = NamingConvention::default().sort_by_range(found).unwrap();
        let names: Vec<_> = sorted
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1_2_A1094_2.jpg", "1_2_A1094_10.jpg"]);

        let none = find_assets(dir.path(), &derive_file_pattern("Z9999", DEFAULT_TEMPLATE)).unwrap();
        assert!(none.is_empty());
    }
}
