//! Report configuration.
//!
//! Located via `TULP_REPORT_CONFIG`, else `./report.toml`, else built-in
//! defaults. Relative paths resolve against the config file's directory.
//!
//! Example config:
//! ```toml
//! [gdp]
//! path = "data/gdp_data.csv"
//! id_column = "Country Code"
//! min_year = 1960
//! max_year = 2022
//!
//! [sites]
//! primary = "sites"
//!
//! [[sites.tables]]
//! name = "sites"
//! path = "data/sites.parquet"
//! key_column = "site_name"
//!
//! [[sites.tables]]
//! name = "strength"
//! path = "data/strength.parquet"
//! key_column = "site"
//!
//! [images]
//! dir = "images"
//! template = "*_*_{site}_*.jpg"
//! separator = "_"
//! range_field = 3
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::assets::{NamingConvention, DEFAULT_TEMPLATE, SITE_PLACEHOLDER};
use crate::data::schema::WideSchema;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TULP_REPORT_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "report.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub gdp: GdpConfig,
    pub sites: SitesConfig,
    pub map: MapConfig,
    pub images: ImagesConfig,
    pub cache: CacheConfig,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// GDP reference data: a wide CSV with one column per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdpConfig {
    pub path: PathBuf,
    pub id_column: String,
    pub min_year: i64,
    pub max_year: i64,
    /// Name of the melted key column.
    pub key_name: String,
    /// Name of the melted value column.
    pub value_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    /// Table whose key column populates the site picker.
    pub primary: String,
    pub tables: Vec<SiteTableConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteTableConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_key_column")]
    pub key_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Site table holding the coordinates.
    pub table: String,
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub dir: PathBuf,
    /// Glob template; `{site}` is replaced by the selected site name.
    pub template: String,
    #[serde(flatten)]
    pub naming: NamingConvention,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds before a loaded table is re-read. Unset: cache for the session.
    pub ttl_secs: Option<u64>,
}

fn default_key_column() -> String {
    "site_name".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            gdp: GdpConfig::default(),
            sites: SitesConfig::default(),
            map: MapConfig::default(),
            images: ImagesConfig::default(),
            cache: CacheConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Default for GdpConfig {
    fn default() -> Self {
        GdpConfig {
            path: PathBuf::from("data/gdp_data.csv"),
            id_column: "Country Code".to_string(),
            min_year: 1960,
            max_year: 2022,
            key_name: "Year".to_string(),
            value_name: "GDP".to_string(),
        }
    }
}

impl Default for SitesConfig {
    fn default() -> Self {
        SitesConfig {
            primary: "sites".to_string(),
            tables: vec![SiteTableConfig {
                name: "sites".to_string(),
                path: PathBuf::from("data/sites.parquet"),
                key_column: default_key_column(),
            }],
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            table: "sites".to_string(),
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        ImagesConfig {
            dir: PathBuf::from("images"),
            template: DEFAULT_TEMPLATE.to_string(),
            naming: NamingConvention::default(),
        }
    }
}

impl ReportConfig {
    /// Find and load the configuration for this session.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }
        log::info!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let config = Self::from_toml(&content, base_dir)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str, base_dir: &Path) -> Result<Self> {
        let mut config: ReportConfig = toml::from_str(content).context("Failed to parse config")?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gdp.min_year > self.gdp.max_year {
            bail!(
                "gdp.min_year ({}) is after gdp.max_year ({})",
                self.gdp.min_year,
                self.gdp.max_year
            );
        }

        let mut names = HashSet::new();
        for table in &self.sites.tables {
            if !names.insert(table.name.as_str()) {
                bail!("site table '{}' is configured twice", table.name);
            }
        }
        if self.site_table(&self.sites.primary).is_none() {
            bail!("sites.primary names unknown table '{}'", self.sites.primary);
        }
        if self.site_table(&self.map.table).is_none() {
            bail!("map.table names unknown table '{}'", self.map.table);
        }
        if !self.images.template.contains(SITE_PLACEHOLDER) {
            bail!(
                "images.template '{}' has no {} placeholder",
                self.images.template,
                SITE_PLACEHOLDER
            );
        }
        Ok(())
    }

    /// `path` joined onto the config directory unless already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn site_table(&self, name: &str) -> Option<&SiteTableConfig> {
        self.sites.tables.iter().find(|t| t.name == name)
    }

    /// The GDP year columns as a typed schema.
    pub fn gdp_schema(&self) -> WideSchema {
        WideSchema::years(&self.gdp.id_column, self.gdp.min_year, self.gdp.max_year)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.ttl_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [gdp]
        path = "data/gdp.csv"
        min_year = 2000
        max_year = 2002

        [sites]
        primary = "sites"

        [[sites.tables]]
        name = "sites"
        path = "data/sites.parquet"

        [[sites.tables]]
        name = "strength"
        path = "/srv/tulp/strength.parquet"
        key_column = "site"

        [images]
        dir = "rf_data_imaging"
        range_field = 2

        [cache]
        ttl_secs = 60
    "#;

    #[test]
    fn parses_sample_and_fills_defaults() {
        let config = ReportConfig::from_toml(SAMPLE, Path::new("/opt/report")).unwrap();

        assert_eq!(config.gdp.id_column, "Country Code");
        assert_eq!(config.gdp.key_name, "Year");
        assert_eq!(config.gdp_schema().keys().collect::<Vec<_>>(), vec![2000, 2001, 2002]);
        assert_eq!(config.sites.tables[0].key_column, "site_name");
        assert_eq!(config.sites.tables[1].key_column, "site");
        assert_eq!(config.map, MapConfig::default());
        assert_eq!(config.images.template, DEFAULT_TEMPLATE);
        assert_eq!(config.images.naming.separator, "_");
        assert_eq!(config.images.naming.field, 2);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let config = ReportConfig::from_toml(SAMPLE, Path::new("/opt/report")).unwrap();
        assert_eq!(
            config.resolve(&config.gdp.path),
            PathBuf::from("/opt/report/data/gdp.csv")
        );
        assert_eq!(
            config.resolve(&config.sites.tables[1].path),
            PathBuf::from("/srv/tulp/strength.parquet")
        );
    }

    #[test]
    fn empty_file_is_the_default_config() {
        let config = ReportConfig::from_toml("", Path::new(".")).unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn rejects_inverted_year_range() {
        let err = ReportConfig::from_toml("[gdp]\nmin_year = 2022\nmax_year = 1960\n", Path::new("."))
            .unwrap_err();
        assert!(format!("{err:#}").contains("min_year"));
    }

    #[test]
    fn rejects_unknown_primary_and_map_tables() {
        let err = ReportConfig::from_toml("[sites]\nprimary = \"junk\"\n", Path::new(".")).unwrap_err();
        assert!(format!("{err:#}").contains("junk"));

        let err = ReportConfig::from_toml("[map]\ntable = \"junk\"\n", Path::new(".")).unwrap_err();
        assert!(format!("{err:#}").contains("map.table"));
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let err = ReportConfig::from_toml("[images]\ntemplate = \"*.jpg\"\n", Path::new("."))
            .unwrap_err();
        assert!(format!("{err:#}").contains("placeholder"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(config.base_dir, dir.path());
        assert!(ReportConfig::load(&dir.path().join("nope.toml")).is_err());
    }
}
