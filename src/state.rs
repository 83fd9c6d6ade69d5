use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use crate::color::ColorMap;
use crate::config::ReportConfig;
use crate::data::assets::find_assets;
use crate::data::cache::TableCache;
use crate::data::model::{CellValue, Table};
use crate::data::reshape::{melt_validated, LongTable};
use crate::data::select::{site_names, Selection, SiteSource};
use crate::data::DataError;

/// Countries charted by default when present in the GDP data.
const DEFAULT_COUNTRIES: [&str; 6] = ["DEU", "FRA", "GBR", "BRA", "MEX", "JPN"];

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Tables,
    Map,
    Images,
    Gdp,
}

/// A site's position on the location map.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteLocation {
    pub site: CellValue,
    /// `[longitude, latitude]`, i.e. plot x/y.
    pub point: [f64; 2],
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: ReportConfig,
    cache: TableCache,

    /// Melted GDP reference data (None until loaded successfully).
    pub gdp: Option<LongTable>,

    /// `gdp` flattened for the tabular view.
    pub gdp_table: Option<Table>,

    /// Configured site tables, in config order.
    pub sources: Vec<SiteSource>,

    /// Distinct sites of the primary table, for the picker.
    pub site_names: Vec<CellValue>,

    /// Locations of every site with coordinates.
    pub locations: Vec<SiteLocation>,

    /// Current site and the rows/pattern derived from it.
    pub selection: Option<Selection>,

    /// Images of the selected site, ordered by range.
    pub images: Vec<PathBuf>,

    pub tab: Tab,

    /// Countries shown on the GDP chart.
    pub gdp_countries: BTreeSet<CellValue>,

    /// Inclusive year window of the GDP chart.
    pub year_from: i64,
    pub year_to: i64,

    /// Colours of the charted GDP series.
    pub color_map: ColorMap,

    /// Error message shown in the UI.
    pub status_message: Option<String>,

    /// Non-fatal notice (e.g. no images for a site).
    pub warning: Option<String>,
}

impl AppState {
    pub fn new(config: ReportConfig) -> Self {
        let cache = TableCache::new().with_ttl(config.cache_ttl());
        let mut state = Self {
            year_from: config.gdp.min_year,
            year_to: config.gdp.max_year,
            config,
            cache,
            gdp: None,
            gdp_table: None,
            sources: Vec::new(),
            site_names: Vec::new(),
            locations: Vec::new(),
            selection: None,
            images: Vec::new(),
            tab: Tab::default(),
            gdp_countries: BTreeSet::new(),
            color_map: ColorMap::default(),
            status_message: None,
            warning: None,
        };
        state.load_all();
        state
    }

    /// Switch to a different configuration; nothing cached under the old one is reused.
    pub fn set_config(&mut self, config: ReportConfig) {
        *self = Self::new(config);
    }

    /// Drop every cached table and read all sources again.
    pub fn reload(&mut self) {
        self.cache.clear();
        self.load_all();
    }

    /// Load GDP and site tables, then re-derive the current selection.
    pub fn load_all(&mut self) {
        self.status_message = None;
        self.warning = None;
        let mut errors = Vec::new();

        match self.load_gdp() {
            Ok(long) => self.set_gdp(long),
            Err(e) => {
                log::error!("Failed to load GDP data: {e}");
                self.gdp = None;
                self.gdp_table = None;
                errors.push(format!("GDP: {e}"));
            }
        }

        match self.load_sources() {
            Ok(sources) => self.sources = sources,
            Err(e) => {
                log::error!("Failed to load site tables: {e}");
                self.sources.clear();
                errors.push(format!("Sites: {e}"));
            }
        }

        if let Err(e) = self.index_sites() {
            log::error!("Failed to index sites: {e}");
            errors.push(format!("Sites: {e}"));
        }

        let previous = self.selection.as_ref().map(|s| s.site.clone());
        let site = previous
            .filter(|s| self.site_names.contains(s))
            .or_else(|| self.site_names.first().cloned());
        match site {
            Some(site) => self.select_site(site),
            None => {
                self.selection = None;
                self.images.clear();
            }
        }

        if !errors.is_empty() {
            // Selection errors, if any, come after load errors.
            if let Some(msg) = self.status_message.take() {
                errors.push(msg);
            }
            self.status_message = Some(format!("Error: {}", errors.join("; ")));
        }
    }

    fn load_gdp(&self) -> Result<LongTable, DataError> {
        let gdp = &self.config.gdp;
        let table = self.cache.get(&self.config.resolve(&gdp.path))?;
        let schema = self.config.gdp_schema();
        let wide = schema.validate(&table)?;
        Ok(melt_validated(
            &wide,
            &gdp.id_column,
            &gdp.key_name,
            &gdp.value_name,
        ))
    }

    fn load_sources(&self) -> Result<Vec<SiteSource>, DataError> {
        self.config
            .sites
            .tables
            .iter()
            .map(|t| {
                Ok(SiteSource {
                    name: t.name.clone(),
                    table: self.cache.get(&self.config.resolve(&t.path))?,
                    key_column: t.key_column.clone(),
                })
            })
            .collect()
    }

    fn source(&self, name: &str) -> Option<&SiteSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// The table whose sites populate the picker.
    pub fn primary_source(&self) -> Option<&SiteSource> {
        self.source(&self.config.sites.primary)
    }

    /// Rebuild the site list and location points from the loaded sources.
    fn index_sites(&mut self) -> Result<(), DataError> {
        self.site_names.clear();
        self.locations.clear();
        self.site_names = match self.primary_source() {
            Some(primary) => site_names(&primary.table, &primary.key_column)?,
            None => Vec::new(),
        };
        self.locations = self.site_locations()?;
        Ok(())
    }

    fn site_locations(&self) -> Result<Vec<SiteLocation>, DataError> {
        let map = &self.config.map;
        let Some(src) = self.source(&map.table) else {
            return Ok(Vec::new());
        };

        let key = src.table.column_index(&src.key_column)?;
        let lat = src.table.numeric_column(&map.latitude)?;
        let lon = src.table.numeric_column(&map.longitude)?;
        let mut seen = BTreeSet::new();
        let locations = src
            .table
            .rows
            .iter()
            .zip(lat.into_iter().zip(lon))
            .filter_map(|(row, coords)| match coords {
                (Some(lat), Some(lon)) => Some((&row[key], [lon, lat])),
                _ => None,
            })
            .filter(|(site, _)| seen.insert(*site))
            .map(|(site, point)| SiteLocation {
                site: site.clone(),
                point,
            })
            .collect();
        Ok(locations)
    }

    /// Make `site` the current selection and re-derive everything from it.
    pub fn select_site(&mut self, site: CellValue) {
        self.warning = None;
        self.status_message = None;
        self.images.clear();

        let selection =
            match Selection::derive(&site, &self.sources, &self.config.images.template) {
                Ok(selection) => selection,
                Err(e) => {
                    log::error!("Failed to select site {site}: {e}");
                    self.status_message = Some(format!("Error: {e}"));
                    self.selection = None;
                    return;
                }
            };

        let mut warnings = Vec::new();
        if !selection.has_rows() {
            warnings.push(format!("No rows found for site {site}"));
        }

        match self.find_images(&selection.asset_pattern) {
            Ok(images) if images.is_empty() => {
                log::warn!("No files found matching {}", selection.asset_pattern);
                warnings.push(format!(
                    "No images found matching {}",
                    selection.asset_pattern
                ));
            }
            Ok(images) => self.images = images,
            Err(e) => {
                log::error!("Failed to list images for {site}: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }

        if !warnings.is_empty() {
            self.warning = Some(warnings.join("; "));
        }

        log::info!(
            "Selected site {site}: {} rows, {} images",
            selection.subsets.iter().map(|t| t.len()).sum::<usize>(),
            self.images.len()
        );
        self.selection = Some(selection);
    }

    fn find_images(&self, pattern: &str) -> Result<Vec<PathBuf>, DataError> {
        let images = &self.config.images;
        let found = find_assets(&self.config.resolve(&images.dir), pattern)?;
        images.naming.sort_by_range(found)
    }

    fn set_gdp(&mut self, long: LongTable) {
        let entities = long.entities();
        // Keep the user's picks across reloads when they still exist.
        let mut countries: BTreeSet<CellValue> = self
            .gdp_countries
            .iter()
            .filter(|c| entities.contains(c))
            .cloned()
            .collect();
        if countries.is_empty() {
            countries = DEFAULT_COUNTRIES
                .iter()
                .map(|c| CellValue::from(*c))
                .filter(|c| entities.contains(&c))
                .collect();
        }
        if countries.is_empty() {
            countries = entities.iter().take(3).map(|c| (*c).clone()).collect();
        }
        self.gdp_countries = countries;
        if let Some((min, max)) = long.key_bounds() {
            self.year_from = self.year_from.clamp(min, max);
            self.year_to = self.year_to.clamp(min, max);
        }
        self.gdp_table = Some(long.to_table("gdp"));
        self.gdp = Some(long);
        self.rebuild_color_map();
    }

    /// Rebuild the GDP series colours from the charted countries.
    pub fn rebuild_color_map(&mut self) {
        self.color_map = ColorMap::new(&self.gdp_countries);
    }

    /// Append an error to the status line without dropping earlier ones.
    pub fn report_error(&mut self, msg: impl std::fmt::Display) {
        self.status_message = Some(match self.status_message.take() {
            Some(existing) => format!("{existing}; {msg}"),
            None => format!("Error: {msg}"),
        });
    }

    /// Add or remove a country from the GDP chart.
    pub fn toggle_country(&mut self, country: &CellValue) {
        if !self.gdp_countries.remove(country) {
            self.gdp_countries.insert(country.clone());
        }
        self.rebuild_color_map();
    }

    pub fn year_window(&self) -> RangeInclusive<i64> {
        self.year_from.min(self.year_to)..=self.year_from.max(self.year_to)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn write_fixture(dir: &Path) -> ReportConfig {
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::create_dir_all(dir.join("images")).unwrap();
        fs::write(
            dir.join("data/gdp_data.csv"),
            "Country Name,Country Code,2000,2001\n\
             Canada,CAN,1.0,2.0\n\
             France,FRA,3.0,\n",
        )
        .unwrap();
        fs::write(
            dir.join("data/sites.csv"),
            "site_name,latitude,longitude\n\
             A1094,45.42,-75.69\n\
             B2201,49.28,-123.12\n\
             A1094,45.42,-75.69\n\
             C3300,,\n",
        )
        .unwrap();
        fs::write(
            dir.join("data/strength.csv"),
            "site,range,rsrp\nA1094,1,-80.5\nB2201,1,-95.0\nA1094,5,-88.0\n",
        )
        .unwrap();
        for name in ["1_2_A1094_10.jpg", "1_2_A1094_5.jpg", "1_2_B2201_1.jpg"] {
            fs::write(dir.join("images").join(name), b"").unwrap();
        }

        let toml = r#"
            [gdp]
            min_year = 2000
            max_year = 2001

            [[sites.tables]]
            name = "sites"
            path = "data/sites.csv"

            [[sites.tables]]
            name = "strength"
            path = "data/strength.csv"
            key_column = "site"
        "#;
        ReportConfig::from_toml(toml, dir).unwrap()
    }

    #[test]
    fn loads_everything_and_selects_first_site() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(write_fixture(dir.path()));

        assert_eq!(state.status_message, None);
        let gdp = state.gdp.as_ref().unwrap();
        assert_eq!(gdp.len(), 4);
        assert_eq!(state.gdp_countries, BTreeSet::from([CellValue::from("FRA")]));

        assert_eq!(
            state.site_names,
            vec![CellValue::from("A1094"), "B2201".into(), "C3300".into()]
        );
        assert_eq!(state.locations.len(), 2);
        assert_eq!(state.locations[1].point, [-123.12, 49.28]);

        let selection = state.selection.as_ref().unwrap();
        assert_eq!(selection.site, CellValue::from("A1094"));
        assert_eq!(selection.subsets[0].len(), 2);
        assert_eq!(selection.subsets[1].len(), 2);
        let names: Vec<_> = state
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1_2_A1094_5.jpg", "1_2_A1094_10.jpg"]);
    }

    #[test]
    fn site_without_images_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(write_fixture(dir.path()));

        state.select_site("C3300".into());
        assert_eq!(state.status_message, None);
        assert!(state.images.is_empty());
        assert!(state.warning.as_deref().unwrap().contains("*_*_C3300_*.jpg"));
    }

    #[test]
    fn unknown_site_keeps_both_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(write_fixture(dir.path()));

        state.select_site("Z9999".into());
        let warning = state.warning.as_deref().unwrap();
        assert!(warning.contains("No rows found for site Z9999"), "{warning}");
        assert!(warning.contains("*_*_Z9999_*.jpg"), "{warning}");
    }

    #[test]
    fn reported_errors_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        fs::remove_file(dir.path().join("data/gdp_data.csv")).unwrap();
        let mut state = AppState::new(config);
        let load_error = state.status_message.clone().unwrap();

        state.report_error("bad config");
        let status = state.status_message.as_deref().unwrap();
        assert!(status.starts_with(&load_error), "{status}");
        assert!(status.ends_with("; bad config"), "{status}");

        state.status_message = None;
        state.report_error("bad config");
        assert_eq!(state.status_message.as_deref(), Some("Error: bad config"));
    }

    #[test]
    fn badly_named_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        fs::write(dir.path().join("images/1_2_B2201_far.jpg"), b"").unwrap();
        let mut state = AppState::new(config);

        state.select_site("B2201".into());
        assert!(state.images.is_empty());
        assert!(state.status_message.as_deref().unwrap().contains("naming convention"));
        assert!(state.selection.is_some());
    }

    #[test]
    fn missing_source_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path());
        fs::remove_file(dir.path().join("data/gdp_data.csv")).unwrap();
        let state = AppState::new(config);

        assert!(state.gdp.is_none());
        assert!(state.status_message.as_deref().unwrap().contains("not found"));
        assert_eq!(state.site_names.len(), 3);
    }

    #[test]
    fn reload_picks_up_changed_files_and_keeps_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(write_fixture(dir.path()));
        state.select_site("B2201".into());

        fs::write(
            dir.path().join("data/sites.csv"),
            "site_name,latitude,longitude\nB2201,49.28,-123.12\nD4400,50.0,-100.0\n",
        )
        .unwrap();
        state.load_all();
        assert_eq!(state.site_names.len(), 3, "cached copy still served");

        state.reload();
        assert_eq!(state.site_names, vec![CellValue::from("B2201"), "D4400".into()]);
        assert_eq!(state.selection.as_ref().unwrap().site, CellValue::from("B2201"));
    }

    #[test]
    fn toggling_countries_updates_colours() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(write_fixture(dir.path()));
        let can = CellValue::from("CAN");

        state.toggle_country(&can);
        assert!(state.gdp_countries.contains(&can));
        assert_ne!(state.color_map.color_for(&can), eframe::egui::Color32::GRAY);

        state.toggle_country(&can);
        assert!(!state.gdp_countries.contains(&can));
        assert_eq!(state.year_window(), 2000..=2001);
    }
}
