//! Writes a self-consistent sample data set plus a `report.toml` pointing at it.
//!
//! ```text
//! cargo run --bin generate_sample [out_dir]
//! ```

use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use image::{Rgb, RgbImage};
use parquet::arrow::ArrowWriter;

const MIN_YEAR: i32 = 1960;
const MAX_YEAR: i32 = 2022;

/// (site, latitude, longitude, province)
const SITES: [(&str, f64, f64, &str); 8] = [
    ("A1094", 45.4215, -75.6972, "ON"),
    ("A1107", 43.6532, -79.3832, "ON"),
    ("B2201", 49.2827, -123.1207, "BC"),
    ("B2256", 48.4284, -123.3656, "BC"),
    ("C3300", 51.0447, -114.0719, "AB"),
    ("D4410", 45.5017, -73.5673, "QC"),
    ("E5120", 44.6488, -63.5752, "NS"),
    ("F6001", 49.8951, -97.1384, "MB"),
];

/// (name, code, GDP in 1960, yearly growth)
const COUNTRIES: [(&str, &str, f64, f64); 8] = [
    ("Brazil", "BRA", 17.0e9, 0.075),
    ("Canada", "CAN", 40.5e9, 0.062),
    ("France", "FRA", 62.6e9, 0.064),
    ("Germany", "DEU", 72.0e9, 0.060),
    ("Japan", "JPN", 44.3e9, 0.080),
    ("Mexico", "MEX", 13.0e9, 0.072),
    ("United Kingdom", "GBR", 73.2e9, 0.055),
    ("Aruba", "ABW", 0.0, 0.0),
];

/// Ranges (metres) at which each site was imaged.
const IMAGE_RANGES: [u32; 4] = [1, 5, 10, 25];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let out = Path::new(&out_dir);
    fs::create_dir_all(out.join("data")).context("creating data directory")?;
    fs::create_dir_all(out.join("images")).context("creating images directory")?;

    let mut rng = SimpleRng::new(42);

    write_gdp(&out.join("data/gdp_data.csv"), &mut rng)?;
    write_sites(&out.join("data/sites.parquet"))?;
    write_summary(&out.join("data/summary.parquet"), &mut rng)?;
    write_strength(&out.join("data/strength.parquet"), &mut rng)?;
    write_images(&out.join("images"))?;
    fs::write(out.join("report.toml"), REPORT_TOML).context("writing report.toml")?;

    println!(
        "Wrote {} countries, {} sites and {} images to {}",
        COUNTRIES.len(),
        SITES.len(),
        SITES.len() * IMAGE_RANGES.len(),
        out.display()
    );
    Ok(())
}

/// Wide GDP table, one column per year. Aruba has no data before 1986.
fn write_gdp(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let mut csv = String::from("Country Name,Country Code,Indicator Name");
    for year in MIN_YEAR..=MAX_YEAR {
        write!(csv, ",{year}")?;
    }
    csv.push('\n');

    for (name, code, base, growth) in COUNTRIES {
        write!(csv, "{name},{code},GDP (current US$)")?;
        let mut gdp = base;
        for year in MIN_YEAR..=MAX_YEAR {
            if code == "ABW" {
                gdp = if year < 1986 { 0.0 } else { 0.4e9 + (year - 1986) as f64 * 0.08e9 };
            } else {
                gdp *= 1.0 + rng.gauss(growth, 0.03);
            }
            if gdp > 0.0 {
                write!(csv, ",{gdp:.1}")?;
            } else {
                csv.push(',');
            }
        }
        csv.push('\n');
    }

    fs::write(path, csv).with_context(|| format!("writing {}", path.display()))
}

/// Site locations. A1094 appears twice, as it does in the field exports.
fn write_sites(path: &Path) -> Result<()> {
    let rows: Vec<_> = SITES.iter().chain(SITES.iter().take(1)).collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("site_name", DataType::Utf8, false),
        Field::new("latitude", DataType::Float64, true),
        Field::new("longitude", DataType::Float64, true),
        Field::new("province", DataType::Utf8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|s| s.0))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|s| s.1))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|s| s.2))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|s| s.3))),
    ];
    write_parquet(path, schema, columns)
}

/// One TLUP/ATLUP summary row per site.
fn write_summary(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    // 2024-05-01 as days since the Unix epoch.
    let survey_base = 19844;

    let schema = Arc::new(Schema::new(vec![
        Field::new("site_name", DataType::Utf8, false),
        Field::new("tlup_score", DataType::Float64, true),
        Field::new("atlup_score", DataType::Float64, true),
        Field::new("status", DataType::Utf8, true),
        Field::new("surveyed_on", DataType::Date32, true),
    ]));

    let tlup: Vec<f64> = SITES.iter().map(|_| rng.gauss(72.0, 8.0)).collect();
    let atlup: Vec<Option<f64>> = SITES
        .iter()
        .enumerate()
        .map(|(i, _)| (i % 4 != 3).then(|| rng.gauss(65.0, 10.0)))
        .collect();
    let status = tlup.iter().map(|s| if *s >= 70.0 { "pass" } else { "review" });
    let surveyed: Vec<i32> = (0..SITES.len() as i32).map(|i| survey_base + i * 3).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(SITES.iter().map(|s| s.0))),
        Arc::new(Float64Array::from(tlup.clone())),
        Arc::new(Float64Array::from(atlup)),
        Arc::new(StringArray::from_iter_values(status)),
        Arc::new(Date32Array::from(surveyed)),
    ];
    write_parquet(path, schema, columns)
}

/// Signal strength / quality readings: several ranges per site.
fn write_strength(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let mut site = Vec::new();
    let mut range = Vec::new();
    let mut rsrp = Vec::new();
    let mut sinr = Vec::new();

    for (name, ..) in SITES {
        for r in IMAGE_RANGES {
            site.push(name);
            range.push(r as i64);
            rsrp.push(-70.0 - 12.0 * (r as f64).ln_1p() + rng.gauss(0.0, 2.5));
            sinr.push(25.0 - 3.0 * (r as f64).ln_1p() + rng.gauss(0.0, 1.5));
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("site", DataType::Utf8, false),
        Field::new("range_m", DataType::Int64, false),
        Field::new("rsrp_dbm", DataType::Float64, false),
        Field::new("sinr_db", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(site)),
        Arc::new(Int64Array::from(range)),
        Arc::new(Float64Array::from(rsrp)),
        Arc::new(Float64Array::from(sinr)),
    ];
    write_parquet(path, schema, columns)
}

fn write_parquet(path: &Path, schema: Arc<Schema>, columns: Vec<ArrayRef>) -> Result<()> {
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// `1_2_{site}_{range}.jpg`: a coverage-style gradient that fades with range.
fn write_images(dir: &Path) -> Result<()> {
    for (idx, (name, ..)) in SITES.iter().enumerate() {
        for r in IMAGE_RANGES {
            let falloff = 1.0 / (1.0 + r as f32 / 10.0);
            let hue_shift = (idx * 30) as u8;
            let img = RgbImage::from_fn(320, 200, |x, y| {
                let dx = x as f32 - 160.0;
                let dy = y as f32 - 100.0;
                let d = (dx * dx + dy * dy).sqrt() / 190.0;
                let strength = ((1.0 - d) * falloff).clamp(0.0, 1.0);
                Rgb([
                    (strength * 255.0) as u8,
                    ((1.0 - strength) * 200.0) as u8 ^ hue_shift,
                    60,
                ])
            });
            let path = dir.join(format!("1_2_{name}_{r}.jpg"));
            img.save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }
    Ok(())
}

const REPORT_TOML: &str = r#"[gdp]
path = "data/gdp_data.csv"
id_column = "Country Code"
min_year = 1960
max_year = 2022

[sites]
primary = "sites"

[[sites.tables]]
name = "sites"
path = "data/sites.parquet"
key_column = "site_name"

[[sites.tables]]
name = "summary"
path = "data/summary.parquet"
key_column = "site_name"

[[sites.tables]]
name = "strength"
path = "data/strength.parquet"
key_column = "site"

[map]
table = "sites"
latitude = "latitude"
longitude = "longitude"

[images]
dir = "images"
template = "*_*_{site}_*.jpg"
separator = "_"
range_field = 3

[cache]
ttl_secs = 86400
"#;
