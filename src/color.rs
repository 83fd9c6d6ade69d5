use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: entity (country code, site name) → Color32
// ---------------------------------------------------------------------------

/// Maps entities to distinct colours, stable for a given entity set.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<CellValue, Color32>,
}

impl ColorMap {
    pub fn new<'a>(entities: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let entities: Vec<&CellValue> = entities.into_iter().collect();
        let palette = generate_palette(entities.len());
        ColorMap {
            mapping: entities
                .into_iter()
                .cloned()
                .zip(palette)
                .collect(),
        }
    }

    /// Look up the colour for an entity; unknown entities are grey.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping.get(value).copied().unwrap_or(Color32::GRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let palette = generate_palette(6);
        assert_eq!(palette.len(), 6);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_entity_is_grey() {
        let countries = [CellValue::from("CAN"), CellValue::from("DEU")];
        let map = ColorMap::new(&countries);
        assert_ne!(map.color_for(&countries[0]), Color32::GRAY);
        assert_eq!(map.color_for(&"FRA".into()), Color32::GRAY);
    }
}
