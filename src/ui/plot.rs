use eframe::egui::{self, Color32, ScrollArea, Ui};
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotPoints, Points};

use crate::data::model::CellValue;
use crate::state::AppState;
use crate::ui::table;

// ---------------------------------------------------------------------------
// Location map (central panel, Map tab)
// ---------------------------------------------------------------------------

/// Plot every site at its longitude/latitude, the selected site highlighted.
pub fn site_map(ui: &mut Ui, state: &AppState) {
    if state.locations.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No site coordinates loaded");
        });
        return;
    }

    let selected = state.selection.as_ref().map(|s| &s.site);

    let (chosen, others): (Vec<_>, Vec<_>) = state
        .locations
        .iter()
        .partition(|loc| Some(&loc.site) == selected);

    Plot::new("site_map")
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .data_aspect(1.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .label_formatter(|name, value| {
            if name.is_empty() {
                format!("{:.4}, {:.4}", value.y, value.x)
            } else {
                format!("{name}\n{:.4}, {:.4}", value.y, value.x)
            }
        })
        .show(ui, |plot_ui| {
            let points: PlotPoints = others.iter().map(|loc| loc.point).collect();
            plot_ui.points(
                Points::new(points)
                    .name("Sites")
                    .shape(MarkerShape::Circle)
                    .radius(3.0)
                    .color(Color32::LIGHT_BLUE),
            );

            for loc in chosen {
                plot_ui.points(
                    Points::new(PlotPoints::from(vec![loc.point]))
                        .name(loc.site.to_string())
                        .shape(MarkerShape::Diamond)
                        .radius(7.0)
                        .color(Color32::RED),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// GDP chart (central panel, GDP tab)
// ---------------------------------------------------------------------------

/// Year window, country picker and the GDP-over-time line chart.
pub fn gdp_view(ui: &mut Ui, state: &mut AppState) {
    let Some(gdp) = &state.gdp else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No GDP data loaded");
        });
        return;
    };

    let (min, max) = gdp
        .key_bounds()
        .unwrap_or((state.config.gdp.min_year, state.config.gdp.max_year));
    let entities: Vec<CellValue> = gdp.entities().into_iter().cloned().collect();

    ui.horizontal(|ui: &mut Ui| {
        ui.add(egui::Slider::new(&mut state.year_from, min..=max).text("from"));
        ui.add(egui::Slider::new(&mut state.year_to, min..=max).text("to"));
    });

    let mut toggled = None;
    egui::SidePanel::right("gdp_countries")
        .default_width(140.0)
        .resizable(true)
        .show_inside(ui, |ui: &mut Ui| {
            ui.strong(format!("Countries ({})", state.gdp_countries.len()));
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    for country in &entities {
                        let mut checked = state.gdp_countries.contains(country);
                        let text = egui::RichText::new(country.to_string())
                            .color(state.color_map.color_for(country));
                        if ui.checkbox(&mut checked, text).changed() {
                            toggled = Some(country.clone());
                        }
                    }
                });
        });
    if let Some(country) = toggled {
        state.toggle_country(&country);
    }

    if let Some(long_table) = &state.gdp_table {
        egui::TopBottomPanel::bottom("gdp_table")
            .resizable(true)
            .show_inside(ui, |ui: &mut Ui| {
                egui::CollapsingHeader::new(format!("Data ({} rows)", long_table.len()))
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        table::data_table(ui, "gdp_long", long_table);
                    });
            });
    }

    let Some(gdp) = &state.gdp else {
        return;
    };
    let window = state.year_window();

    Plot::new("gdp_plot")
        .legend(Legend::default())
        .x_axis_label(gdp.key_name.clone())
        .y_axis_label(gdp.value_name.clone())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for country in &state.gdp_countries {
                let points = gdp.series(country, window.clone());
                let line = Line::new(PlotPoints::from(points))
                    .name(country.to_string())
                    .color(state.color_map.color_for(country))
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}
