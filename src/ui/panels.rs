use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::ReportConfig;
use crate::state::{AppState, Tab};
use crate::ui::table;

// ---------------------------------------------------------------------------
// Left side panel – site picker
// ---------------------------------------------------------------------------

/// Render the left panel: the single site selection control.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Select Site");
    ui.separator();

    if state.site_names.is_empty() {
        ui.label("No sites loaded.");
        return;
    }

    let current = state.selection.as_ref().map(|s| s.site.clone());
    let current_text = current.as_ref().map(|s| s.to_string()).unwrap_or_default();

    // Clone what we need so we can mutate state after the combo box closes.
    let sites = state.site_names.clone();
    let mut picked = None;

    egui::ComboBox::from_id_salt("site_picker")
        .selected_text(current_text)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            ScrollArea::vertical().max_height(400.0).show(ui, |ui: &mut Ui| {
                for site in &sites {
                    let is_current = current.as_ref() == Some(site);
                    if ui.selectable_label(is_current, site.to_string()).clicked() && !is_current {
                        picked = Some(site.clone());
                    }
                }
            });
        });

    if let Some(site) = picked {
        state.select_site(site);
    }

    ui.add_space(8.0);
    ui.label(format!("{} sites", sites.len()));

    if let Some(selection) = &state.selection {
        ui.separator();
        ui.strong("Rows for this site");
        for (src, subset) in state.sources.iter().zip(&selection.subsets) {
            ui.label(format!("{}: {}", src.name, subset.len()));
        }
        ui.label(format!("Images: {}", state.images.len()));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open config…").clicked() {
                open_config_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(selection) = &state.selection {
            ui.label(format!("Site {}", selection.site));
        }

        if let Some(msg) = &state.warning {
            ui.label(RichText::new(msg).color(Color32::YELLOW));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Tab strip above the central view.
pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.tab, Tab::Tables, "Tables");
        ui.selectable_value(&mut state.tab, Tab::Map, "Map");
        ui.selectable_value(&mut state.tab, Tab::Images, "Images");
        ui.selectable_value(&mut state.tab, Tab::Gdp, "GDP");
    });
    ui.separator();
}

// ---------------------------------------------------------------------------
// Central views
// ---------------------------------------------------------------------------

/// The primary site table followed by the selected site's rows of every table.
pub fn tables_view(ui: &mut Ui, state: &AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(primary) = state.primary_source() {
                ui.heading("All sites");
                table::data_table(ui, "all_sites", &primary.table);
                ui.add_space(12.0);
            }

            let Some(selection) = &state.selection else {
                return;
            };

            for (src, subset) in state.sources.iter().zip(&selection.subsets) {
                ui.heading(format!("{} – {}", src.name, selection.site));
                if subset.is_empty() {
                    ui.label("No rows for this site.");
                } else {
                    table::data_table(ui, &src.name, subset);
                }
                ui.add_space(12.0);
            }
        });
}

/// The selected site's images in ascending range order.
pub fn images_view(ui: &mut Ui, state: &AppState) {
    let Some(selection) = &state.selection else {
        ui.label("No site selected.");
        return;
    };

    if state.images.is_empty() {
        ui.label(format!("No images match {}", selection.asset_pattern));
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for path in &state.images {
                let uri = format!("file://{}", path.display());
                ui.add(egui::Image::new(uri).max_width(ui.available_width()));
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                ui.label(
                    RichText::new(format!("M2C data for {} ({name})", selection.site)).small(),
                );
                ui.add_space(8.0);
            }
        });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_config_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open report config")
        .add_filter("TOML", &["toml"])
        .pick_file();

    if let Some(path) = file {
        match ReportConfig::load(&path) {
            Ok(config) => state.set_config(config),
            Err(e) => {
                log::error!("Failed to load config: {e:#}");
                state.report_error(format!("{e:#}"));
            }
        }
    }
}
