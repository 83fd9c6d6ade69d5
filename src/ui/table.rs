use eframe::egui::{self, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::model::{CellValue, Table};

const ROW_HEIGHT: f32 = 18.0;

/// Read-only grid of a table. Rows are virtualised, so large tables are fine.
pub fn data_table(ui: &mut Ui, id: &str, table: &Table) {
    if table.columns.is_empty() {
        ui.label("(no columns)");
        return;
    }

    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(TableColumn::auto().at_least(60.0), table.columns.len())
            .max_scroll_height(300.0)
            .header(ROW_HEIGHT + 2.0, |mut header| {
                for column in &table.columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(&column.name)
                            .on_hover_text(column.dtype.to_string());
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, table.len(), |mut row| {
                    let cells = &table.rows[row.index()];
                    for cell in cells {
                        row.col(|ui: &mut Ui| {
                            match cell {
                                CellValue::Null => ui.weak("–"),
                                other => ui.label(other.to_string()),
                            };
                        });
                    }
                });
            });
    });
}
