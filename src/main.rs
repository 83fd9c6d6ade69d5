use eframe::egui;
use tulp_report::app::ReportApp;
use tulp_report::config::ReportConfig;
use tulp_report::state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let (config, config_error) = match ReportConfig::discover() {
        Ok(config) => (config, None),
        Err(e) => {
            log::error!("Failed to load config: {e:#}");
            (ReportConfig::default(), Some(format!("{e:#}")))
        }
    };

    let mut state = AppState::new(config);
    if let Some(msg) = config_error {
        state.report_error(msg);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "TULP Report",
        options,
        Box::new(|cc| {
            // Install image loaders so egui can render file:// jpg/png.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(ReportApp::new(state)))
        }),
    )
}
