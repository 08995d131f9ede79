mod domain;
mod infrastructure;
mod presentation;

use eframe::egui;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 680.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("btdesk"),
        ..Default::default()
    };

    eframe::run_native(
        "btdesk",
        options,
        Box::new(|cc| Ok(Box::new(presentation::app::BtDeskApp::new(cc)))),
    )
}
