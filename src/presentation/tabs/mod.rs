pub mod devices;
pub mod scan;
pub mod settings;

use crate::domain::models::MessageSeverity;
use crate::presentation::app::BtDeskApp;
use eframe::egui;

/// Last operation outcome, shown on every tab.
pub(crate) fn status_panel(app: &BtDeskApp, ui: &mut egui::Ui) {
    let Some(msg) = &app.status_message else {
        return;
    };

    let color = match msg.severity {
        MessageSeverity::Info => egui::Color32::from_rgb(60, 110, 220),
        MessageSeverity::Success => egui::Color32::from_rgb(0, 150, 0),
        MessageSeverity::Warning => egui::Color32::from_rgb(200, 150, 0),
        MessageSeverity::Error => egui::Color32::RED,
    };

    ui.label(egui::RichText::new(&msg.message).color(color).strong());
    ui.add_space(6.0);
}
