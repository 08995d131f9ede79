use crate::domain::models::BluetoothCommand;
use crate::presentation::app::BtDeskApp;
use crate::presentation::components;
use crate::presentation::tabs;
use eframe::egui;

pub fn render(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    components::page_title(ui, "Device Discovery");
    ui.add_space(12.0);

    tabs::status_panel(app, ui);

    ui_scan_controls(app, ui);
    ui.add_space(12.0);

    ui_results(app, ui);

    if app.selected_device.is_some() {
        ui.add_space(12.0);
        tabs::devices::device_detail_card(app, ui);
    }
}

fn ui_scan_controls(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    components::section(ui, "Discovery", |ui| {
        ui.horizontal(|ui| {
            if app.is_scanning {
                if ui.button("Cancel Scan").clicked() {
                    let _ = app.command_tx.send(BluetoothCommand::CancelScan);
                }
                ui.spinner();
            } else {
                if ui.button("Start Scan").clicked() {
                    app.discovered_devices.clear();
                    app.is_scanning = true;
                    app.scan_progress = None;
                    let _ = app.command_tx.send(BluetoothCommand::StartScan);
                }
                // everything the adapter remembers, without scanning
                if ui.button("Load Known").clicked() {
                    let _ = app.command_tx.send(BluetoothCommand::RefreshKnown);
                }
            }
        });

        if let Some((elapsed, total)) = app.scan_progress {
            let fraction = (elapsed.as_secs_f32() / total.as_secs_f32().max(f32::EPSILON)).min(1.0);
            ui.add(
                egui::ProgressBar::new(fraction).text(format!(
                    "{:.1}s / {:.0}s",
                    elapsed.as_secs_f32(),
                    total.as_secs_f32()
                )),
            );
        }
    });
}

fn ui_results(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    components::section(ui, "Nearby Devices", |ui| {
        if app.discovered_devices.is_empty() {
            let hint = if app.is_scanning {
                "Listening for announcements..."
            } else {
                "No devices yet. Start a scan."
            };
            ui.label(egui::RichText::new(hint).italics());
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("scan_results")
            .max_height(260.0)
            .show(ui, |ui| {
                for device in &app.discovered_devices {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new(device.display_name()).strong());
                        ui.label(
                            egui::RichText::new(&device.address)
                                .monospace()
                                .size(13.0),
                        );
                        if let Some(rssi) = device.rssi {
                            ui.label(format!("{} dBm", rssi));
                        }
                        if device.paired {
                            ui.label(egui::RichText::new("paired").size(12.0));
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Details").clicked() {
                                app.selected_device = Some(device.clone());
                            }
                        });
                    });
                    ui.separator();
                }
            });
    });
}
