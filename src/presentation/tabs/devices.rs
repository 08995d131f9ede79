use crate::domain::models::{BluetoothCommand, DeviceAction};
use crate::presentation::app::BtDeskApp;
use crate::presentation::components;
use crate::presentation::tabs;
use eframe::egui;

pub fn render(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    components::page_title(ui, "Paired Devices");
    ui.add_space(12.0);

    tabs::status_panel(app, ui);

    ui_paired_list(app, ui);

    if app.selected_device.is_some() {
        ui.add_space(12.0);
        device_detail_card(app, ui);
    }
}

fn ui_paired_list(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    components::section(ui, "Paired", |ui| {
        if ui.button("Refresh").clicked() {
            let _ = app.command_tx.send(BluetoothCommand::RefreshPaired);
        }

        if app.paired_devices.is_empty() {
            ui.label(egui::RichText::new("No paired devices.").italics());
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("paired_list")
            .max_height(280.0)
            .show(ui, |ui| {
                for device in &app.paired_devices {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new(device.display_name()).strong());
                        ui.label(
                            egui::RichText::new(&device.address)
                                .monospace()
                                .size(13.0),
                        );
                        if device.connected {
                            ui.label(
                                egui::RichText::new(" connected ")
                                    .size(12.0)
                                    .background_color(egui::Color32::from_rgb(0, 170, 80))
                                    .color(egui::Color32::BLACK),
                            );
                        }
                        if device.trusted {
                            ui.label(egui::RichText::new("trusted").size(12.0));
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

/// Detail block plus the per-device actions; also used by the scan tab.
pub fn device_detail_card(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    let Some(device) = app.selected_device.clone() else {
        return;
    };

    components::section(ui, "Device Details", |ui| {
        egui::Grid::new("device_detail_grid")
            .spacing([30.0, 6.0])
            .show(ui, |ui| {
                ui.label("Address:");
                ui.label(egui::RichText::new(&device.address).monospace());
                ui.end_row();

                ui.label("Name:");
                ui.label(device.name.as_deref().unwrap_or("(unknown)"));
                ui.end_row();

                ui.label("Paired:");
                ui.label(if device.paired { "yes" } else { "no" });
                ui.end_row();

                ui.label("Connected:");
                ui.label(if device.connected { "yes" } else { "no" });
                ui.end_row();

                ui.label("Trusted:");
                ui.label(if device.trusted { "yes" } else { "no" });
                ui.end_row();

                ui.label("Signal:");
                match device.rssi {
                    Some(rssi) => ui.label(format!("{} dBm", rssi)),
                    None => ui.label("(unknown)"),
                };
                ui.end_row();

                if let Some(icon) = &device.icon {
                    ui.label("Type:");
                    ui.label(icon);
                    ui.end_row();
                }
            });

        ui.add_space(8.0);

        ui.horizontal(|ui| {
            let command = |action: DeviceAction| BluetoothCommand::Device {
                action,
                address: device.address.clone(),
            };

            if !device.paired && ui.button("Pair").clicked() {
                let _ = app.command_tx.send(command(DeviceAction::Pair));
            }
            if device.connected {
                if ui.button("Disconnect").clicked() {
                    let _ = app.command_tx.send(command(DeviceAction::Disconnect));
                }
            } else if ui.button("Connect").clicked() {
                let _ = app.command_tx.send(command(DeviceAction::Connect));
            }
            if !device.trusted && ui.button("Trust").clicked() {
                let _ = app.command_tx.send(command(DeviceAction::Trust));
            }
            if device.paired && ui.button("Remove").clicked() {
                let _ = app.command_tx.send(command(DeviceAction::Remove));
                app.selected_device = None;
            }

            if ui.button("Refresh").clicked() {
                let _ = app
                    .command_tx
                    .send(BluetoothCommand::FetchInfo(device.address.clone()));
            }
            if ui.button("Close").clicked() {
                app.selected_device = None;
            }
        });
    });
}
