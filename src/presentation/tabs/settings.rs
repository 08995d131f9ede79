use crate::domain::models::{AdapterStatus, BluetoothCommand, MessageSeverity, StatusMessage};
use crate::presentation::app::BtDeskApp;
use crate::presentation::components;
use crate::presentation::tabs;
use eframe::egui;

pub fn render(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    components::page_title(ui, "Settings");
    ui.add_space(12.0);

    tabs::status_panel(app, ui);

    ui_adapter_card(app, ui);
    ui.add_space(10.0);

    ui_tuning_cards(app, ui);
}

fn ui_adapter_card(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    components::section(ui, "Adapter", |ui| {
        let (status_text, bg_color, text_color) = match app.adapter_status {
            AdapterStatus::Enabled => (
                "BLUETOOTH ENABLED",
                egui::Color32::from_rgb(0, 180, 70),
                egui::Color32::BLACK,
            ),
            AdapterStatus::Disabled => (
                "BLUETOOTH DISABLED",
                egui::Color32::from_rgb(200, 60, 60),
                egui::Color32::WHITE,
            ),
            AdapterStatus::Unknown => (
                "STATUS UNKNOWN",
                egui::Color32::from_gray(120),
                egui::Color32::WHITE,
            ),
        };
        components::banner(ui, status_text, bg_color, text_color);

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            match app.adapter_status {
                AdapterStatus::Enabled => {
                    if ui.button("Power Off").clicked() {
                        let _ = app.command_tx.send(BluetoothCommand::SetPower(false));
                    }
                }
                _ => {
                    if ui.button("Power On").clicked() {
                        let _ = app.command_tx.send(BluetoothCommand::SetPower(true));
                    }
                }
            }
            if ui.button("Re-check").clicked() {
                let _ = app.command_tx.send(BluetoothCommand::CheckStatus);
            }
        });
    });
}

fn ui_tuning_cards(app: &mut BtDeskApp, ui: &mut egui::Ui) {
    let mut saved = None;

    if let Ok(mut settings) = app.settings.lock() {
        let settings_mut = settings.get_mut();

        components::section(ui, "Scanning", |ui| {
            ui.horizontal(|ui| {
                ui.label("Scan duration:");
                ui.add(
                    egui::Slider::new(&mut settings_mut.scan.duration_ms, 1000..=60_000)
                        .suffix(" ms"),
                );
            });
            ui.horizontal(|ui| {
                ui.label("Shutdown grace:");
                ui.add(
                    egui::Slider::new(&mut settings_mut.scan.drain_grace_ms, 100..=2000)
                        .suffix(" ms"),
                );
            });

            ui.collapsing("Tool paths", |ui| {
                egui::Grid::new("tool_paths").spacing([10.0, 8.0]).show(ui, |ui| {
                    ui.label("bluetoothctl:");
                    ui.text_edit_singleline(&mut settings_mut.tools.bluetoothctl);
                    ui.end_row();
                    ui.label("rfkill:");
                    ui.text_edit_singleline(&mut settings_mut.tools.rfkill);
                    ui.end_row();
                });
            });
        });

        ui.add_space(10.0);

        components::section(ui, "Logging", |ui| {
            ui.horizontal(|ui| {
                ui.label("Verbosity level:");
                egui::ComboBox::from_id_salt("log_level")
                    .selected_text(&settings_mut.log_settings.level)
                    .show_ui(ui, |ui| {
                        for level in &["trace", "debug", "info", "warn", "error"] {
                            ui.selectable_value(
                                &mut settings_mut.log_settings.level,
                                level.to_string(),
                                *level,
                            );
                        }
                    });
            });

            ui.checkbox(
                &mut settings_mut.log_settings.console_logging_enabled,
                "Console logs",
            );
            ui.checkbox(
                &mut settings_mut.log_settings.file_logging_enabled,
                "Persistent file logs",
            );

            if settings_mut.log_settings.file_logging_enabled {
                ui.indent("file_logs", |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Log directory:");
                        ui.text_edit_singleline(&mut settings_mut.log_settings.log_dir);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Rotation:");
                        egui::ComboBox::from_id_salt("log_rotation")
                            .selected_text(&settings_mut.log_settings.rotation)
                            .show_ui(ui, |ui| {
                                for rotation in &["daily", "hourly", "never"] {
                                    ui.selectable_value(
                                        &mut settings_mut.log_settings.rotation,
                                        rotation.to_string(),
                                        *rotation,
                                    );
                                }
                            });
                    });
                });
                ui.label(
                    egui::RichText::new("Restart required for log changes.")
                        .italics()
                        .size(12.0),
                );
            }
        });

        ui.add_space(10.0);

        if ui.button("Save Settings").clicked() {
            saved = Some(settings.save());
        }
    }

    if let Some(result) = saved {
        app.status_message = Some(match result {
            Ok(()) => StatusMessage {
                message: "Settings saved".to_string(),
                severity: MessageSeverity::Success,
            },
            Err(e) => StatusMessage {
                message: format!("Could not save settings: {}", e),
                severity: MessageSeverity::Error,
            },
        });
    }
}
