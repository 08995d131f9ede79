use crate::domain::models::{
    AdapterStatus, AppEvent, BluetoothCommand, BluetoothDevice, DeviceAction, MessageSeverity,
    StatusMessage, Tab,
};
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::BluetoothService;
use eframe::egui;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::error;

pub struct BtDeskApp {
    // Services
    pub(crate) settings: Arc<Mutex<SettingsService>>,

    // Bluetooth
    pub(crate) command_tx: mpsc::UnboundedSender<BluetoothCommand>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // State
    pub(crate) adapter_status: AdapterStatus,
    pub(crate) status_message: Option<StatusMessage>,
    pub(crate) paired_devices: Vec<BluetoothDevice>,
    pub(crate) discovered_devices: Vec<BluetoothDevice>,
    pub(crate) selected_device: Option<BluetoothDevice>,

    // Scanning
    pub(crate) is_scanning: bool,
    pub(crate) scan_progress: Option<(Duration, Duration)>,

    // UI State
    pub(crate) selected_tab: Tab,
    pub(crate) is_dark_mode: bool,

    // Logging guard
    pub(crate) _logging_guard: Option<crate::infrastructure::logging::LoggingGuard>,
}

impl BtDeskApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        crate::presentation::theme::configure_style(&cc.egui_ctx, false);

        let settings_service = SettingsService::new().expect("Failed to load settings");

        let logging_guard =
            crate::infrastructure::logging::init_logger(&settings_service.get().log_settings)
                .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
                .ok();

        tracing::info!("Starting btdesk");

        let settings = Arc::new(Mutex::new(settings_service));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let bt_settings = settings.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime for Bluetooth");

            rt.block_on(async move {
                let mut service = BluetoothService::new(event_tx.clone(), bt_settings);

                while let Some(cmd) = command_rx.recv().await {
                    handle_command(&mut service, &event_tx, cmd).await;
                }
            });
        });

        // initial adapter status and paired listing
        let _ = command_tx.send(BluetoothCommand::CheckStatus);
        let _ = command_tx.send(BluetoothCommand::RefreshPaired);

        Self {
            settings,
            command_tx,
            event_rx,
            adapter_status: AdapterStatus::Unknown,
            status_message: None,
            paired_devices: Vec::new(),
            discovered_devices: Vec::new(),
            selected_device: None,
            is_scanning: false,
            scan_progress: None,
            selected_tab: Tab::Scan,
            is_dark_mode: false,
            _logging_guard: logging_guard,
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AdapterStatus(status) => self.adapter_status = status,
            AppEvent::ScanProgress { elapsed, total } => {
                self.is_scanning = true;
                self.scan_progress = Some((elapsed, total));
            }
            AppEvent::DeviceDiscovered(device) => self.upsert_discovered(device),
            AppEvent::ScanFinished(devices) => {
                self.is_scanning = false;
                self.scan_progress = None;
                self.status_message = Some(StatusMessage {
                    message: format!("Scan complete: {} device(s) found", devices.len()),
                    severity: MessageSeverity::Success,
                });
                self.discovered_devices = devices;
            }
            AppEvent::ScanFailed(e) => {
                self.is_scanning = false;
                self.scan_progress = None;
                self.status_message = Some(StatusMessage {
                    message: format!("Scan failed: {}", e),
                    severity: MessageSeverity::Error,
                });
            }
            AppEvent::PairedDevices(devices) => self.paired_devices = devices,
            AppEvent::KnownDevices(devices) => self.discovered_devices = devices,
            AppEvent::DeviceInfo(device) => self.apply_device_info(device),
            AppEvent::LogMessage(msg) => self.status_message = Some(msg),
        }
    }

    fn upsert_discovered(&mut self, device: BluetoothDevice) {
        if let Some(existing) = self
            .discovered_devices
            .iter_mut()
            .find(|d| d.address == device.address)
        {
            *existing = device;
        } else {
            self.discovered_devices.push(device);
        }
    }

    /// A fresh record replaces every stale copy of the same device.
    fn apply_device_info(&mut self, device: BluetoothDevice) {
        for list in [&mut self.discovered_devices, &mut self.paired_devices] {
            if let Some(existing) = list.iter_mut().find(|d| d.address == device.address) {
                *existing = device.clone();
            }
        }
        if self
            .selected_device
            .as_ref()
            .is_some_and(|d| d.address == device.address)
        {
            self.selected_device = Some(device);
        }
    }
}

impl eframe::App for BtDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }

        ctx.request_repaint();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label(egui::RichText::new("btdesk").strong().size(18.0));
                ui.separator();
                ui.selectable_value(&mut self.selected_tab, Tab::Scan, "Scan");
                ui.selectable_value(&mut self.selected_tab, Tab::Devices, "Devices");
                ui.selectable_value(&mut self.selected_tab, Tab::Settings, "Settings");

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_icon = if self.is_dark_mode {
                        "☀ Light"
                    } else {
                        "🌙 Dark"
                    };
                    if ui.button(switch_icon).clicked() {
                        self.is_dark_mode = !self.is_dark_mode;
                        crate::presentation::theme::configure_style(ctx, self.is_dark_mode);
                    }

                    let (label, color) = match self.adapter_status {
                        AdapterStatus::Enabled => {
                            ("Adapter: on", egui::Color32::from_rgb(0, 160, 60))
                        }
                        AdapterStatus::Disabled => {
                            ("Adapter: off", egui::Color32::from_rgb(200, 60, 60))
                        }
                        AdapterStatus::Unknown => ("Adapter: ?", egui::Color32::from_gray(130)),
                    };
                    ui.label(egui::RichText::new(label).color(color).strong());
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.set_max_width(820.0);
                    ui.add_space(16.0);

                    use crate::presentation::tabs;
                    match self.selected_tab {
                        Tab::Scan => tabs::scan::render(self, ui),
                        Tab::Devices => tabs::devices::render(self, ui),
                        Tab::Settings => tabs::settings::render(self, ui),
                    }

                    ui.add_space(40.0);
                });
            });
        });
    }
}

async fn handle_command(
    service: &mut BluetoothService,
    events: &mpsc::UnboundedSender<AppEvent>,
    cmd: BluetoothCommand,
) {
    match cmd {
        BluetoothCommand::CheckStatus => match service.check_status().await {
            Ok(status) => {
                let _ = events.send(AppEvent::AdapterStatus(status));
            }
            Err(e) => {
                error!("status check failed: {}", e);
                let _ = events.send(AppEvent::AdapterStatus(AdapterStatus::Unknown));
                send_error(events, format!("Status check failed: {}", e));
            }
        },
        BluetoothCommand::SetPower(on) => match service.set_power(on).await {
            Ok(()) => {
                let message = if on {
                    "Bluetooth enabled"
                } else {
                    "Bluetooth disabled"
                };
                let _ = events.send(AppEvent::LogMessage(StatusMessage {
                    message: message.to_string(),
                    severity: MessageSeverity::Success,
                }));
                if let Ok(status) = service.check_status().await {
                    let _ = events.send(AppEvent::AdapterStatus(status));
                }
            }
            Err(e) => send_error(events, format!("Power change failed: {}", e)),
        },
        BluetoothCommand::StartScan => service.start_scan(),
        BluetoothCommand::CancelScan => service.cancel_scan(),
        BluetoothCommand::RefreshPaired => match service.paired_devices().await {
            Ok(devices) => {
                let _ = events.send(AppEvent::PairedDevices(devices));
            }
            Err(e) => send_error(events, format!("Could not list paired devices: {}", e)),
        },
        BluetoothCommand::RefreshKnown => match service.known_devices().await {
            Ok(devices) => {
                let _ = events.send(AppEvent::KnownDevices(devices));
            }
            Err(e) => send_error(events, format!("Could not list known devices: {}", e)),
        },
        BluetoothCommand::FetchInfo(address) => match service.device_info(&address).await {
            Ok(device) => {
                let _ = events.send(AppEvent::DeviceInfo(device));
            }
            Err(e) => send_error(events, format!("Could not read {}: {}", address, e)),
        },
        BluetoothCommand::Device { action, address } => {
            match service.device_command(action, &address).await {
                Ok(()) => {
                    let _ = events.send(AppEvent::LogMessage(StatusMessage {
                        message: format!("{} {}", action.past_tense(), address),
                        severity: MessageSeverity::Success,
                    }));
                    // the paired set and the device record both changed
                    if let Ok(devices) = service.paired_devices().await {
                        let _ = events.send(AppEvent::PairedDevices(devices));
                    }
                    if action != DeviceAction::Remove {
                        if let Ok(device) = service.device_info(&address).await {
                            let _ = events.send(AppEvent::DeviceInfo(device));
                        }
                    }
                }
                Err(e) => {
                    error!("{:?} failed for {}: {}", action, address, e);
                    send_error(events, format!("{:?} failed for {}: {}", action, address, e));
                }
            }
        }
    }
}

fn send_error(events: &mpsc::UnboundedSender<AppEvent>, message: String) {
    let _ = events.send(AppEvent::LogMessage(StatusMessage {
        message,
        severity: MessageSeverity::Error,
    }));
}
