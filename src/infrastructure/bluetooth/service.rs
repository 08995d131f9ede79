//! Bluetooth Service Module
//!
//! Main service that coordinates the one-shot adapter operations and the
//! interactive discovery session, reporting everything to the UI as
//! [`AppEvent`]s.

use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::models::{
    AdapterStatus, AppEvent, BluetoothDevice, BluetoothError, DeviceAction, MessageSeverity,
    StatusMessage,
};
use crate::domain::settings::{Settings, SettingsService};
use crate::infrastructure::bluetooth::command::run_command;
use crate::infrastructure::bluetooth::parser;
use crate::infrastructure::bluetooth::scanner::{self, SessionConfig};

/// Main coordinator for all adapter operations.
pub struct BluetoothService {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    settings: Arc<Mutex<SettingsService>>,
    scan_task: Option<JoinHandle<()>>,
    cancel_scan: Option<oneshot::Sender<()>>,
}

impl BluetoothService {
    pub fn new(
        event_sender: mpsc::UnboundedSender<AppEvent>,
        settings: Arc<Mutex<SettingsService>>,
    ) -> Self {
        Self {
            event_sender,
            settings,
            scan_task: None,
            cancel_scan: None,
        }
    }

    fn settings_snapshot(&self) -> Result<Settings, BluetoothError> {
        let guard = self
            .settings
            .lock()
            .map_err(|_| BluetoothError::Unknown("settings lock poisoned".to_string()))?;
        Ok(guard.get().clone())
    }

    /// Adapter power state, with `rfkill` as the fallback source when
    /// `bluetoothctl` is missing or failing.
    pub async fn check_status(&self) -> Result<AdapterStatus, BluetoothError> {
        let settings = self.settings_snapshot()?;
        query_adapter_status(&settings.tools.bluetoothctl, &settings.tools.rfkill).await
    }

    pub async fn set_power(&self, on: bool) -> Result<(), BluetoothError> {
        let settings = self.settings_snapshot()?;
        let arg = if on { "on" } else { "off" };
        run_command(&settings.tools.bluetoothctl, &["power", arg]).await?;
        info!("adapter power turned {}", arg);
        Ok(())
    }

    pub async fn device_info(&self, address: &str) -> Result<BluetoothDevice, BluetoothError> {
        let settings = self.settings_snapshot()?;
        fetch_device_info(&settings.tools.bluetoothctl, address).await
    }

    pub async fn paired_devices(&self) -> Result<Vec<BluetoothDevice>, BluetoothError> {
        let settings = self.settings_snapshot()?;
        fetch_device_listing(&settings.tools.bluetoothctl, &["devices", "Paired"]).await
    }

    /// Every device the adapter currently knows, paired or not.
    pub async fn known_devices(&self) -> Result<Vec<BluetoothDevice>, BluetoothError> {
        let settings = self.settings_snapshot()?;
        fetch_device_listing(&settings.tools.bluetoothctl, &["devices"]).await
    }

    /// Forward a device-level operation (connect, pair, ...) to the tool.
    pub async fn device_command(
        &self,
        action: DeviceAction,
        address: &str,
    ) -> Result<(), BluetoothError> {
        let settings = self.settings_snapshot()?;
        run_command(&settings.tools.bluetoothctl, &[action_verb(action), address]).await?;
        info!("{} {}", action_verb(action), address);
        Ok(())
    }

    /// Spawn a discovery session task. Progress, discoveries, and the
    /// final outcome arrive as events; only one session runs at a time.
    pub fn start_scan(&mut self) {
        if self.scan_task.as_ref().is_some_and(|task| !task.is_finished()) {
            warn!("scan requested while one is already running");
            let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
                message: "A scan is already running".to_string(),
                severity: MessageSeverity::Warning,
            }));
            return;
        }

        let settings = match self.settings_snapshot() {
            Ok(settings) => settings,
            Err(e) => {
                let _ = self.event_sender.send(AppEvent::ScanFailed(e));
                return;
            }
        };
        let config = SessionConfig {
            program: settings.tools.bluetoothctl.clone(),
            duration: settings.scan.duration(),
            drain_grace: settings.scan.drain_grace(),
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel_scan = Some(cancel_tx);

        let events = self.event_sender.clone();
        let total = config.duration;
        self.scan_task = Some(tokio::spawn(async move {
            info!("starting discovery scan ({:?})", total);
            let result = scanner::run_discovery(
                &config,
                |elapsed| {
                    let _ = events.send(AppEvent::ScanProgress { elapsed, total });
                },
                |device| {
                    let _ = events.send(AppEvent::DeviceDiscovered(device.clone()));
                },
                Some(cancel_rx),
            )
            .await;

            match result {
                Ok(devices) => {
                    info!("scan finished with {} device(s)", devices.len());
                    let _ = events.send(AppEvent::ScanFinished(devices));
                }
                Err(e) => {
                    warn!("scan failed: {}", e);
                    let _ = events.send(AppEvent::ScanFailed(e));
                }
            }
        }));
    }

    /// Ask the running session, if any, to wind down early.
    pub fn cancel_scan(&mut self) {
        if let Some(cancel) = self.cancel_scan.take() {
            debug!("cancelling scan");
            let _ = cancel.send(());
        }
    }
}

fn action_verb(action: DeviceAction) -> &'static str {
    match action {
        DeviceAction::Connect => "connect",
        DeviceAction::Disconnect => "disconnect",
        DeviceAction::Pair => "pair",
        DeviceAction::Trust => "trust",
        DeviceAction::Remove => "remove",
    }
}

/// `bluetoothctl show`, falling back to `rfkill list bluetooth` when the
/// primary tool is missing or exits non-zero. A parse failure of the
/// primary output is surfaced as-is, not papered over by the fallback.
pub(crate) async fn query_adapter_status(
    bluetoothctl: &str,
    rfkill: &str,
) -> Result<AdapterStatus, BluetoothError> {
    match run_command(bluetoothctl, &["show"]).await {
        Ok(output) => parser::parse_adapter_status(&output),
        Err(BluetoothError::CommandNotFound { .. }) | Err(BluetoothError::CommandFailed { .. }) => {
            debug!("bluetoothctl unavailable, falling back to rfkill");
            let output = run_command(rfkill, &["list", "bluetooth"]).await?;
            parser::parse_rfkill_status(&output)
        }
        Err(e) => Err(e),
    }
}

pub(crate) async fn fetch_device_info(
    program: &str,
    address: &str,
) -> Result<BluetoothDevice, BluetoothError> {
    let output = run_command(program, &["info", address]).await?;
    Ok(parser::parse_device_info(address, &output))
}

/// Enumerate a `Device <addr> <name>` listing and enrich every address
/// with a detail lookup. An address whose lookup fails is skipped.
pub(crate) async fn fetch_device_listing(
    program: &str,
    args: &[&str],
) -> Result<Vec<BluetoothDevice>, BluetoothError> {
    let output = run_command(program, args).await?;
    let mut devices = Vec::new();
    for address in parser::parse_device_list(&output) {
        match fetch_device_info(program, &address).await {
            Ok(device) => devices.push(device),
            Err(e) => warn!("skipping {}: detail lookup failed: {}", address, e),
        }
    }
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn script(dir: &TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_status_from_bluetoothctl() {
        let dir = TempDir::new().unwrap();
        let ctl = script(&dir, "ctl", "printf 'Controller X\\n\\tPowered: yes\\n'");
        let rfk = script(&dir, "rfk", "echo should-not-run >&2; exit 9");

        let status = query_adapter_status(&ctl, &rfk).await.unwrap();
        assert_eq!(status, AdapterStatus::Enabled);
    }

    #[tokio::test]
    async fn test_missing_bluetoothctl_falls_back_to_rfkill() {
        let dir = TempDir::new().unwrap();
        let rfk = script(
            &dir,
            "rfk",
            "printf '0: hci0: Bluetooth\\n\\tSoft blocked: yes\\n\\tHard blocked: no\\n'",
        );

        let status = query_adapter_status("/nonexistent/bluetoothctl", &rfk)
            .await
            .unwrap();
        assert_eq!(status, AdapterStatus::Disabled);
    }

    #[tokio::test]
    async fn test_failing_bluetoothctl_falls_back_to_rfkill() {
        let dir = TempDir::new().unwrap();
        let ctl = script(&dir, "ctl", "exit 1");
        let rfk = script(
            &dir,
            "rfk",
            "printf '0: hci0: Bluetooth\\n\\tSoft blocked: no\\n\\tHard blocked: no\\n'",
        );

        let status = query_adapter_status(&ctl, &rfk).await.unwrap();
        assert_eq!(status, AdapterStatus::Enabled);
    }

    #[tokio::test]
    async fn test_unparseable_status_does_not_fall_back() {
        let dir = TempDir::new().unwrap();
        let ctl = script(&dir, "ctl", "echo 'No default controller available'");
        let rfk = script(&dir, "rfk", "printf '\\tSoft blocked: no\\n'");

        let err = query_adapter_status(&ctl, &rfk).await.unwrap_err();
        assert!(matches!(err, BluetoothError::Parse(_)));
    }

    #[tokio::test]
    async fn test_listing_enriches_and_skips_failures() {
        let dir = TempDir::new().unwrap();
        let ctl = script(
            &dir,
            "ctl",
            r#"if [ "$1" = "devices" ]; then
    printf 'Device AA:BB:CC:DD:EE:01 Keyboard\n'
    printf 'Device AA:BB:CC:DD:EE:02 Mouse\n'
    exit 0
fi
case "$2" in
    *:02) exit 1 ;;
esac
printf '\tName: Keyboard\n\tPaired: yes\n\tConnected: yes\n\tTrusted: yes\n'
"#,
        );

        let devices = fetch_device_listing(&ctl, &["devices", "Paired"]).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].address, "AA:BB:CC:DD:EE:01");
        assert_eq!(devices[0].name.as_deref(), Some("Keyboard"));
        assert!(devices[0].paired);
    }
}
