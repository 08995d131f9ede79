use std::time::Duration;
use thiserror::Error;

/// A Bluetooth device as reported by the adapter tool.
///
/// The address is the primary key, normalized to uppercase colon-separated
/// hex. Records are immutable values; refreshing a device produces a new
/// record rather than mutating the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothDevice {
    pub address: String,
    pub name: Option<String>,
    pub paired: bool,
    pub connected: bool,
    pub trusted: bool,
    pub rssi: Option<i16>,
    pub icon: Option<String>,
}

impl BluetoothDevice {
    /// Name for display, falling back to the address for nameless devices.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// Power state of the local Bluetooth adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStatus {
    Enabled,
    Disabled,
    /// Not queried yet. Status parsing never yields this.
    Unknown,
}

/// Failures from invoking or interpreting the external adapter tools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BluetoothError {
    #[error("command not found: {command}")]
    CommandNotFound { command: String },
    #[error("command failed: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Unknown(String),
}

/// A device-level operation forwarded verbatim to the adapter tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Connect,
    Disconnect,
    Pair,
    Trust,
    Remove,
}

impl DeviceAction {
    /// Past-tense label for status messages.
    pub fn past_tense(&self) -> &'static str {
        match self {
            DeviceAction::Connect => "Connected",
            DeviceAction::Disconnect => "Disconnected",
            DeviceAction::Pair => "Paired",
            DeviceAction::Trust => "Trusted",
            DeviceAction::Remove => "Removed",
        }
    }
}

/// Commands sent from the UI thread to the Bluetooth service task.
#[derive(Debug, Clone)]
pub enum BluetoothCommand {
    CheckStatus,
    SetPower(bool),
    StartScan,
    CancelScan,
    RefreshPaired,
    RefreshKnown,
    FetchInfo(String),
    Device {
        action: DeviceAction,
        address: String,
    },
}

/// Events flowing back from the Bluetooth service to the UI.
#[derive(Debug, Clone)]
pub enum AppEvent {
    AdapterStatus(AdapterStatus),
    ScanProgress { elapsed: Duration, total: Duration },
    DeviceDiscovered(BluetoothDevice),
    ScanFinished(Vec<BluetoothDevice>),
    ScanFailed(BluetoothError),
    PairedDevices(Vec<BluetoothDevice>),
    KnownDevices(Vec<BluetoothDevice>),
    DeviceInfo(BluetoothDevice),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Scan,
    Devices,
    Settings,
}
