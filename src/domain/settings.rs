use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: default_true(),
            file_logging_enabled: default_false(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "btdesk".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Tuning for the interactive discovery session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// How long one scan runs, in milliseconds.
    #[serde(default = "default_scan_duration_ms")]
    pub duration_ms: u64,
    /// How long to wait for the scanner process to exit gracefully after
    /// the stop commands, before it is killed.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            duration_ms: default_scan_duration_ms(),
            drain_grace_ms: default_drain_grace_ms(),
        }
    }
}

impl ScanSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

fn default_scan_duration_ms() -> u64 {
    10_000
}
fn default_drain_grace_ms() -> u64 {
    500
}

/// Paths of the external tools everything is delegated to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_bluetoothctl")]
    pub bluetoothctl: String,
    #[serde(default = "default_rfkill")]
    pub rfkill: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            bluetoothctl: default_bluetoothctl(),
            rfkill: default_rfkill(),
        }
    }
}

fn default_bluetoothctl() -> String {
    "bluetoothctl".to_string()
}
fn default_rfkill() -> String {
    "rfkill".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub log_settings: LogSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("btdesk");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
