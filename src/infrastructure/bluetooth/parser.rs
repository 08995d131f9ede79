//! Pure parsers for the textual output of `bluetoothctl` and `rfkill`.
//!
//! Everything in here is stateless; cross-line state (dedup, buffering)
//! belongs to the scanner.

use crate::domain::models::{AdapterStatus, BluetoothDevice, BluetoothError};

/// A `[NEW]`/`[CHG]` device announcement from interactive scan output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub address: String,
    pub name: Option<String>,
}

/// Remove ANSI escape sequences. Interactive `bluetoothctl` colors its
/// prompt and announcement tags.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            // CSI sequence, parameters end at a byte in @..=~
            chars.next();
            for t in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&t) {
                    break;
                }
            }
        } else {
            // two-character escape
            chars.next();
        }
    }
    out
}

/// Six colon-separated two-digit hex groups.
pub fn is_mac_address(s: &str) -> bool {
    let mut groups = 0;
    for group in s.split(':') {
        if group.len() != 2 || !group.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        groups += 1;
    }
    groups == 6
}

/// Recognize a device announcement anywhere in one line of interactive
/// output: a `[NEW]` or `[CHG]` tag (case-insensitive), the literal word
/// `Device`, a MAC address, and an optional free-text name. Lines of any
/// other shape yield `None`.
pub fn parse_announcement(line: &str) -> Option<Announcement> {
    let clean = strip_ansi(line);

    for (start, _) in clean.match_indices('[') {
        let rest = &clean[start + 1..];
        let end = rest.find(']')?;
        let tag = &rest[..end];
        if !tag.eq_ignore_ascii_case("NEW") && !tag.eq_ignore_ascii_case("CHG") {
            continue;
        }

        let after = rest[end + 1..].trim_start();
        let Some(after) = after.strip_prefix("Device") else {
            continue;
        };
        if !after.starts_with(char::is_whitespace) {
            continue;
        }

        let after = after.trim_start();
        let (address, tail) = match after.split_once(char::is_whitespace) {
            Some((a, t)) => (a, t.trim()),
            None => (after.trim_end(), ""),
        };
        if !is_mac_address(address) {
            continue;
        }

        return Some(Announcement {
            address: address.to_ascii_uppercase(),
            name: (!tail.is_empty()).then(|| tail.to_string()),
        });
    }

    None
}

/// Build a device record from the key/value block `bluetoothctl info`
/// prints. Missing fields keep their defaults; this never fails, garbage
/// input just yields an all-default record.
pub fn parse_device_info(address: &str, raw: &str) -> BluetoothDevice {
    let mut name = None;
    let mut paired = false;
    let mut connected = false;
    let mut trusted = false;
    let mut rssi = None;
    let mut icon = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Name:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                name = Some(rest.to_string());
            }
        } else if let Some(rest) = trimmed.strip_prefix("Paired:") {
            paired = rest.contains("yes");
        } else if let Some(rest) = trimmed.strip_prefix("Connected:") {
            connected = rest.contains("yes");
        } else if let Some(rest) = trimmed.strip_prefix("Trusted:") {
            trusted = rest.contains("yes");
        } else if let Some(rest) = trimmed.strip_prefix("RSSI:") {
            rssi = first_integer(rest);
        } else if let Some(rest) = trimmed.strip_prefix("Icon:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                icon = Some(rest.to_string());
            }
        }
    }

    BluetoothDevice {
        address: address.to_string(),
        name,
        paired,
        connected,
        trusted,
        rssi,
        icon,
    }
}

/// First signed integer substring, if any.
fn first_integer(text: &str) -> Option<i16> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let signed = bytes[i] == b'-' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit());
        if signed || bytes[i].is_ascii_digit() {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            return text[start..i].parse().ok();
        }
        i += 1;
    }
    None
}

/// Determine the adapter power state from `bluetoothctl show` output.
pub fn parse_adapter_status(output: &str) -> Result<AdapterStatus, BluetoothError> {
    if output.contains("Powered: yes") {
        Ok(AdapterStatus::Enabled)
    } else if output.contains("Powered: no") {
        Ok(AdapterStatus::Disabled)
    } else {
        Err(BluetoothError::Parse(
            "could not find adapter power state in bluetoothctl output".to_string(),
        ))
    }
}

/// Determine the adapter power state from `rfkill list bluetooth` output.
/// Either block flag set means disabled.
pub fn parse_rfkill_status(output: &str) -> Result<AdapterStatus, BluetoothError> {
    if output.contains("Soft blocked: yes") || output.contains("Hard blocked: yes") {
        Ok(AdapterStatus::Disabled)
    } else if output.contains("Soft blocked: no") || output.contains("Hard blocked: no") {
        Ok(AdapterStatus::Enabled)
    } else {
        Err(BluetoothError::Parse(
            "could not find block state in rfkill output".to_string(),
        ))
    }
}

/// Extract device addresses from a `Device <address> <name>` listing.
pub fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device")?.trim_start();
            let address = rest.split_whitespace().next()?;
            is_mac_address(address).then(|| address.to_ascii_uppercase())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_removes_color_codes() {
        let line = "\u{1b}[0;92m[NEW]\u{1b}[0m Device AA:BB:CC:DD:EE:FF Headphones";
        assert_eq!(strip_ansi(line), "[NEW] Device AA:BB:CC:DD:EE:FF Headphones");
    }

    #[test]
    fn test_announcement_new_with_name() {
        let found = parse_announcement("[NEW] Device AA:BB:CC:DD:EE:FF My Speaker").unwrap();
        assert_eq!(found.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(found.name.as_deref(), Some("My Speaker"));
    }

    #[test]
    fn test_announcement_chg_without_name() {
        let found = parse_announcement("[CHG] Device 00:11:22:33:44:55").unwrap();
        assert_eq!(found.address, "00:11:22:33:44:55");
        assert_eq!(found.name, None);
    }

    #[test]
    fn test_announcement_tag_is_case_insensitive() {
        assert!(parse_announcement("[new] Device AA:BB:CC:DD:EE:FF").is_some());
        assert!(parse_announcement("[Chg] Device AA:BB:CC:DD:EE:FF").is_some());
    }

    #[test]
    fn test_announcement_address_is_uppercased() {
        let found = parse_announcement("[NEW] Device aa:bb:cc:dd:ee:ff lowercase").unwrap();
        assert_eq!(found.address, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_announcement_survives_prompt_prefix() {
        let line = "\u{1b}[0;94m[bluetooth]\u{1b}[0m# [NEW] Device AA:BB:CC:DD:EE:FF Buds";
        let found = parse_announcement(line).unwrap();
        assert_eq!(found.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(found.name.as_deref(), Some("Buds"));
    }

    #[test]
    fn test_announcement_rejects_other_lines() {
        assert!(parse_announcement("Discovery started").is_none());
        assert!(parse_announcement("[DEL] Device AA:BB:CC:DD:EE:FF Gone").is_none());
        assert!(parse_announcement("[NEW] Device not-a-mac Something").is_none());
        assert!(parse_announcement("[NEW] Controller AA:BB:CC:DD:EE:FF hci0").is_none());
        assert!(parse_announcement("").is_none());
    }

    #[test]
    fn test_mac_address_shapes() {
        assert!(is_mac_address("AA:BB:CC:DD:EE:FF"));
        assert!(is_mac_address("aa:bb:cc:dd:ee:ff"));
        assert!(!is_mac_address("AA:BB:CC:DD:EE"));
        assert!(!is_mac_address("AA:BB:CC:DD:EE:FF:00"));
        assert!(!is_mac_address("AA:BB:CC:DD:EE:GG"));
        assert!(!is_mac_address("AABBCCDDEEFF"));
    }

    #[test]
    fn test_device_info_full_block() {
        let raw = "Device AA:BB:CC:DD:EE:FF (public)\n\
                   \tName: Pixel Buds\n\
                   \tIcon: audio-headset\n\
                   \tPaired: yes\n\
                   \tTrusted: no\n\
                   \tConnected: yes\n\
                   \tRSSI: -67\n";
        let device = parse_device_info("AA:BB:CC:DD:EE:FF", raw);
        assert_eq!(device.name.as_deref(), Some("Pixel Buds"));
        assert_eq!(device.icon.as_deref(), Some("audio-headset"));
        assert!(device.paired);
        assert!(!device.trusted);
        assert!(device.connected);
        assert_eq!(device.rssi, Some(-67));
    }

    #[test]
    fn test_device_info_defaults_for_garbage() {
        let device = parse_device_info("AA:BB:CC:DD:EE:FF", "no usable fields here\n");
        assert_eq!(device.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(device.name, None);
        assert!(!device.paired);
        assert!(!device.connected);
        assert!(!device.trusted);
        assert_eq!(device.rssi, None);
        assert_eq!(device.icon, None);
    }

    #[test]
    fn test_rssi_takes_first_integer() {
        assert_eq!(first_integer(" -42"), Some(-42));
        assert_eq!(first_integer(" 0x0050 (80)"), Some(0));
        assert_eq!(first_integer(" none"), None);
    }

    #[test]
    fn test_adapter_status_powered_yes() {
        let out = "Controller AA:BB:CC:DD:EE:FF (public)\n\tPowered: yes\n";
        assert_eq!(parse_adapter_status(out).unwrap(), AdapterStatus::Enabled);
    }

    #[test]
    fn test_adapter_status_powered_no() {
        assert_eq!(
            parse_adapter_status("\tPowered: no\n").unwrap(),
            AdapterStatus::Disabled
        );
    }

    #[test]
    fn test_adapter_status_missing_marker_is_parse_error() {
        assert!(matches!(
            parse_adapter_status("No default controller available\n"),
            Err(BluetoothError::Parse(_))
        ));
    }

    #[test]
    fn test_rfkill_soft_blocked_means_disabled() {
        let out = "0: hci0: Bluetooth\n\tSoft blocked: yes\n\tHard blocked: no\n";
        assert_eq!(parse_rfkill_status(out).unwrap(), AdapterStatus::Disabled);
    }

    #[test]
    fn test_rfkill_unblocked_means_enabled() {
        let out = "0: hci0: Bluetooth\n\tSoft blocked: no\n\tHard blocked: no\n";
        assert_eq!(parse_rfkill_status(out).unwrap(), AdapterStatus::Enabled);
    }

    #[test]
    fn test_rfkill_garbage_is_parse_error() {
        assert!(matches!(
            parse_rfkill_status(""),
            Err(BluetoothError::Parse(_))
        ));
    }

    #[test]
    fn test_device_list_extracts_addresses() {
        let out = "Device AA:BB:CC:DD:EE:01 Keyboard\n\
                   Device aa:bb:cc:dd:ee:02 Mouse with spaces\n\
                   not a device line\n";
        assert_eq!(
            parse_device_list(out),
            vec!["AA:BB:CC:DD:EE:01", "AA:BB:CC:DD:EE:02"]
        );
    }
}
