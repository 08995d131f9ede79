//! Interactive discovery session.
//!
//! Drives one long-lived `bluetoothctl` process through a
//! start/observe/stop protocol: stream its stdout, pick device
//! announcements out of the stream, enrich each new address with a detail
//! lookup, and shut the process down when the time budget elapses or the
//! caller cancels.

use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::time::{interval, sleep, timeout, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::domain::models::{BluetoothDevice, BluetoothError};
use crate::infrastructure::bluetooth::command::{run_command, spawn_error};
use crate::infrastructure::bluetooth::parser;

/// How often scan progress is reported.
const PROGRESS_TICK: Duration = Duration::from_millis(100);

/// Tuning for one discovery session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path of the adapter tool, spawned interactively and re-invoked
    /// one-shot for detail lookups.
    pub program: String,
    /// Scan time budget.
    pub duration: Duration,
    /// Bounded wait for the process to exit after the stop commands.
    pub drain_grace: Duration,
}

/// Run one discovery session to completion.
///
/// `on_progress` is invoked roughly every 100 ms with the elapsed time
/// clamped to the budget; values never decrease. `on_device` is invoked
/// exactly once per distinct discovered address, in discovery order, after
/// the address was enriched with a successful detail lookup. A lookup
/// failure drops that address only, never the session. Firing `cancel`
/// ends the session early; without a cancel channel only the budget ends
/// it.
///
/// The only fatal error is failing to spawn the tool; in that case no
/// child process, timer, or read state is left behind.
pub async fn run_discovery(
    config: &SessionConfig,
    mut on_progress: impl FnMut(Duration),
    mut on_device: impl FnMut(&BluetoothDevice),
    cancel: Option<oneshot::Receiver<()>>,
) -> Result<Vec<BluetoothDevice>, BluetoothError> {
    let mut child = Command::new(&config.program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(&config.program, e))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| BluetoothError::Unknown("scanner stdin was not captured".to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| BluetoothError::Unknown("scanner stdout was not captured".to_string()))?;

    debug!("discovery session started ({:?})", config.duration);
    if let Err(e) = stdin.write_all(b"scan on\n").await {
        // broken pipe surfaces as EOF in the read loop below
        warn!("could not start discovery: {}", e);
    }

    let mut devices: Vec<BluetoothDevice> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending = String::new();
    let mut chunk = [0u8; 4096];

    let started = Instant::now();
    let deadline = sleep(config.duration);
    tokio::pin!(deadline);

    let mut ticker = interval(PROGRESS_TICK);
    // detail lookups may stall the loop past a tick
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // A missing cancel channel (or a sender dropped without firing) must
    // never end the session, so both become a future that never resolves.
    let cancelled = async {
        match cancel {
            Some(rx) => {
                if rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(cancelled);

    loop {
        tokio::select! {
            read = stdout.read(&mut chunk) => match read {
                Ok(0) => {
                    debug!("scanner output ended early");
                    break;
                }
                Ok(n) => {
                    pending.push_str(&String::from_utf8_lossy(&chunk[..n]));
                    while let Some(pos) = pending.find('\n') {
                        let line: String = pending.drain(..=pos).collect();
                        let line = line.trim_end_matches(['\r', '\n']);
                        let Some(found) = parser::parse_announcement(line) else {
                            continue;
                        };
                        if !seen.insert(found.address.clone()) {
                            continue;
                        }
                        debug!("discovered {}", found.address);
                        match lookup_device(&config.program, &found.address).await {
                            Ok(device) => {
                                on_device(&device);
                                devices.push(device);
                            }
                            Err(e) => {
                                warn!("dropping {}: detail lookup failed: {}", found.address, e);
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("scanner read failed: {}", e);
                    break;
                }
            },
            _ = ticker.tick() => on_progress(started.elapsed().min(config.duration)),
            _ = &mut deadline => break,
            _ = &mut cancelled => {
                debug!("discovery cancelled");
                break;
            }
        }
    }

    // Draining: ask for a graceful exit. The tool may already be gone.
    if let Err(e) = stdin.write_all(b"scan off\nexit\n").await {
        debug!("stop commands not delivered: {}", e);
    }
    drop(stdin);

    let drained = timeout(config.drain_grace, async {
        let mut tail = [0u8; 1024];
        loop {
            match stdout.read(&mut tail).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    if drained.is_err() {
        debug!("drain grace elapsed before end of stream");
    }

    // Idempotent: killing an already-exited process is not an error.
    if let Err(e) = child.start_kill() {
        debug!("scanner process already gone: {}", e);
    }
    let _ = child.wait().await;

    debug!("discovery session finished with {} device(s)", devices.len());
    Ok(devices)
}

async fn lookup_device(program: &str, address: &str) -> Result<BluetoothDevice, BluetoothError> {
    let output = run_command(program, &["info", address]).await?;
    Ok(parser::parse_device_info(address, &output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Fake adapter tool: interactive mode prints canned announcement
    /// lines, `info <addr>` prints a detail block (failing for *:03).
    const FAKE_TOOL: &str = r#"#!/bin/sh
if [ "$1" = "info" ]; then
    case "$2" in
        *:03)
            echo "org.bluez.Error.Failed" >&2
            exit 1
            ;;
        *:01) NAME=Foo ;;
        *:02) NAME=Bar ;;
        *) NAME=Gadget ;;
    esac
    printf 'Device %s (public)\n' "$2"
    printf '\tName: %s\n' "$NAME"
    printf '\tPaired: no\n\tConnected: no\n\tTrusted: no\n\tRSSI: -40\n'
    exit 0
fi
ANNOUNCE="${FAKE_ANNOUNCE:-}"
printf '%s' "$ANNOUNCE"
cat >/dev/null
exit 0
"#;

    fn fake_tool(dir: &TempDir) -> String {
        let path = dir.path().join("fake-bluetoothctl");
        std::fs::write(&path, FAKE_TOOL).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn config(program: String, duration_ms: u64) -> SessionConfig {
        SessionConfig {
            program,
            duration: Duration::from_millis(duration_ms),
            drain_grace: Duration::from_millis(500),
        }
    }

    /// Wrap the canned tool in a script that emits the given announcement
    /// text before blocking on stdin.
    fn tool_with_announcements(dir: &TempDir, announcements: &str) -> String {
        let inner = fake_tool(dir);
        let path = dir.path().join("announcing-tool");
        let body = format!(
            "#!/bin/sh\nFAKE_ANNOUNCE='{}' exec {} \"$@\"\n",
            announcements, inner
        );
        std::fs::write(&path, body).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_two_devices_in_discovery_order() {
        let dir = TempDir::new().unwrap();
        let tool = tool_with_announcements(
            &dir,
            "[NEW] Device AA:AA:AA:AA:AA:01 Foo\n[NEW] Device AA:AA:AA:AA:AA:02 Bar\n",
        );

        let mut callback_order = Vec::new();
        let devices = run_discovery(
            &config(tool, 1000),
            |_| {},
            |d| callback_order.push(d.address.clone()),
            None,
        )
        .await
        .unwrap();

        let addresses: Vec<_> = devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, ["AA:AA:AA:AA:AA:01", "AA:AA:AA:AA:AA:02"]);
        assert_eq!(devices[0].name.as_deref(), Some("Foo"));
        assert_eq!(devices[1].name.as_deref(), Some("Bar"));
        assert_eq!(callback_order, ["AA:AA:AA:AA:AA:01", "AA:AA:AA:AA:AA:02"]);
    }

    #[tokio::test]
    async fn test_duplicate_announcements_reported_once() {
        let dir = TempDir::new().unwrap();
        let tool = tool_with_announcements(
            &dir,
            "[NEW] Device AA:AA:AA:AA:AA:01 Foo\n\
             [CHG] Device AA:AA:AA:AA:AA:01 RSSI: -55\n\
             [NEW] Device AA:AA:AA:AA:AA:02 Bar\n\
             [CHG] Device aa:aa:aa:aa:aa:01 Foo\n",
        );

        let mut callbacks = 0;
        let devices = run_discovery(&config(tool, 800), |_| {}, |_| callbacks += 1, None)
            .await
            .unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(callbacks, 2);
    }

    #[tokio::test]
    async fn test_failed_lookup_skips_address_only() {
        let dir = TempDir::new().unwrap();
        let tool = tool_with_announcements(
            &dir,
            "[NEW] Device AA:AA:AA:AA:AA:01 Foo\n\
             [NEW] Device AA:AA:AA:AA:AA:03 Broken\n\
             [NEW] Device AA:AA:AA:AA:AA:02 Bar\n",
        );

        let devices = run_discovery(&config(tool, 800), |_| {}, |_| {}, None)
            .await
            .unwrap();

        let addresses: Vec<_> = devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, ["AA:AA:AA:AA:AA:01", "AA:AA:AA:AA:AA:02"]);
    }

    #[tokio::test]
    async fn test_line_split_across_reads_is_reassembled() {
        let dir = TempDir::new().unwrap();
        let inner = fake_tool(&dir);
        let path = dir.path().join("split-tool");
        // emit one announcement in two chunks, broken inside the address
        let body = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = info ]; then exec {inner} \"$@\"; fi\n\
             printf '[NEW] Device AA:AA:AA:AA'\n\
             sleep 0.2\n\
             printf ':AA:02 Bar\\n'\n\
             cat >/dev/null\n"
        );
        std::fs::write(&path, body).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        let devices = run_discovery(
            &config(path.to_string_lossy().into_owned(), 1000),
            |_| {},
            |_| {},
            None,
        )
        .await
        .unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].address, "AA:AA:AA:AA:AA:02");
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_clamped() {
        let dir = TempDir::new().unwrap();
        let tool = tool_with_announcements(&dir, "");
        let duration = Duration::from_millis(400);

        let mut reports = Vec::new();
        run_discovery(
            &SessionConfig {
                program: tool,
                duration,
                drain_grace: Duration::from_millis(500),
            },
            |elapsed| reports.push(elapsed),
            |_| {},
            None,
        )
        .await
        .unwrap();

        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert!(reports.iter().all(|&p| p <= duration));
    }

    #[tokio::test]
    async fn test_cancellation_ends_session_early() {
        let dir = TempDir::new().unwrap();
        let tool = tool_with_announcements(
            &dir,
            "[NEW] Device AA:AA:AA:AA:AA:01 Foo\n[NEW] Device AA:AA:AA:AA:AA:02 Bar\n",
        );

        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = cancel_tx.send(());
        });

        let started = std::time::Instant::now();
        let devices = run_discovery(&config(tool, 30_000), |_| {}, |_| {}, Some(cancel_rx))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(devices.len(), 2);
    }

    #[tokio::test]
    async fn test_no_lookups_start_after_cancellation() {
        let dir = TempDir::new().unwrap();
        let inner = fake_tool(&dir);
        let path = dir.path().join("late-tool");
        // second announcement arrives well after the cancel fires
        let body = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = info ]; then exec {inner} \"$@\"; fi\n\
             printf '[NEW] Device AA:AA:AA:AA:AA:01 Foo\\n'\n\
             sleep 2\n\
             printf '[NEW] Device AA:AA:AA:AA:AA:02 Bar\\n'\n\
             cat >/dev/null\n"
        );
        std::fs::write(&path, body).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = cancel_tx.send(());
        });

        let devices = run_discovery(
            &config(path.to_string_lossy().into_owned(), 30_000),
            |_| {},
            |_| {},
            Some(cancel_rx),
        )
        .await
        .unwrap();

        let addresses: Vec<_> = devices.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses, ["AA:AA:AA:AA:AA:01"]);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_the_only_fatal_error() {
        let err = run_discovery(
            &config("/nonexistent/btdesk-tool".to_string(), 200),
            |_| {},
            |_| {},
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BluetoothError::CommandNotFound { .. }));
    }
}
