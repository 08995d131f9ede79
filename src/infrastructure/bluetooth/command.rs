//! One-shot execution of the external adapter tools.

use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::domain::models::BluetoothError;

/// Run an external command to completion and capture its stdout.
///
/// Exit code 0 is the only success; a non-zero exit yields `CommandFailed`
/// carrying the code and whatever the tool wrote to stderr. A missing
/// executable yields `CommandNotFound`. The caller decides whether to retry.
pub async fn run_command(program: &str, args: &[&str]) -> Result<String, BluetoothError> {
    debug!("running {} {:?}", program, args);

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| spawn_error(program, e))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let code = output.status.code();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stderr = if stderr.is_empty() {
        match code {
            Some(c) => format!("command failed with exit code {}", c),
            None => "command terminated by signal".to_string(),
        }
    } else {
        stderr
    };

    Err(BluetoothError::CommandFailed { code, stderr })
}

/// Map a launch failure onto the error taxonomy.
pub(crate) fn spawn_error(program: &str, err: io::Error) -> BluetoothError {
    if err.kind() == io::ErrorKind::NotFound {
        BluetoothError::CommandNotFound {
            command: program.to_string(),
        }
    } else {
        BluetoothError::Unknown(err.to_string())
    }
}
