//! Controller process management and crash cleanup.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use talond_common::config::Config;
use talond_common::consts::AUX_DAEMON;

use crate::error::TalondError;

/// How long the profile sub-shell may take before it is killed.
const PROFILE_ENV_TIMEOUT: Duration = Duration::from_secs(5);

/// Capture the environment exported by a shell profile file.
///
/// Runs `sh -c '. <file> && env'` and parses the KEY=VALUE output. Any
/// failure (including a missing file or a timed-out shell) yields an empty
/// map so the controller can still be started.
pub fn capture_profile_env(profile: &Path) -> HashMap<String, String> {
    match run_env_subshell(profile, PROFILE_ENV_TIMEOUT) {
        Ok(env) => env,
        Err(error) => {
            warn!(profile = %profile.display(), %error, "profile environment capture failed");
            HashMap::new()
        }
    }
}

fn run_env_subshell(
    profile: &Path,
    timeout: Duration,
) -> std::io::Result<HashMap<String, String>> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(format!(". {} && env", profile.display()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait()? {
            Some(status) if status.success() => break,
            Some(status) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("sub-shell exited with {status}"),
                ));
            }
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "sub-shell timed out",
                ));
            }
            None => std::thread::sleep(Duration::from_millis(20)),
        }
    }

    let mut output = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_string(&mut output)?;
    }

    let mut env = HashMap::new();
    for line in output.lines() {
        if let Some((key, value)) = line.split_once('=') {
            env.insert(key.to_string(), value.to_string());
        }
    }
    Ok(env)
}

/// Start the low-level controller, fire-and-forget.
///
/// The child runs under a clean environment holding only what the profile
/// file exported. The daemon never waits on it; the telemetry poller decides
/// whether the spawn took by watching shared memory.
pub fn spawn_controller(config: &Config, env: &HashMap<String, String>) -> Result<(), TalondError> {
    let mut command = Command::new(&config.controller_command[0]);
    command.args(&config.controller_command[1..]);
    if config.virtual_hardware {
        command.arg("-v");
    }
    command
        .env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    command.spawn().map_err(TalondError::Spawn)?;
    info!(command = ?config.controller_command, simulated = config.virtual_hardware, "controller spawned");
    Ok(())
}

/// Best-effort kill of the auxiliary controller daemons.
pub fn kill_aux_processes() {
    let result = Command::new("killall")
        .arg(AUX_DAEMON)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match result {
        Ok(status) if status.success() => info!("auxiliary daemons killed"),
        Ok(_) => debug!("no auxiliary daemons running"),
        Err(error) => debug!(%error, "killall unavailable"),
    }
}

/// Remove every file under the communication directory.
///
/// Stale pipe files from a crashed controller would otherwise wedge the
/// next startup. Idempotent: missing directory or files are fine.
pub fn cleanup_comm_dir(dir: &Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        if let Err(error) = std::fs::remove_file(entry.path()) {
            debug!(path = %entry.path().display(), %error, "comm file removal failed");
        }
    }
}
