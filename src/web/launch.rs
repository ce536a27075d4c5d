//! Background job launching and liveness checks.

use std::path::Path;

use anyhow::{Context, Result};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tokio::process::Command;
use tracing::{info, warn};

/// Whether `pid` names a live, non-zombie process.
pub fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system
        .process(pid)
        .is_some_and(|p| p.status() != ProcessStatus::Zombie)
}

/// Start `exe run --hash <hash> --path <style>` and return its pid.
///
/// The child is reaped in the background so finished jobs do not linger as
/// zombies.
pub fn spawn_job(exe: &Path, hash: &str, style_path: &str) -> Result<u32> {
    let mut child = Command::new(exe)
        .args(["run", "--hash", hash, "--path", style_path])
        .kill_on_drop(false)
        .spawn()
        .with_context(|| format!("spawn job process {exe:?}"))?;
    let pid = child
        .id()
        .context("job process exited before its pid was read")?;
    info!(pid, %hash, "job launched");

    let hash = hash.to_string();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => info!(pid, %hash, %status, "job process exited"),
            Err(err) => warn!(pid, %hash, error = %err, "could not wait for job process"),
        }
    });
    Ok(pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(process_alive(std::process::id()));
    }
}
