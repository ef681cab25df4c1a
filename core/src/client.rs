//! Client — shared daemon client with automatic lifecycle management.
//!
//! The CLI uses `execute_remote()` to send commands to the daemon. If the
//! daemon is not running, it is started automatically; if it is
//! unresponsive, it is restarted.
//!
//! The command send itself serves as the liveness check — there is no
//! separate ping or health-check protocol.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::command::Command;
use crate::types::response::Response;


/// Send a command to the icefleet daemon, starting it if necessary.
///
/// # Arguments
///
/// * `config_dir` — Path to the config directory (contains socket, PID,
///   lock files)
/// * `cmd` — The command to send
/// * `timeout_ms` — Read timeout in milliseconds for the socket response
///
/// # Errors
///
/// Returns `Err` if the daemon cannot be reached even after a restart
/// attempt.
pub fn execute_remote(
    config_dir: &Path,
    cmd: &Command,
    timeout_ms: u64,
) -> Result<Response, String> {
    // Fast path: try sending directly
    if let Ok(resp) = send_command(config_dir, cmd, timeout_ms) {
        return Ok(resp);
    }

    // Recovery path: acquire lock, ensure daemon is running, retry
    let lock_path = config_dir.join("icf.lock");
    let _lock = acquire_lock(&lock_path, 10_000)?;

    // Re-check: another process may have started the daemon while we waited
    if let Ok(resp) = send_command(config_dir, cmd, timeout_ms) {
        return Ok(resp);
    }

    // Kill stale daemon if PID file exists
    let pid_path = config_dir.join("icf.pid");
    if let Ok(pid_str) = std::fs::read_to_string(&pid_path) {
        if let Ok(pid) = pid_str.trim().parse::<u32>() {
            if is_pid_alive(pid) {
                kill_pid(pid);
                // Brief wait for process to exit
                std::thread::sleep(Duration::from_millis(200));
            }
        }
        let _ = std::fs::remove_file(&pid_path);
    }

    // Clean up stale socket
    let _ = std::fs::remove_file(config_dir.join("icefleet.sock"));

    // Start daemon as a background process
    start_daemon_process(config_dir)?;

    // Wait for socket to appear and accept connections
    wait_for_socket(config_dir, 5_000)?;

    // Retry the original command
    send_command(config_dir, cmd, timeout_ms)
        .map_err(|e| format!("daemon started but command failed: {}", e))
}


/// Send a command to the daemon socket with a read timeout.
fn send_command(config_dir: &Path, cmd: &Command, timeout_ms: u64) -> Result<Response, String> {
    let sock_path = config_dir.join("icefleet.sock");

    let stream = UnixStream::connect(&sock_path)
        .map_err(|e| format!("cannot connect to {}: {}", sock_path.display(), e))?;

    stream
        .set_read_timeout(Some(Duration::from_millis(timeout_ms)))
        .map_err(|e| format!("cannot set timeout: {}", e))?;

    // Write length-prefixed JSON command
    let json =
        serde_json::to_vec(cmd).map_err(|e| format!("failed to serialize command: {}", e))?;
    write_frame(&stream, &json)?;

    // Read length-prefixed JSON response (subject to timeout)
    let payload = read_frame(&stream)?;

    serde_json::from_slice(&payload).map_err(|e| format!("failed to parse response: {}", e))
}


/// Write a length-prefixed frame to a stream.
fn write_frame(stream: &UnixStream, payload: &[u8]) -> Result<(), String> {
    let mut stream = stream;
    let len = payload.len() as u32;
    stream
        .write_all(&len.to_be_bytes())
        .map_err(|e| format!("failed to write frame length: {}", e))?;
    stream
        .write_all(payload)
        .map_err(|e| format!("failed to write frame payload: {}", e))?;
    stream
        .flush()
        .map_err(|e| format!("failed to flush: {}", e))?;
    Ok(())
}


/// Read a length-prefixed frame from a stream.
fn read_frame(stream: &UnixStream) -> Result<Vec<u8>, String> {
    let mut stream = stream;
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .map_err(|e| format!("failed to read response length: {}", e))?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len == 0 {
        return Err("empty response frame".into());
    }
    if len > 1024 * 1024 {
        return Err(format!("response frame too large: {} bytes", len));
    }

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .map_err(|e| format!("failed to read response payload: {}", e))?;

    Ok(payload)
}


/// File-lock guard that releases the lock on drop.
#[derive(Debug)]
struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}


impl Drop for LockGuard {
    fn drop(&mut self) {
        unsafe {
            libc::flock(
                std::os::unix::io::AsRawFd::as_raw_fd(&self.file),
                libc::LOCK_UN,
            );
        }
        // Remove the lock file (best effort)
        let _ = std::fs::remove_file(&self.path);
    }
}


/// Acquire an exclusive file lock (blocking with timeout).
///
/// Returns a guard that releases the lock on drop.
fn acquire_lock(lock_path: &Path, timeout_ms: u64) -> Result<LockGuard, String> {
    if let Some(parent) = lock_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)
        .map_err(|e| format!("cannot create lock file {}: {}", lock_path.display(), e))?;

    let fd = std::os::unix::io::AsRawFd::as_raw_fd(&file);
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let ret = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if ret == 0 {
            return Ok(LockGuard {
                file,
                path: lock_path.to_path_buf(),
            });
        }

        if Instant::now() >= deadline {
            return Err(format!(
                "timed out acquiring lock {} after {}ms",
                lock_path.display(),
                timeout_ms
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}


/// Start the daemon as a detached background process.
///
/// Spawns `<current_exe> daemon run` with `ICF_CONFIG_DIR` set to the given
/// config directory. Redirects stdout/stderr to `daemon.log`.
fn start_daemon_process(config_dir: &Path) -> Result<u32, String> {
    let exe = std::env::current_exe()
        .map_err(|e| format!("cannot determine current executable: {}", e))?;

    let log_path = config_dir.join("daemon.log");
    let log_file = std::fs::File::create(&log_path)
        .map_err(|e| format!("cannot create {}: {}", log_path.display(), e))?;
    let log_stderr = log_file
        .try_clone()
        .map_err(|e| format!("cannot clone log file handle: {}", e))?;

    let child = std::process::Command::new(&exe)
        .args(["daemon", "run"])
        .env("ICF_CONFIG_DIR", config_dir)
        .stdout(log_file)
        .stderr(log_stderr)
        .spawn()
        .map_err(|e| format!("cannot spawn daemon: {}", e))?;

    Ok(child.id())
}


/// Wait for the daemon socket to appear and accept a test connection.
///
/// Polls with backoff up to `timeout_ms` milliseconds.
fn wait_for_socket(config_dir: &Path, timeout_ms: u64) -> Result<(), String> {
    let sock_path = config_dir.join("icefleet.sock");
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut interval = Duration::from_millis(25);

    loop {
        if sock_path.exists() && UnixStream::connect(&sock_path).is_ok() {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(format!(
                "timed out waiting for daemon socket at {} ({}ms)",
                sock_path.display(),
                timeout_ms,
            ));
        }

        std::thread::sleep(interval);
        // Exponential backoff capped at 200ms
        interval = std::cmp::min(interval * 2, Duration::from_millis(200));
    }
}


/// Check if a process with the given PID is alive.
fn is_pid_alive(pid: u32) -> bool {
    // kill(pid, 0) checks if the process exists without sending a signal
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}


/// Kill a process by PID (best effort, SIGTERM then SIGKILL after brief
/// delay).
fn kill_pid(pid: u32) {
    let pid = pid as libc::pid_t;

    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }

    // Wait briefly for graceful shutdown
    std::thread::sleep(Duration::from_millis(500));

    if unsafe { libc::kill(pid, 0) } == 0 {
        unsafe {
            libc::kill(pid, libc::SIGKILL);
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
