use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::command::Command;
use crate::sys::Sys;
use crate::types::response::Response;


/// Unix domain socket listener that accepts one connection at a time,
/// reads a length-prefixed JSON command, dispatches it through Sys, and
/// writes back a length-prefixed JSON response.
///
/// One connection at a time is the point, not a limitation: the platform
/// contract says lifecycle events for a unit never overlap, and this
/// listener is what enforces that serialization locally.
pub struct ServiceSocket {
    listener: UnixListener,
    path: PathBuf,
    shutdown_requested: std::cell::Cell<bool>,
}


/// Result of handling a single connection.
enum HandleResult {
    /// A regular command was dispatched through Sys.
    Dispatched,
    /// A DaemonStop command was received — the response was sent, daemon
    /// should shut down.
    Shutdown,
}


impl ServiceSocket {
    /// Bind a new Unix domain socket at the given path.
    /// Removes any stale socket file first.
    pub fn bind(path: &Path) -> Result<ServiceSocket, String> {
        if path.exists() {
            std::fs::remove_file(path)
                .map_err(|e| format!("cannot remove stale socket {}: {}", path.display(), e))?;
        }
        let listener = UnixListener::bind(path)
            .map_err(|e| format!("cannot bind socket {}: {}", path.display(), e))?;
        Ok(ServiceSocket {
            listener,
            path: path.to_path_buf(),
            shutdown_requested: std::cell::Cell::new(false),
        })
    }

    /// Start the service: bind socket, return ready ServiceSocket.
    /// Called once during daemon initialization.
    pub fn start(config_dir: &Path) -> Result<ServiceSocket, String> {
        ServiceSocket::bind(&config_dir.join("icefleet.sock"))
    }

    /// Accept a single connection, read one command, dispatch through Sys,
    /// and send back the response. Blocks until a client connects.
    ///
    /// Returns `Ok(true)` if a DaemonStop was received and the daemon
    /// should shut down.
    pub fn accept_one(&self, sys: &mut Sys) -> Result<bool, String> {
        let (stream, _addr) = self
            .listener
            .accept()
            .map_err(|e| format!("accept failed: {}", e))?;
        match handle_connection(stream, sys)? {
            HandleResult::Dispatched => Ok(false),
            HandleResult::Shutdown => {
                self.shutdown_requested.set(true);
                Ok(true)
            }
        }
    }

    /// Accept connections with a poll timeout so the caller can interleave
    /// other work between commands.
    ///
    /// Returns `Ok(true)` if a command was handled, `Ok(false)` if the
    /// timeout elapsed with no incoming connection.
    pub fn accept_nonblocking(&self, sys: &mut Sys, timeout_ms: u64) -> Result<bool, String> {
        self.listener
            .set_nonblocking(true)
            .map_err(|e| format!("failed to set non-blocking: {}", e))?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let poll_interval = Duration::from_millis(10);

        let result = loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    let _ = self.listener.set_nonblocking(false);
                    match handle_connection(stream, sys)? {
                        HandleResult::Dispatched => {}
                        HandleResult::Shutdown => {
                            self.shutdown_requested.set(true);
                        }
                    }
                    break Ok(true);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        break Ok(false);
                    }
                    std::thread::sleep(poll_interval);
                }
                Err(e) => {
                    break Err(format!("accept failed: {}", e));
                }
            }
        };

        // Always restore blocking mode
        let _ = self.listener.set_nonblocking(false);
        result
    }

    /// Cleanup socket file without consuming self.
    pub fn shutdown_ref(&self) {
        let _ = std::fs::remove_file(&self.path);
    }

    /// Return the path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a DaemonStop command has been received.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.get()
    }

    /// Remove the socket file from disk (static helper).
    pub fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
    }
}


/// Handle a single connection: read one command, dispatch, respond.
fn handle_connection(mut stream: UnixStream, sys: &mut Sys) -> Result<HandleResult, String> {
    let cmd = read_frame(&mut stream)?;

    let is_stop = cmd == Command::DaemonStop;
    let response = sys.execute(cmd);
    if let Err(e) = write_frame(&mut stream, &response) {
        warn!(error = %e, "failed to write response");
    }

    if is_stop {
        Ok(HandleResult::Shutdown)
    } else {
        Ok(HandleResult::Dispatched)
    }
}


/// Read a length-prefixed JSON frame from a stream.
///
/// Wire format: 4 bytes big-endian length, then that many bytes of JSON.
fn read_frame(stream: &mut UnixStream) -> Result<Command, String> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .map_err(|e| format!("failed to read frame length: {}", e))?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len == 0 {
        return Err("empty frame".into());
    }
    if len > 1024 * 1024 {
        return Err(format!("frame too large: {} bytes", len));
    }

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .map_err(|e| format!("failed to read frame payload: {}", e))?;

    serde_json::from_slice(&payload).map_err(|e| format!("failed to parse command JSON: {}", e))
}


/// Write a length-prefixed JSON frame to a stream.
fn write_frame(stream: &mut UnixStream, response: &Response) -> Result<(), String> {
    let json = serde_json::to_vec(response)
        .map_err(|e| format!("failed to serialize response: {}", e))?;
    let len = json.len() as u32;
    stream
        .write_all(&len.to_be_bytes())
        .map_err(|e| format!("failed to write frame length: {}", e))?;
    stream
        .write_all(&json)
        .map_err(|e| format!("failed to write frame payload: {}", e))
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
