//! Daemon — the icefleet main event loop.
//!
//! The daemon is single-threaded for state mutation. Lifecycle events and
//! operator commands arrive over the Unix socket or the internal channel and
//! are executed one at a time by the main loop — the serialization guarantee
//! the reconciliation core relies on.
//!
//! # Main loop tick
//!
//! 1. Drain channel — execute each pending internal command
//! 2. Accept socket connections (non-blocking with timeout)

use std::path::Path;
use std::sync::mpsc;

use tracing::{error, info};

use crate::command::Command;
use crate::data::Data;
use crate::infrastructure::Platform;
use crate::service::ServiceSocket;
use crate::sys::Sys;


/// Events that can be sent to the daemon's main loop via the channel.
#[derive(Debug)]
pub enum DaemonEvent {
    /// A command from an internal source (timer, platform hook).
    InternalCommand {
        command: Command,
        /// Label for logging (e.g., "platform: peers-changed").
        source: String,
    },
    /// Request the daemon to shut down gracefully.
    Shutdown,
}


/// Configuration for the daemon loop.
pub struct DaemonConfig {
    /// How long to wait for socket connections per tick (milliseconds).
    pub socket_poll_ms: u64,
}


impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig { socket_poll_ms: 50 }
    }
}


/// Handle returned from `Daemon::handle()` allowing other threads to send
/// events.
#[derive(Clone)]
pub struct DaemonHandle {
    sender: mpsc::Sender<DaemonEvent>,
}


impl DaemonHandle {
    /// Send a command to the daemon for execution.
    pub fn send_command(&self, command: Command, source: &str) -> Result<(), String> {
        self.sender
            .send(DaemonEvent::InternalCommand {
                command,
                source: source.to_string(),
            })
            .map_err(|e| format!("channel send failed: {}", e))
    }

    /// Request daemon shutdown.
    pub fn shutdown(&self) -> Result<(), String> {
        self.sender
            .send(DaemonEvent::Shutdown)
            .map_err(|e| format!("channel send failed: {}", e))
    }
}


/// The icefleet daemon — owns the event loop, Sys, and the service socket.
pub struct Daemon {
    sys: Sys,
    service: ServiceSocket,
    receiver: mpsc::Receiver<DaemonEvent>,
    handle: DaemonHandle,
    config: DaemonConfig,
}


impl Daemon {
    /// Initialize the daemon with the local-host platform.
    pub fn new(config_dir: &Path) -> Result<Daemon, String> {
        let sys = Sys::new(config_dir)?;
        Self::from_sys(config_dir, sys, DaemonConfig::default())
    }

    /// Initialize with a pre-built platform (testing).
    pub fn with_platform(
        config_dir: &Path,
        config: DaemonConfig,
        platform: Platform,
    ) -> Result<Daemon, String> {
        let data = Data::new(config_dir)?;
        let sys = Sys::from_parts(data, platform);
        Self::from_sys(config_dir, sys, config)
    }

    fn from_sys(config_dir: &Path, sys: Sys, config: DaemonConfig) -> Result<Daemon, String> {
        let service = ServiceSocket::start(config_dir)?;
        let (sender, receiver) = mpsc::channel();
        let handle = DaemonHandle { sender };

        Ok(Daemon {
            sys,
            service,
            receiver,
            handle,
            config,
        })
    }

    /// Get a handle for sending events to this daemon.
    pub fn handle(&self) -> DaemonHandle {
        self.handle.clone()
    }

    /// Run the main event loop. Blocks until shutdown is received.
    pub fn run(&mut self) -> Result<(), String> {
        info!("icefleet daemon started");
        loop {
            if self.tick() {
                break;
            }
        }
        self.service.shutdown_ref();
        info!("icefleet daemon stopped");
        Ok(())
    }

    /// Run exactly one tick of the main loop.
    /// Returns true if shutdown was requested.
    pub fn tick(&mut self) -> bool {
        // 1. Drain channel — process all pending internal events
        if self.drain_channel() {
            return true;
        }

        // 2. Accept socket connections (non-blocking with timeout)
        if let Err(e) = self
            .service
            .accept_nonblocking(&mut self.sys, self.config.socket_poll_ms)
        {
            error!(error = %e, "socket error");
        }

        self.service.shutdown_requested()
    }

    /// Drain all pending events from the channel.
    /// Returns true if a Shutdown event was received.
    fn drain_channel(&mut self) -> bool {
        loop {
            match self.receiver.try_recv() {
                Ok(DaemonEvent::InternalCommand { command, source }) => {
                    info!(%source, ?command, "executing internal command");
                    let _response = self.sys.execute(command);
                }
                Ok(DaemonEvent::Shutdown) => {
                    return true;
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    error!("channel disconnected, shutting down");
                    return true;
                }
            }
        }
        false
    }

    /// Borrow Sys for inspection (testing).
    pub fn sys(&self) -> &Sys {
        &self.sys
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
