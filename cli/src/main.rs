//! icf — the command-line entry point for icefleet.
//!
//! # Usage
//!
//! ```text
//! icf status
//! icf event workload-ready
//! icf scheduler address
//! icf cache stats
//! icf diag --fail boom
//! icf daemon run
//! icf daemon stop
//! ```

use std::path::{Path, PathBuf};
use std::process;

use icefleet_core::cli::parse_args;
use icefleet_core::command::Command;
use icefleet_core::sys::Sys;
use icefleet_core::types::response::Response;


fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let cmd = match parse_args(&arg_refs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("icf: {}", e);
            process::exit(1);
        }
    };

    let config_dir = resolve_config_dir();

    // DaemonRun is handled directly — run the daemon in this process.
    if matches!(cmd, Command::DaemonRun) {
        let pid_path = config_dir.join("icf.pid");
        let _ = std::fs::write(&pid_path, std::process::id().to_string());

        match icefleet_core::daemon::Daemon::new(&config_dir) {
            Ok(mut daemon) => {
                if let Err(e) = daemon.run() {
                    eprintln!("icf daemon: {}", e);
                    let _ = std::fs::remove_file(&pid_path);
                    process::exit(1);
                }
                let _ = std::fs::remove_file(&pid_path);
            }
            Err(e) => {
                eprintln!("icf daemon: failed to start: {}", e);
                let _ = std::fs::remove_file(&pid_path);
                process::exit(1);
            }
        }
        return;
    }

    // All other commands: use execute_remote (handles daemon lifecycle).
    let response = match icefleet_core::client::execute_remote(&config_dir, &cmd, 60_000) {
        Ok(resp) => resp,
        Err(e) => {
            eprintln!("icf: daemon unavailable ({}), using local mode", e);
            execute_local(&config_dir, cmd)
        }
    };

    match response {
        Response::Ok { output } => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Response::Error { message } => {
            eprintln!("icf error: {}", message);
            process::exit(1);
        }
    }
}


fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ICF_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("icefleet")
}


fn execute_local(config_dir: &Path, cmd: Command) -> Response {
    match Sys::new(config_dir) {
        Ok(mut sys) => sys.execute(cmd),
        Err(e) => Response::Error {
            message: format!("failed to initialize: {}", e),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_config_dir_default() {
        let old = std::env::var("ICF_CONFIG_DIR").ok();
        std::env::remove_var("ICF_CONFIG_DIR");
        let dir = resolve_config_dir();
        assert!(dir.to_string_lossy().contains(".config/icefleet"));
        if let Some(v) = old {
            std::env::set_var("ICF_CONFIG_DIR", v);
        }
    }

    #[test]
    fn resolve_config_dir_from_env() {
        std::env::set_var("ICF_CONFIG_DIR", "/tmp/test-icf-config");
        let dir = resolve_config_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-icf-config"));
        std::env::remove_var("ICF_CONFIG_DIR");
    }

    #[test]
    fn execute_local_diag() {
        let dir = std::env::temp_dir().join(format!("icf-cli-test-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        let resp = execute_local(&dir, Command::Diag { fail: String::new() });
        match resp {
            Response::Ok { output } => assert!(output.contains("bug in the code")),
            Response::Error { message } => panic!("unexpected error: {}", message),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
