//! CLI argument parsing.

use crate::command::Command;


/// Parse CLI arguments into a typed Command enum.
///
/// Arguments are expected WITHOUT the program name (i.e., `args` should be
/// `["status"]`, not `["icf", "status"]`).
pub fn parse_args(args: &[&str]) -> Result<Command, String> {
    if args.is_empty() {
        return Err("no command specified. Usage: icf <status|event|scheduler|cache|diag|daemon>".into());
    }

    match args[0] {
        "status" => Ok(Command::Status),
        "event" => parse_event(args),
        "scheduler" => parse_scheduler(args),
        "cache" => parse_cache(args),
        "diag" => parse_diag(args),
        "daemon" => parse_daemon(args),
        _ => Err(format!("unknown command: '{}'", args[0])),
    }
}


// ---------------------------------------------------------------------------
// Sub-parsers
// ---------------------------------------------------------------------------

/// `icf event <workload-ready|peers-changed|config-changed>`
fn parse_event(args: &[&str]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("Usage: icf event <workload-ready|peers-changed|config-changed>".into());
    }
    match args[1] {
        "workload-ready" => Ok(Command::WorkloadReady),
        "peers-changed" => Ok(Command::PeersChanged),
        "config-changed" => Ok(Command::ConfigChanged),
        other => Err(format!("unknown event: '{}'", other)),
    }
}

/// `icf scheduler address`
fn parse_scheduler(args: &[&str]) -> Result<Command, String> {
    match args.get(1) {
        Some(&"address") => Ok(Command::SchedulerAddress),
        _ => Err("Usage: icf scheduler address".into()),
    }
}

/// `icf cache stats`
fn parse_cache(args: &[&str]) -> Result<Command, String> {
    match args.get(1) {
        Some(&"stats") => Ok(Command::CacheStats),
        _ => Err("Usage: icf cache stats".into()),
    }
}

/// `icf diag [--fail <reason>]`
fn parse_diag(args: &[&str]) -> Result<Command, String> {
    let mut fail = String::new();
    let rest = &args[1..];
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            "--fail" => {
                i += 1;
                fail = rest
                    .get(i)
                    .ok_or_else(|| "--fail requires a value".to_string())?
                    .to_string();
            }
            other => return Err(format!("unknown flag for diag: '{}'", other)),
        }
        i += 1;
    }
    Ok(Command::Diag { fail })
}

/// `icf daemon <run|stop>`
fn parse_daemon(args: &[&str]) -> Result<Command, String> {
    match args.get(1) {
        Some(&"run") => Ok(Command::DaemonRun),
        Some(&"stop") => Ok(Command::DaemonStop),
        _ => Err("Usage: icf daemon <run|stop>".into()),
    }
}
