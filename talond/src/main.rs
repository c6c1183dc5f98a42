//! # talond
//!
//! Daemon binary: loads configuration, starts the telemetry poller, builds
//! the command surface, and runs until SIGINT/SIGTERM. The RPC transport
//! that dispatches client calls into [`talond::daemon::TelescopeDaemon`] is
//! provided externally.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nix::sys::signal::{SigSet, Signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use talond::daemon::{HttpSecuritySystem, SecuritySystem, TelescopeDaemon};
use talond::poller::TelemetryPoller;
use talond::telemetry::TelemetryShared;
use talond_common::config::Config;

#[derive(Parser)]
#[command(name = "talond", about = "Talon mount control daemon")]
struct Args {
    /// Path to the daemon configuration file.
    config: PathBuf,
}

fn main() {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => Arc::new(config),
        Err(error) => {
            eprintln!("FATAL: {error}");
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.as_str()))
        .with_target(false)
        .init();
    info!(daemon = %config.daemon, log = %config.log_name, "starting talond");

    let security: Option<Box<dyn SecuritySystem>> = match &config.security_system {
        Some(section) => {
            let timeout = Duration::from_secs_f64(config.ping_timeout);
            match HttpSecuritySystem::new(section, timeout) {
                Ok(client) => Some(Box::new(client)),
                Err(error) => {
                    eprintln!("FATAL: {error}");
                    process::exit(1);
                }
            }
        }
        None => None,
    };

    // Block the shutdown signals before any thread exists so every thread
    // inherits the mask and delivery is funneled through the wait below.
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    if let Err(error) = signals.thread_block() {
        eprintln!("FATAL: failed to block signals: {error}");
        process::exit(1);
    }

    let shared = Arc::new(TelemetryShared::new());
    let poller = match TelemetryPoller::start(Arc::clone(&config), Arc::clone(&shared)) {
        Ok(poller) => poller,
        Err(error) => {
            eprintln!("FATAL: failed to start telemetry poller: {error}");
            process::exit(1);
        }
    };

    let daemon = TelescopeDaemon::new(Arc::clone(&config), Arc::clone(&shared), security);
    info!(
        state = %daemon.report_status().state_label,
        "command surface ready"
    );

    match signals.wait() {
        Ok(signal) => info!(signal = ?signal, "shutting down"),
        Err(error) => info!(%error, "signal wait interrupted, shutting down"),
    }

    poller.stop();
    info!("talond stopped");
}
