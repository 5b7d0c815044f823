use std::{
    env,
    fs::OpenOptions,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod bridge;
mod constants;
mod ingest;
mod probe;
mod rate;
mod tree;
mod ui;
mod util;

use app::SharedFeed;
use probe::CapturePermission;

fn main() -> anyhow::Result<()> {
    init_logging()?;

    if probe::request_capture_permission() == CapturePermission::Denied {
        // Static fallback, no retry.
        println!("Capture permission is required.");
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .context("failed to install signal handler")?;
    }

    let feed = Arc::new(Mutex::new(SharedFeed::new(Instant::now())));
    let bridge = bridge::spawn(constants::DEFAULT_LISTEN_ADDR, Arc::clone(&feed))?;
    info!(
        shim = %bridge::shim_script(&bridge.local_addr()),
        "inject this into the hosted content"
    );

    ui::run(feed, bridge, shutdown)?;
    Ok(())
}

// The terminal belongs to the TUI, so logs go to a file.
fn init_logging() -> anyhow::Result<()> {
    let path = env::var("MSG_MONITOR_LOG").unwrap_or_else(|_| "msg_monitor.log".to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
