//! Logging configuration and initialization
//!
//! The terminal belongs to the TUI, so log lines go to a file instead of
//! stderr. `RUST_LOG` wins over the `-v` count when it is set.

use std::{fs::OpenOptions, io, path::Path, sync::Mutex};

use tracing::debug;
use tracing_subscriber::EnvFilter;

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing, appending to `log_path`. Never fails: if the file
/// cannot be opened, log output is dropped.
pub fn init_logging(verbose: u8, log_path: &Path) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("studytype={}", level_for(verbose))));

    let file = log_path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
        });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(verbose >= 2);

    let _ = match file {
        Ok(file) => builder.with_writer(Mutex::new(file)).try_init(),
        Err(_) => builder.with_writer(io::sink).try_init(),
    };

    debug!("studytype started with verbosity level: {}", verbose);
}
