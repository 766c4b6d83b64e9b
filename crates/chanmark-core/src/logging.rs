use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use chrono::{Local, NaiveDate};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// Always logs to stdout. When `log_dir` is set, the same events are appended
/// to a daily file `<service>_<YYYYMMDD>.log` in that directory.
pub fn init(service_name: &str, log_dir: Option<&Path>) -> Result<()> {
    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,chanmark=info,chanmark_core=info,chanmark_discord=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let path = dir.join(log_file_name(service_name, Local::now().date_naive()));
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::External(format!("logging init failed: {e}")))?;

    Ok(())
}

fn log_file_name(service_name: &str, date: NaiveDate) -> String {
    format!("{service_name}_{}.log", date.format("%Y%m%d"))
}
