//! Logging setup and panic capture

use crate::db::get_app_data_dir;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

const LOG_FILE_NAME: &str = "talentmatch.log";
const PANIC_FILE_NAME: &str = "panics.log";

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Set up logging: info and above to stderr, debug and above to the log
/// file in the app data directory. Safe to call more than once; only the
/// first call installs a logger.
pub fn init_logging() {
    LOG_PATH.get_or_init(|| {
        let path = get_app_data_dir().join(LOG_FILE_NAME);
        let config = ConfigBuilder::new().set_time_format_rfc3339().build();

        let mut sinks: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
            LevelFilter::Info,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )];

        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => sinks.push(WriteLogger::new(LevelFilter::Debug, config, file)),
            Err(e) => eprintln!(
                "Could not open {} ({}); logging to stderr only",
                path.display(),
                e
            ),
        }

        if CombinedLogger::init(sinks).is_ok() {
            log::info!("[logging] Debug log at {}", path.display());
        }

        path
    });
}

/// Capture panics into the log and a dedicated panic file. The default
/// hook only writes to stderr, which is lost for background workers.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        let entry = format!(
            "[{}] thread '{}' {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            thread.name().unwrap_or("unnamed"),
            info
        );

        log::error!("{}", entry);

        let panic_path = get_app_data_dir().join(PANIC_FILE_NAME);
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&panic_path) {
            use std::io::Write;
            let _ = writeln!(file, "{}", entry);
        }
    }));
}

/// Log an error and its full source chain as a single line, so a job
/// failure reads end to end in one grep hit.
pub fn log_error_chain(context: &str, error: &dyn std::error::Error) {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(" -> ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    log::error!("[{}] {}", context, chain);
}
