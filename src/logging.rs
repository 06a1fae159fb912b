// src/logging.rs
//
// Timestamped stderr logging with an optional session log file.
// Log files are named `YYYYmmdd-HHMMSS-SerialDebug.log`; `SerialDebug.log`
// points at the newest one and older files are pruned to `log_keep`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::settings::ManagerSettings;

/// Global log file handle. When `Some`, `tlog!` writes to both stderr and this file.
pub(crate) static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

/// Timestamped logging macro.
/// Prepends `HH:MM:SS.mmm` local time to every message written to stderr.
/// Also writes to the log file when file logging is enabled.
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let msg = format!("{} {}", chrono::Local::now().format("%H:%M:%S%.3f"), format_args!($($arg)*));
        eprintln!("{}", msg);
        if let Ok(mut guard) = $crate::logging::LOG_FILE.lock() {
            if let Some(ref mut f) = *guard {
                let _ = writeln!(f, "{}", msg);
            }
        }
    }};
}

const LOG_SUFFIX: &str = "-SerialDebug.log";
const LOG_LINK: &str = "SerialDebug.log";

/// Start file logging as configured in `settings`.
///
/// Returns the new log file path, or `None` when `log_dir` is unset.
pub fn init_logging(settings: &ManagerSettings) -> Result<Option<PathBuf>, String> {
    let Some(dir) = &settings.log_dir else {
        return Ok(None);
    };
    let dir = Path::new(dir);
    let log_path = init_file_logging(dir)?;

    tlog!(
        "[logging] serial-debug {}: device dir {}, default line {} ({})",
        env!("CARGO_PKG_VERSION"),
        settings.device_dir,
        settings.default_line,
        settings.default_line_ending
    );

    let removed = prune_logs(dir, settings.log_keep);
    if removed > 0 {
        tlog!("[logging] Removed {} old log file(s)", removed);
    }

    Ok(Some(log_path))
}

/// Initialise file logging in the given directory.
/// Creates a timestamped log file and a `SerialDebug.log` symlink (Unix only).
/// Returns the path of the new log file.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create log dir: {}", e))?;

    let filename = format!("{}{}", chrono::Local::now().format("%Y%m%d-%H%M%S"), LOG_SUFFIX);
    let log_path = log_dir.join(&filename);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to create log file: {}", e))?;

    #[cfg(unix)]
    {
        let symlink_path = log_dir.join(LOG_LINK);
        let _ = std::fs::remove_file(&symlink_path);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &symlink_path) {
            eprintln!(
                "{} [logging] Failed to create {} symlink: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                LOG_LINK,
                e
            );
        }
    }

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }

    // eprintln directly: tlog! would take the LOG_FILE lock
    eprintln!(
        "{} [logging] File logging started: {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        log_path.display()
    );

    Ok(log_path)
}

/// Delete the oldest timestamped log files so at most `keep` remain.
/// `keep == 0` keeps everything. Returns how many files were removed.
pub(crate) fn prune_logs(log_dir: &Path, keep: usize) -> usize {
    if keep == 0 {
        return 0;
    }

    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return 0;
    };

    // Names start with the timestamp, so lexical order is age order
    let mut logs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(LOG_SUFFIX))
        .map(|entry| entry.path())
        .collect();
    logs.sort();

    let excess = logs.len().saturating_sub(keep);
    logs.into_iter()
        .take(excess)
        .filter(|path| std::fs::remove_file(path).is_ok())
        .count()
}

/// Stop file logging and close the log file.
pub fn stop_file_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if guard.is_some() {
            *guard = None;
            eprintln!(
                "{} [logging] File logging stopped",
                chrono::Local::now().format("%H:%M:%S%.3f")
            );
        }
    }
}
