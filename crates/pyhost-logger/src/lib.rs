use colored::Colorize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static NO_STDOUT: Mutex<bool> = Mutex::new(false);

const LOG_FILE_NAME: &str = "pyhost.log";

/// Get the current verbosity level for use by other crates
pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

/// Set the verbosity level without touching the log file
pub fn set_verbosity(verbosity: u8) {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
}

/// Get whether console echo is disabled
pub fn get_no_stdout() -> bool {
    NO_STDOUT.lock().ok().map(|v| *v).unwrap_or(false)
}

/// Set whether console echo is disabled
pub fn set_no_stdout(disabled: bool) {
    if let Ok(mut v) = NO_STDOUT.lock() {
        *v = disabled;
    }
}

/// Initialize the logger with a verbosity level
///
/// The log file lives in the pyhost config directory and is truncated
/// on every start so it only ever holds one host session.
pub fn init_with_verbosity(verbosity: u8, no_stdout: bool) -> Result<(), String> {
    set_verbosity(verbosity);
    set_no_stdout(no_stdout);

    let config_dir = get_config_dir()?;
    init_in(&config_dir)
}

/// Initialize the logger writing into `dir` (used by tests and embedders
/// that keep their logs next to the host's own)
pub fn init_in(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create log directory: {}", e))?;

    let log_file = dir.join(LOG_FILE_NAME);
    if log_file.exists() {
        let _ = fs::remove_file(&log_file);
    }

    let mut guard = LOG_FILE
        .lock()
        .map_err(|_| "Log file lock poisoned".to_string())?;
    *guard = Some(log_file);

    Ok(())
}

fn get_config_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let config_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("pyhost");

    #[cfg(target_os = "windows")]
    let config_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("pyhost");

    Ok(config_dir)
}

fn write_to_log(message: &str) {
    write_to_log_with_source(message, "RUST")
}

fn write_to_log_with_source(message: &str, source: &str) {
    if let Ok(log_file_guard) = LOG_FILE.lock() {
        if let Some(ref log_path) = *log_file_guard {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "[{}] [{}] {}", timestamp, source, message);
            }
        }
    }
}

fn console_enabled() -> bool {
    !get_no_stdout()
}

/// Log an informational message (to console if verbose >= 1, always to file)
pub fn info(message: &str) {
    write_to_log(&format!("INFO {}", message));
    if console_enabled() && get_verbosity() >= 1 {
        eprintln!("{}", message);
    }
}

/// Log a debug message (to console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    write_to_log(&format!("DEBUG {}", message));
    if console_enabled() && get_verbosity() >= 1 {
        eprintln!("{} {}", "DEBUG:".blue().bold(), message);
    }
}

/// Log a warning message (to both file and console)
pub fn warn(message: &str) {
    write_to_log(&format!("WARN {}", message));
    if console_enabled() {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }
}

/// Log an error message (to both file and console)
pub fn error(message: &str) {
    write_to_log(&format!("ERROR {}", message));
    if console_enabled() {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
}

/// Log a success message
pub fn success(message: &str) {
    write_to_log(&format!("SUCCESS {}", message));
    if console_enabled() {
        eprintln!("{} {}", "\u{2714}".green().bold(), message);
    }
}

/// Log a lifecycle step (console only at -vv)
pub fn step(message: &str) {
    if console_enabled() && get_verbosity() >= 2 {
        eprintln!("TRACE: {}", message);
    }
    write_to_log(&format!("STEP: {}", message));
}

/// Record text that came out of the embedded interpreter.
///
/// File only: the host's display sink is the user-facing channel for
/// these, so echoing them here would show them twice.
pub fn script(message: &str) {
    write_to_log_with_source(message.trim_end(), "SCRIPT");
}

/// Get the log file path for display
pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}

/// Print the log file path to the user
pub fn show_log_path() {
    if let Some(path) = get_log_path() {
        eprintln!("Log file: {}", path.display());
    } else if let Ok(config_dir) = get_config_dir() {
        eprintln!("Log file: {}", config_dir.join(LOG_FILE_NAME).display());
    } else {
        eprintln!("Log file location not available");
    }
}
