use crate::shared::constants;
use lazy_static::lazy_static;
use std::backtrace::Backtrace;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Clone)]
struct LoggerState {
    error_path: String,
    debug_path: String,
    min_level: LogLevel,
}

lazy_static! {
    static ref LOGGER: Mutex<Option<LoggerState>> = Mutex::new(None);
}

fn append_line(path: &str, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", line);
    }
}

fn truncate_with_banner(path: &Path, banner: &str) {
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
    {
        let _ = writeln!(file, "=== {} Started: {} ===", banner, chrono::Local::now());
    }
}

/// Starts file logging into `log_dir` and installs the panic hook.
///
/// Until this is called every log function is a no-op.
pub fn init(log_dir: &Path, min_level: LogLevel) {
    let error_path = log_dir.join(constants::ERROR_LOG_FILE);
    let debug_path = log_dir.join(constants::DEBUG_LOG_FILE);

    truncate_with_banner(&error_path, "Error Log");
    truncate_with_banner(&debug_path, "Debug Log");

    let state = LoggerState {
        error_path: error_path.to_string_lossy().to_string(),
        debug_path: debug_path.to_string_lossy().to_string(),
        min_level,
    };
    let paths = state.clone();
    *lock_logger() = Some(state);

    panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::capture();
        let msg = match info.payload().downcast_ref::<&str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &s[..],
                None => "Box<Any>",
            },
        };

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());

        let error_msg = format!(
            "\nCRITICAL PANIC at {}:\nMessage: {}\nBacktrace:\n{:?}\n",
            location, msg, backtrace
        );

        append_line(&paths.error_path, &error_msg);
        append_line(&paths.debug_path, &error_msg);
        eprintln!(
            "{} crashed. See {} for details.",
            constants::APP_NAME,
            paths.error_path
        );
    }));
}

fn lock_logger() -> std::sync::MutexGuard<'static, Option<LoggerState>> {
    match LOGGER.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn is_enabled(level: LogLevel) -> bool {
    lock_logger()
        .as_ref()
        .map_or(false, |state| level >= state.min_level)
}

pub fn log(level: LogLevel, msg: &str) {
    let state = match lock_logger().as_ref() {
        Some(state) if level >= state.min_level => state.clone(),
        _ => return,
    };

    let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}][{}] {}", timestamp, level, msg);
    append_line(&state.debug_path, &line);

    if level == LogLevel::Error {
        append_line(&state.error_path, &line);
    }
}

pub fn debug(msg: &str) {
    log(LogLevel::Debug, msg);
}

pub fn info(msg: &str) {
    log(LogLevel::Info, msg);
}

pub fn warn(msg: &str) {
    log(LogLevel::Warn, msg);
}

pub fn error(msg: &str) {
    log(LogLevel::Error, msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // Logger state is global, so everything touching it lives in one test.
    #[test]
    fn test_init_filters_and_routes_lines() {
        let dir = std::env::temp_dir().join("frame_queue_logger_test");
        fs::create_dir_all(&dir).unwrap();

        init(&dir, LogLevel::Info);
        assert!(!is_enabled(LogLevel::Debug));
        assert!(is_enabled(LogLevel::Warn));

        debug("hidden debug line");
        info("visible info line");
        error("visible error line");

        let debug_log = fs::read_to_string(dir.join(constants::DEBUG_LOG_FILE)).unwrap();
        let error_log = fs::read_to_string(dir.join(constants::ERROR_LOG_FILE)).unwrap();

        assert!(!debug_log.contains("hidden debug line"));
        assert!(debug_log.contains("[INFO] visible info line"));
        assert!(debug_log.contains("[ERROR] visible error line"));
        assert!(!error_log.contains("visible info line"));
        assert!(error_log.contains("visible error line"));

        let _ = panic::take_hook();
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Info > LogLevel::Debug);
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
    }
}
