//! Logging for ladle binaries: plain `env_logger` output or JSON lines
//!
//! The level string comes from `LADLE_LOG_LEVEL` (or a CLI flag); a `json:`
//! prefix (e.g. `json:debug`) selects JSON-lines output, written to stderr or
//! to the file named by `LADLE_LOG_PATH`.

use chrono::{Local, Utc};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Mutex;

/// JSON-lines logger
#[derive(Debug)]
pub struct JsonLogger {
    level: Level,
    target_file: Mutex<Option<std::fs::File>>,
}

impl JsonLogger {
    fn new(level: Level, log_path: Option<String>) -> Self {
        let target_file = if let Some(path) = log_path {
            OpenOptions::new().create(true).append(true).open(path).ok()
        } else {
            None
        };

        JsonLogger {
            level,
            target_file: Mutex::new(target_file),
        }
    }

    /// Initialize logging from a level string
    ///
    /// `"debug"` installs a plain `env_logger`; `"json:debug"` (or bare
    /// `"json"`) installs the JSON-lines logger instead.
    pub fn init_with_level(level_str: &str) {
        let (use_json, actual_level) = if let Some(stripped) = level_str.strip_prefix("json:") {
            (true, stripped)
        } else if level_str == "json" {
            (true, "info")
        } else {
            (false, level_str)
        };

        if !use_json {
            env_logger::Builder::new()
                .filter_level(parse_level_filter(actual_level))
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "🥄 [{} {} {}] {}",
                        Local::now().format("%Y-%m-%dT%H:%M:%SZ"),
                        record.level(),
                        record.target(),
                        record.args()
                    )
                })
                .init();
            return;
        }

        let level = parse_level(actual_level);
        let logger = Box::new(JsonLogger::new(level, env::var("LADLE_LOG_PATH").ok()));

        if let Err(e) = log::set_boxed_logger(logger) {
            eprintln!("Failed to initialize JSON logger: {e}");
            return;
        }
        log::set_max_level(level.to_level_filter());
    }

    /// Initialize logging from `LADLE_LOG_LEVEL`, defaulting to `warn`
    pub fn init() {
        let log_level = env::var("LADLE_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        Self::init_with_level(&log_level);
    }
}

fn parse_level_filter(s: &str) -> LevelFilter {
    match s {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}

fn parse_level(s: &str) -> Level {
    match s {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warn,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let log_entry = json!({
            "@timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            "@level": record.level().to_string().to_lowercase(),
            "@message": record.args().to_string(),
            "@module": record.target(),
            "@pid": std::process::id(),
        });

        let json_string = format!(
            "{}\n",
            serde_json::to_string(&log_entry).unwrap_or_default()
        );

        if let Ok(mut file_guard) = self.target_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let _ = file.write_all(json_string.as_bytes());
                let _ = file.flush();
                return;
            }
        }
        let _ = io::stderr().write_all(json_string.as_bytes());
        let _ = io::stderr().flush();
    }

    fn flush(&self) {
        if let Ok(mut file_guard) = self.target_file.lock() {
            if let Some(ref mut file) = *file_guard {
                let _ = file.flush();
            }
        }
        let _ = io::stderr().flush();
    }
}
