//! Logger module
//!
//! Observability is an injected capability: the controller receives a
//! `Logger` at construction instead of reaching for process-wide state, so
//! fault detail recorded for operators is assertable in tests and the core
//! carries no implicit globals.

use crate::config::LoggingConfig;
use std::sync::Arc;

/// Logging capability handed to controllers at construction.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Timestamp prefix for stdout log lines.
fn time_for_log() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Stdout/stderr logger.
///
/// Info lines go to stdout and can be silenced with `logging.level =
/// "error"`; error lines always go to stderr.
pub struct StdoutLogger {
    info_enabled: bool,
}

impl StdoutLogger {
    pub fn new(config: &LoggingConfig) -> Arc<Self> {
        Arc::new(Self {
            info_enabled: config.level != "error",
        })
    }
}

impl Logger for StdoutLogger {
    fn info(&self, message: &str) {
        if self.info_enabled {
            println!("[{}] {message}", time_for_log());
        }
    }

    fn error(&self, message: &str) {
        eprintln!("[{}] [ERROR] {message}", time_for_log());
    }
}

#[cfg(test)]
pub mod memory {
    use super::Logger;
    use std::sync::{Arc, Mutex};

    /// Captures log lines for assertions.
    #[derive(Default)]
    pub struct MemoryLogger {
        info_lines: Mutex<Vec<String>>,
        error_lines: Mutex<Vec<String>>,
    }

    impl MemoryLogger {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn infos(&self) -> Vec<String> {
            self.info_lines.lock().unwrap().clone()
        }

        pub fn errors(&self) -> Vec<String> {
            self.error_lines.lock().unwrap().clone()
        }
    }

    impl Logger for MemoryLogger {
        fn info(&self, message: &str) {
            self.info_lines.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.error_lines.lock().unwrap().push(message.to_string());
        }
    }
}
