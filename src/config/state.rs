// Runtime state shared across connection tasks

use super::types::Config;
use std::time::Instant;

/// Application state: the loaded configuration plus process start time.
pub struct AppState {
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            started_at: Instant::now(),
        }
    }
}
