use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FrameQueueError, Result};
use crate::shared::constants;
use crate::utils::logger;

/// Queue sizing and default timeouts.
///
/// Read from a `key = value` file:
///
/// ```text
/// # frame-queue.config
/// capacity = 60
/// push-timeout-ms = 5
/// pop-timeout-ms = 1000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub capacity: usize,
    pub push_timeout_ms: u64,
    pub pop_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: constants::DEFAULT_CAPACITY,
            push_timeout_ms: constants::DEFAULT_PUSH_TIMEOUT_MS,
            pop_timeout_ms: constants::DEFAULT_POP_TIMEOUT_MS,
        }
    }
}

impl QueueConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }

    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(FrameQueueError::Configuration(
                "capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            logger::debug(&format!(
                "Config file {} not found, using defaults",
                path.display()
            ));
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(FrameQueueError::Configuration(format!(
                    "line {}: expected 'key = value', got '{}'",
                    line_no + 1,
                    trimmed
                )));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "capacity" => {
                    let capacity = parse_number(key, value)?;
                    if capacity <= 0 {
                        return Err(FrameQueueError::Configuration(format!(
                            "capacity must be greater than zero, got {}",
                            capacity
                        )));
                    }
                    config.capacity = capacity as usize;
                }
                "push-timeout-ms" => config.push_timeout_ms = parse_timeout(key, value)?,
                "pop-timeout-ms" => config.pop_timeout_ms = parse_timeout(key, value)?,
                other => {
                    logger::warn(&format!("Ignoring unknown config key '{}'", other));
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<i64> {
    value.parse::<i64>().map_err(|_| {
        FrameQueueError::Configuration(format!("{} must be an integer, got '{}'", key, value))
    })
}

fn parse_timeout(key: &str, value: &str) -> Result<u64> {
    let ms = parse_number(key, value)?;
    if ms < 0 {
        return Err(FrameQueueError::Configuration(format!(
            "{} must not be negative, got {}",
            key, ms
        )));
    }
    Ok(ms as u64)
}
