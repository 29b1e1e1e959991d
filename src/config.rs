//! Pipeline configuration parameters
//!
//! All tunable parameters for one debounce pipeline. Values can be loaded
//! from JSON (e.g. a config file handed to the demo binary) and are
//! validated before a pipeline is built from them.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source id used when none is configured (GPIO1_28 / P9_12).
pub const DEFAULT_SOURCE_ID: u32 = 60;

/// Default debounce window.
pub const DEFAULT_WINDOW_MS: u32 = 50;

/// Longest debounce window accepted by [`PipelineConfig::validate`].
pub const MAX_WINDOW_MS: u32 = 10_000;

/// Smallest task stack accepted by [`PipelineConfig::validate`] (KiB).
pub const MIN_STACK_KB: usize = 4;

/// Largest task stack accepted by [`PipelineConfig::validate`] (KiB).
pub const MAX_STACK_KB: usize = 8 * 1024;

/// Core pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Identifier of the monitored line. Unique among live pipelines.
    pub source_id: u32,
    /// Fixed, non-retriggering debounce window (milliseconds)
    pub window_ms: u32,
    /// Stack size of the deferred worker thread (KiB)
    pub worker_stack_kb: usize,
    /// Stack size of the debounce timer thread (KiB)
    pub timer_stack_kb: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_id: DEFAULT_SOURCE_ID,
            window_ms: DEFAULT_WINDOW_MS,
            worker_stack_kb: 64,
            timer_stack_kb: 16,
        }
    }
}

impl PipelineConfig {
    /// Configuration for `source_id` with every other field defaulted.
    pub fn for_source(source_id: u32) -> Self {
        Self {
            source_id,
            ..Self::default()
        }
    }

    /// Builder-style override of the debounce window.
    pub fn with_window_ms(mut self, window_ms: u32) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            warn!("PipelineConfig: JSON parse error {}", e);
            Error::Config("malformed JSON")
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(Error::Config("window_ms must be non-zero"));
        }
        if self.window_ms > MAX_WINDOW_MS {
            return Err(Error::Config("window_ms exceeds 10s"));
        }
        for stack_kb in [self.worker_stack_kb, self.timer_stack_kb] {
            if stack_kb < MIN_STACK_KB {
                return Err(Error::Config("task stacks must be at least 4 KiB"));
            }
            if stack_kb > MAX_STACK_KB {
                return Err(Error::Config("task stacks must be at most 8 MiB"));
            }
        }
        Ok(())
    }

    /// Window length in microseconds, the unit of all pipeline timestamps.
    pub fn window_us(&self) -> u64 {
        u64::from(self.window_ms) * 1_000
    }
}
