//! Trainer configuration

use crate::data::loader::DEFAULT_MAX_INPUT_BYTES;
use serde::{Deserialize, Serialize};

/// Runtime settings for a [`Trainer`](super::Trainer).
///
/// `Default` reads overrides from the environment:
/// `TABFIT_INFER_SCHEMA_LENGTH`, `TABFIT_MAX_INPUT_BYTES` and `TABFIT_THREADS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Rows scanned for CSV schema inference; `None` scans everything
    pub infer_schema_length: Option<usize>,
    /// Datasets larger than this are rejected before parsing
    pub max_input_bytes: usize,
    /// Size of the worker pool used for fitting; `None` uses the global pool
    pub threads: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            infer_schema_length: std::env::var("TABFIT_INFER_SCHEMA_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok()),
            max_input_bytes: std::env::var("TABFIT_MAX_INPUT_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_INPUT_BYTES),
            threads: std::env::var("TABFIT_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0),
        }
    }
}

impl TrainerConfig {
    /// Settings with no environment overrides applied
    pub fn builtin() -> Self {
        Self {
            infer_schema_length: None,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            threads: None,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let config = TrainerConfig::builtin();
        assert_eq!(config.infer_schema_length, None);
        assert_eq!(config.max_input_bytes, 100 * 1024 * 1024);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_builder() {
        let config = TrainerConfig::builtin()
            .with_infer_schema_length(Some(500))
            .with_max_input_bytes(1024)
            .with_threads(Some(2));
        assert_eq!(config.infer_schema_length, Some(500));
        assert_eq!(config.max_input_bytes, 1024);
        assert_eq!(config.threads, Some(2));
    }
}
