use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_MAX_WORKERS: usize = 4;

const MAX_BATCH_SIZE: usize = 256;
const MAX_WORKERS: usize = 32;

/// Batch partitioning and embedding fan-out for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    /// Fragments per embedding request
    pub batch_size: usize,
    /// Concurrent embedding requests
    pub max_workers: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl BatchLimits {
    /// Defaults overridden by `MANUALRAG_BATCH_SIZE` and `MANUALRAG_MAX_WORKERS`.
    #[must_use]
    pub fn from_env() -> Self {
        let batch = std::env::var("MANUALRAG_BATCH_SIZE").ok();
        let workers = std::env::var("MANUALRAG_MAX_WORKERS").ok();
        Self {
            batch_size: parse_limit(batch.as_deref(), DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE),
            max_workers: parse_limit(workers.as_deref(), DEFAULT_MAX_WORKERS, MAX_WORKERS),
        }
    }

    /// Clamp both values into their supported ranges.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            batch_size: self.batch_size.clamp(1, MAX_BATCH_SIZE),
            max_workers: self.max_workers.clamp(1, MAX_WORKERS),
        }
    }
}

fn parse_limit(raw: Option<&str>, default_value: usize, max: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, max)
}
