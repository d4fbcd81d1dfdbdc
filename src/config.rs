// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Configuration parameters affecting the behaviour of this library.
//!

use dotenvy::var;
use std::sync::OnceLock;

const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_WORKER_MEM_CAP_MB: usize = 500;

/// Tunables read once from the environment.
#[derive(Debug)]
pub struct Config {
    engine_timeout_secs: u64,
    worker_mem_cap_mb: usize,
}

static CONFIG: OnceLock<Config> = OnceLock::new();
/// This library configuration Singleton.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

impl Default for Config {
    fn default() -> Self {
        let engine_timeout_secs = var("ENGINE_TIMEOUT_SECS")
            .ok()
            .and_then(|x| x.parse().ok())
            .unwrap_or(DEFAULT_ENGINE_TIMEOUT_SECS);
        let worker_mem_cap_mb = var("WORKER_MEM_CAP_MB")
            .ok()
            .and_then(|x| x.parse().ok())
            .unwrap_or(DEFAULT_WORKER_MEM_CAP_MB);

        Self {
            engine_timeout_secs,
            worker_mem_cap_mb,
        }
    }
}

impl Config {
    /// How long to wait for the embedded SQL engine to bootstrap before
    /// failing the load.
    pub fn engine_timeout_secs(&self) -> u64 {
        self.engine_timeout_secs
    }

    /// Estimated-transfer-size ceiling (in MB) above which large Parquet
    /// materialization stays on the calling task instead of a worker.
    pub fn worker_mem_cap_mb(&self) -> usize {
        self.worker_mem_cap_mb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = config();
        assert_eq!(c.engine_timeout_secs(), DEFAULT_ENGINE_TIMEOUT_SECS);
        assert_eq!(c.worker_mem_cap_mb(), DEFAULT_WORKER_MEM_CAP_MB);
    }
}
