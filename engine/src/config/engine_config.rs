use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config::config_manager::Config,
    limits::{DEFAULT_IDLE_WAIT_MS, DEFAULT_JOB_QUEUE_CAPACITY, DEFAULT_MESHER_WORKERS},
    mesher::scratch::{estimate_light_capacity, estimate_terrain_capacity},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub mesher_workers: usize,
    pub job_queue_capacity: usize,
    /// Bytes reserved up front for each worker's vertex region
    pub initial_terrain_capacity: usize,
    /// Bytes reserved up front for each worker's light region
    pub initial_light_capacity: usize,
    /// How long an idle worker sleeps before checking the stop flag again
    pub idle_wait_ms: u64,
    /// Largest mesh, in bytes per scratch region, a worker may build. A worker
    /// that hits it fails. Unlimited by default.
    pub scratch_limit_bytes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            mesher_workers: DEFAULT_MESHER_WORKERS,
            job_queue_capacity: DEFAULT_JOB_QUEUE_CAPACITY,
            initial_terrain_capacity: estimate_terrain_capacity(),
            initial_light_capacity: estimate_light_capacity(),
            idle_wait_ms: DEFAULT_IDLE_WAIT_MS,
            scratch_limit_bytes: None,
        }
    }
}

impl EngineConfig {
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms.max(1))
    }
}

impl Config for EngineConfig {
    fn get_path() -> &'static str {
        "engine.ron"
    }

    fn is_valid(&self) -> bool {
        self.mesher_workers > 0
            && self.job_queue_capacity > 0
            && self.scratch_limit_bytes != Some(0)
    }
}
