use std::collections::TryReserveError;

use thiserror::Error;

use crate::world::PollSummary;

pub mod job_queue;
pub mod scratch;
pub mod tessellator;
pub mod vertex;
pub mod worker;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Failed to grow the {region} region to {requested} bytes")]
    Allocation {
        region: &'static str,
        requested: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("The {region} region needs {requested} bytes, over its limit of {limit}")]
    LimitExceeded {
        region: &'static str,
        requested: usize,
        limit: usize,
    },
}

#[derive(Debug, Error)]
pub enum TessellationError {
    /// `summary` covers the results that were still uploaded in the same poll.
    #[error("Mesher worker {worker} failed")]
    WorkerFailed {
        worker: usize,
        summary: PollSummary,
        #[source]
        source: MeshError,
    },
}
