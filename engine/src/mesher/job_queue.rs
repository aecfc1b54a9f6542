use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crossbeam::queue::ArrayQueue;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::voxels::{chunk::ChunkHandle, coord::ChunkPos};

pub struct MeshJob {
    pub chunk: ChunkHandle,
    pub pos: ChunkPos,
}

impl std::fmt::Debug for MeshJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshJob").field("pos", &self.pos).finish()
    }
}

/// The queue was full. Hands the job back to the caller.
#[derive(Debug, Error)]
#[error("Job queue is full ({capacity} jobs)")]
pub struct QueueFull {
    pub job: MeshJob,
    pub capacity: usize,
}

/// Fixed capacity multi-producer multi-consumer queue of meshing jobs.
pub struct JobQueue {
    jobs: ArrayQueue<MeshJob>,
    job_available_sender: Sender<()>,
    job_available_receiver: Receiver<()>,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        // Capacity 1: coalesce multiple pushes into a single wakeup.
        let (job_available_sender, job_available_receiver) = crossbeam_channel::bounded(1);

        JobQueue {
            jobs: ArrayQueue::new(capacity),
            job_available_sender,
            job_available_receiver,
        }
    }

    pub fn push(&self, job: MeshJob) -> Result<(), QueueFull> {
        self.jobs.push(job).map_err(|job| QueueFull {
            job,
            capacity: self.jobs.capacity(),
        })?;
        let _ = self.job_available_sender.try_send(());
        Ok(())
    }

    pub fn try_pop(&self) -> Option<MeshJob> {
        self.jobs.pop()
    }

    /// Blocks until a job is available or `stop` is raised. Sleeps on the wakeup
    /// signal for at most `idle_wait` at a time, so the stop flag is noticed promptly.
    pub fn pop(&self, stop: &AtomicBool, idle_wait: Duration) -> Option<MeshJob> {
        loop {
            if stop.load(Ordering::Acquire) {
                return None;
            }

            if let Some(job) = self.try_pop() {
                // Several workers may be waiting on a single coalesced wakeup
                if !self.jobs.is_empty() {
                    let _ = self.job_available_sender.try_send(());
                }
                return Some(job);
            }

            match self.job_available_receiver.recv_timeout(idle_wait) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => continue,
                // Can't happen while we hold the sender, but don't spin if it does
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Drains the queue, handing every removed job to `on_removed`. Returns how many there were.
    pub fn clear(&self, mut on_removed: impl FnMut(MeshJob)) -> usize {
        let mut removed = 0usize;
        while let Some(job) = self.try_pop() {
            on_removed(job);
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.jobs.capacity()
    }
}
