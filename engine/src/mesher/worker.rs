use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::{
    assets::MeshingResources,
    config::engine_config::EngineConfig,
    mesher::{
        MeshError,
        job_queue::{JobQueue, MeshJob},
        scratch::ScratchBuffer,
        tessellator::Tessellator,
        vertex::TerrainVertex,
    },
    voxels::{chunk::ChunkHandle, chunk_map::ChunkMap, coord::ChunkPos},
    world_stats::PipelineCounters,
};

/// A finished mesh on its way to the main thread. Carries the worker's scratch
/// buffer, which has to be handed back with `MesherPool::return_buffer`.
pub struct MeshResult {
    pub chunk: ChunkHandle,
    pub pos: ChunkPos,
    pub buffer: ScratchBuffer,
    pub vertex_bytes: usize,
}

impl MeshResult {
    pub fn vertex_count(&self) -> u32 {
        (self.vertex_bytes / TerrainVertex::SIZE) as u32
    }

    pub fn terrain(&self) -> &[u8] {
        &self.buffer.terrain.as_slice()[..self.vertex_bytes]
    }

    pub fn light(&self) -> &[u8] {
        self.buffer.light.as_slice()
    }
}

// Used by mesher workers to communicate back to the main thread
pub enum WorkerEvent {
    Meshed(MeshResult),
    Failed { worker: usize, error: MeshError },
}

struct PoolShared {
    queue: JobQueue,
    stop: AtomicBool,
    chunks: Arc<ChunkMap>,
    counters: Arc<PipelineCounters>,
    idle_wait: Duration,
}

/// Fixed set of long-lived mesher threads pulling from one shared job queue.
pub struct MesherPool {
    shared: Arc<PoolShared>,
    event_receiver: Receiver<WorkerEvent>,
    // One return channel per worker, indexed by worker id
    buffer_senders: Vec<Sender<ScratchBuffer>>,
    worker_handles: Vec<JoinHandle<()>>,
}

impl MesherPool {
    pub fn start(
        config: &EngineConfig,
        chunks: Arc<ChunkMap>,
        resources: Arc<MeshingResources>,
        counters: Arc<PipelineCounters>,
    ) -> anyhow::Result<Self> {
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();

        let shared = Arc::new(PoolShared {
            queue: JobQueue::new(config.job_queue_capacity),
            stop: AtomicBool::new(false),
            chunks,
            counters,
            idle_wait: config.idle_wait(),
        });

        let mut pool = MesherPool {
            shared: shared.clone(),
            event_receiver,
            buffer_senders: Vec::with_capacity(config.mesher_workers),
            worker_handles: Vec::with_capacity(config.mesher_workers),
        };

        for id in 0..config.mesher_workers {
            // Capacity 1: a worker's buffer is either with the worker or in flight
            let (buffer_sender, buffer_receiver) = crossbeam_channel::bounded(1);
            let buffer = ScratchBuffer::new(
                id,
                config.initial_terrain_capacity,
                config.initial_light_capacity,
            )
            .with_limit(config.scratch_limit_bytes);
            PipelineCounters::add(
                &shared.counters.scratch_bytes_reserved,
                buffer.approximate_size() as u64,
            );

            let worker = MesherWorker {
                id,
                shared: shared.clone(),
                tessellator: Tessellator::new(resources.clone()),
                buffer: Some(buffer),
                buffer_receiver,
                event_sender: event_sender.clone(),
            };

            // If this fails, dropping the pool stops the workers that did start
            let handle = std::thread::Builder::new()
                .name(format!("Mesher worker {}", id))
                .spawn(move || worker.run())
                .with_context(|| format!("Failed to spawn mesher worker {}", id))?;

            pool.buffer_senders.push(buffer_sender);
            pool.worker_handles.push(handle);
        }

        log::info!(
            "Started {} mesher workers, job queue capacity {}",
            config.mesher_workers,
            config.job_queue_capacity
        );

        Ok(pool)
    }

    pub fn queue(&self) -> &JobQueue {
        &self.shared.queue
    }

    pub fn is_running(&self) -> bool {
        !self.shared.stop.load(Ordering::Acquire)
    }

    pub fn try_recv_event(&self) -> Option<WorkerEvent> {
        match self.event_receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Sends a released buffer back to the worker that owns it.
    pub fn return_buffer(&self, buffer: ScratchBuffer) {
        let worker = buffer.worker();
        let Some(sender) = self.buffer_senders.get(worker) else {
            // Pool is shutting down, the buffer is no longer needed
            return;
        };
        if sender.try_send(buffer).is_err() {
            log::debug!("Mesher worker {} has exited, dropping its buffer", worker);
        }
    }

    /// Stops all workers and waits for them to exit. Pending results are thrown away
    /// and their chunks go back to dirty.
    pub fn shutdown(&mut self) {
        if self.shared.stop.swap(true, Ordering::AcqRel) {
            return;
        }

        // Hand buffers back so workers waiting for one wake up and see the stop flag
        self.drain_events();
        // Any worker still waiting on its return channel now sees it disconnect
        self.buffer_senders.clear();

        for handle in self.worker_handles.drain(..) {
            let name = handle.thread().name().unwrap_or("Mesher worker").to_string();
            if handle.join().is_err() {
                log::error!("{} panicked", name);
            }
        }

        // Results published between the first drain and the join
        self.drain_events();

        let dropped_jobs = self.shared.queue.clear(|job| job.chunk.cancel_enqueue());

        log::info!(
            "Mesher workers stopped, {} queued jobs dropped",
            dropped_jobs
        );
    }

    fn drain_events(&self) {
        while let Some(event) = self.try_recv_event() {
            if let WorkerEvent::Meshed(mut result) = event {
                result.chunk.cancel_upload();
                result.buffer.release();
                self.return_buffer(result.buffer);
            }
        }
    }
}

impl Drop for MesherPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct MesherWorker {
    id: usize,
    shared: Arc<PoolShared>,
    tessellator: Tessellator,
    buffer: Option<ScratchBuffer>,
    buffer_receiver: Receiver<ScratchBuffer>,
    event_sender: Sender<WorkerEvent>,
}

impl MesherWorker {
    fn run(mut self) {
        loop {
            let buffer = match self.buffer.take() {
                Some(buffer) => buffer,
                // The main thread still holds our last result
                None => match self.buffer_receiver.recv() {
                    Ok(buffer) => buffer,
                    Err(_) => break,
                },
            };

            let Some(job) = self.shared.queue.pop(&self.shared.stop, self.shared.idle_wait)
            else {
                break;
            };

            match self.process_job(job, buffer) {
                Ok(Some(buffer)) => self.buffer = Some(buffer),
                Ok(None) => {}
                Err(()) => break,
            }
        }

        log::info!("Mesher worker {} exiting", self.id);
    }

    /// Returns the buffer if it stays with the worker, `Ok(None)` if it was sent
    /// to the main thread and `Err` if the worker should exit.
    fn process_job(
        &mut self,
        job: MeshJob,
        mut buffer: ScratchBuffer,
    ) -> Result<Option<ScratchBuffer>, ()> {
        let MeshJob { chunk, pos } = job;

        if !chunk.begin_meshing() {
            log::debug!("Skipping stale mesh job for chunk {:?}", pos);
            return Ok(Some(buffer));
        }

        buffer.claim();
        let size_before = buffer.approximate_size();
        let tessellated = self
            .tessellator
            .tessellate(&chunk, &*self.shared.chunks, &mut buffer);
        PipelineCounters::add(
            &self.shared.counters.scratch_bytes_reserved,
            buffer.approximate_size().saturating_sub(size_before) as u64,
        );

        match tessellated {
            Ok(vertex_bytes) => {
                chunk.finish_meshing();
                buffer.publish();
                PipelineCounters::increment(&self.shared.counters.meshes_built);
                log::debug!(
                    "Meshed chunk {:?}: {} vertices",
                    pos,
                    vertex_bytes / TerrainVertex::SIZE
                );

                let result = MeshResult {
                    chunk,
                    pos,
                    buffer,
                    vertex_bytes,
                };
                if self.event_sender.send(WorkerEvent::Meshed(result)).is_err() {
                    return Err(());
                }
                Ok(None)
            }
            Err(error) => {
                log::error!(
                    "Mesher worker {} failed on chunk {:?}: {}",
                    self.id,
                    pos,
                    error
                );
                buffer.abandon();
                chunk.abort_meshing();
                let _ = self.event_sender.send(WorkerEvent::Failed {
                    worker: self.id,
                    error,
                });
                Err(())
            }
        }
    }
}
