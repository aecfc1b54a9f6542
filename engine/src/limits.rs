pub const DEFAULT_MESHER_WORKERS: usize = 4;
pub const DEFAULT_JOB_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_IDLE_WAIT_MS: u64 = 5;
