pub mod block;
pub mod chunk;
pub mod chunk_map;
pub mod coord;
pub mod face;
