//! World ownership - grid buffers, chunk tracking, frame pipeline

pub mod chunk;
mod chunk_manager;
pub mod framebuffer;
mod grid;
mod rng;
mod stats;
#[allow(clippy::module_inception)]
mod world;

pub use chunk::{Chunk, ChunkState, DirtyRect, NeighborMask, CHUNK_SIZE};
pub use chunk_manager::ChunkManager;
pub use grid::{BufferState, CellGrid};
pub use rng::WorldRng;
pub use stats::{FrameStats, NoopStats, SimStats};
pub use world::SimulationWorld;
