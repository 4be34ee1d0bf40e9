//! Chunk lifecycle management - lazy creation, activation propagation,
//! and the periodic unload sweep

use ahash::AHashMap;
use glam::IVec2;

use super::chunk::{Chunk, ChunkState, NeighborMask, CHUNK_SIZE};

/// Owns the activity tiles covering the world grid.
///
/// Chunks are created lazily the first time anything touches their area
/// and destroyed by `unload_inactive_chunks` once they have been
/// Inactive past the configured delay. Requests outside the world
/// simply create tiles whose cell loops never run; no errors are raised.
pub struct ChunkManager {
    chunks: AHashMap<IVec2, Chunk>,
    sleep_after: u32,
    unload_after: u32,
}

impl ChunkManager {
    pub fn new(sleep_after: u32, unload_after: u32) -> Self {
        Self {
            chunks: AHashMap::new(),
            sleep_after,
            unload_after,
        }
    }

    /// Chunk coordinate + local offset for a cell position
    pub fn chunk_coords(x: i32, y: i32) -> (IVec2, i32, i32) {
        let cx = x.div_euclid(CHUNK_SIZE);
        let cy = y.div_euclid(CHUNK_SIZE);
        let lx = x.rem_euclid(CHUNK_SIZE);
        let ly = y.rem_euclid(CHUNK_SIZE);
        (IVec2::new(cx, cy), lx, ly)
    }

    pub fn get_or_create(&mut self, coord: IVec2) -> &mut Chunk {
        self.chunks.entry(coord).or_insert_with(|| Chunk::new(coord))
    }

    pub fn get(&self, coord: IVec2) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn get_mut(&mut self, coord: IVec2) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// A cell was written: dirty its chunk, and if that chunk was not
    /// already awake, propagate activation to all 8 neighbors so
    /// boundary effects are never missed.
    pub fn mark_cell_dirty(&mut self, x: i32, y: i32) {
        let (coord, lx, ly) = Self::chunk_coords(x, y);
        let woke = self.get_or_create(coord).mark_dirty(lx, ly);
        if woke {
            self.activate_neighbors(coord);
        }
    }

    /// Wake a chunk directly (Active, not Dirty) and its 8 neighbors
    pub fn activate(&mut self, coord: IVec2) {
        self.get_or_create(coord).activate(NeighborMask::empty());
        self.activate_neighbors(coord);
    }

    fn activate_neighbors(&mut self, coord: IVec2) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let neighbor = IVec2::new(coord.x + dx, coord.y + dy);
                // The neighbor records which side woke it: the offset
                // from its own point of view is the inverse
                let from = NeighborMask::from_offset(-dx, -dy);
                self.get_or_create(neighbor).activate(from);
            }
        }
    }

    /// Coordinates of awake chunks, sorted bottom row first then left to
    /// right, so sweeps are deterministic
    pub fn awake_coords_sorted(&self) -> Vec<IVec2> {
        let mut coords: Vec<IVec2> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_awake())
            .map(|(&coord, _)| coord)
            .collect();
        coords.sort_by_key(|c| (c.y, c.x));
        coords
    }

    /// Coordinates of chunks needing redraw
    pub fn dirty_coords_sorted(&self) -> Vec<IVec2> {
        let mut coords: Vec<IVec2> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.is_dirty())
            .map(|(&coord, _)| coord)
            .collect();
        coords.sort_by_key(|c| (c.y, c.x));
        coords
    }

    /// Chunks overlapping a cell-space rectangle
    pub fn chunks_in_region(&self, min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Vec<IVec2> {
        let (min_chunk, _, _) = Self::chunk_coords(min_x, min_y);
        let (max_chunk, _, _) = Self::chunk_coords(max_x, max_y);
        let mut coords = Vec::new();
        for cy in min_chunk.y..=max_chunk.y {
            for cx in min_chunk.x..=max_chunk.x {
                let coord = IVec2::new(cx, cy);
                if self.chunks.contains_key(&coord) {
                    coords.push(coord);
                }
            }
        }
        coords
    }

    pub fn begin_frame(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.begin_frame();
        }
    }

    pub fn end_frame(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.end_frame(self.sleep_after, self.unload_after);
        }
    }

    /// Destroy chunks that have gone fully Inactive. Returns how many
    /// were unloaded.
    pub fn unload_inactive_chunks(&mut self) -> usize {
        let before = self.chunks.len();
        self.chunks
            .retain(|_, chunk| chunk.state() != ChunkState::Inactive);
        let unloaded = before - self.chunks.len();
        if unloaded > 0 {
            log::debug!("unloaded {unloaded} inactive chunks, {} remain", self.chunks.len());
        }
        unloaded
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}
