//! Chunk - fixed-size activity tile over the cell grid
//!
//! Chunks do not own cells; the world's flat grid does. A chunk is the
//! bookkeeping that lets the engine skip cold regions: a small state
//! machine, the sub-rectangle touched this frame, a record of which
//! neighbor woke it, and an atomic claim flag for worker threads.

use std::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use glam::IVec2;

/// Side length of a chunk in cells
pub const CHUNK_SIZE: i32 = 64;

/// Activity state machine:
/// Inactive -> Active (woken) -> Dirty (cell written) -> Active (after
/// redraw) -> Sleeping (idle too long) -> Inactive (unloaded)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkState {
    #[default]
    Inactive,
    Active,
    Dirty,
    Sleeping,
}

bitflags! {
    /// Which of the 8 neighbors propagated activity into this chunk
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct NeighborMask: u8 {
        const NW = 1 << 0;
        const N  = 1 << 1;
        const NE = 1 << 2;
        const W  = 1 << 3;
        const E  = 1 << 4;
        const SW = 1 << 5;
        const S  = 1 << 6;
        const SE = 1 << 7;
    }
}

impl NeighborMask {
    /// Mask bit for the neighbor at offset (dx, dy), chunk coordinates
    pub fn from_offset(dx: i32, dy: i32) -> NeighborMask {
        match (dx, dy) {
            (-1, 1) => NeighborMask::NW,
            (0, 1) => NeighborMask::N,
            (1, 1) => NeighborMask::NE,
            (-1, 0) => NeighborMask::W,
            (1, 0) => NeighborMask::E,
            (-1, -1) => NeighborMask::SW,
            (0, -1) => NeighborMask::S,
            (1, -1) => NeighborMask::SE,
            _ => NeighborMask::empty(),
        }
    }
}

/// Bounding rect of cells touched this frame, in chunk-local coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl DirtyRect {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn expand(&mut self, x: i32, y: i32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// One activity tile
pub struct Chunk {
    /// Position in chunk coordinates (cell / CHUNK_SIZE)
    pub coord: IVec2,
    state: ChunkState,
    /// Sub-rectangle touched since the last redraw
    pub active_rect: Option<DirtyRect>,
    /// Who woke us; kept for boundary-effect accounting
    pub woken_by: NeighborMask,
    /// Consecutive frames with zero changed cells
    sleep_timer: u32,
    /// Frames spent Sleeping without re-activation
    idle_timer: u32,
    /// Cells changed during the frame in progress
    changed_cells: u32,
    /// Claim flag for parallel chunk updates
    lock: AtomicBool,
}

impl Chunk {
    pub fn new(coord: IVec2) -> Self {
        Self {
            coord,
            state: ChunkState::Inactive,
            active_rect: None,
            woken_by: NeighborMask::empty(),
            sleep_timer: 0,
            idle_timer: 0,
            changed_cells: 0,
            lock: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Scheduled for update this frame?
    pub fn is_awake(&self) -> bool {
        matches!(self.state, ChunkState::Active | ChunkState::Dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.state == ChunkState::Dirty
    }

    /// A cell inside this chunk was written. Always lands in Dirty and
    /// restarts the sleep countdown. Returns true when the chunk was
    /// previously not awake, so the caller can propagate activation.
    pub fn mark_dirty(&mut self, local_x: i32, local_y: i32) -> bool {
        let was_asleep = !self.is_awake();
        self.state = ChunkState::Dirty;
        self.sleep_timer = 0;
        self.idle_timer = 0;
        self.changed_cells += 1;
        match &mut self.active_rect {
            Some(rect) => rect.expand(local_x, local_y),
            None => self.active_rect = Some(DirtyRect::new(local_x, local_y)),
        }
        was_asleep
    }

    /// Activation propagated from a neighbor (or direct). Sleeping and
    /// Inactive chunks wake to Active; Dirty stays Dirty.
    pub fn activate(&mut self, from: NeighborMask) -> bool {
        self.woken_by |= from;
        self.idle_timer = 0;
        match self.state {
            ChunkState::Inactive | ChunkState::Sleeping => {
                self.state = ChunkState::Active;
                self.sleep_timer = 0;
                true
            }
            _ => false,
        }
    }

    /// Redraw finished: Dirty chunks are clean again but stay scheduled
    pub fn mark_redrawn(&mut self) {
        if self.state == ChunkState::Dirty {
            self.state = ChunkState::Active;
            self.active_rect = None;
        }
    }

    pub fn begin_frame(&mut self) {
        self.changed_cells = 0;
    }

    /// Frame bookkeeping: an awake chunk that changed nothing creeps
    /// toward Sleeping; a Sleeping chunk creeps toward Inactive.
    pub fn end_frame(&mut self, sleep_after: u32, unload_after: u32) {
        match self.state {
            ChunkState::Active | ChunkState::Dirty => {
                if self.changed_cells == 0 {
                    self.sleep_timer += 1;
                    if self.sleep_timer >= sleep_after {
                        self.state = ChunkState::Sleeping;
                        self.woken_by = NeighborMask::empty();
                    }
                } else {
                    self.sleep_timer = 0;
                }
            }
            ChunkState::Sleeping => {
                self.idle_timer += 1;
                if self.idle_timer >= unload_after {
                    self.state = ChunkState::Inactive;
                }
            }
            ChunkState::Inactive => {}
        }
    }

    pub fn changed_cells(&self) -> u32 {
        self.changed_cells
    }

    /// Claim this chunk for a worker thread. Returns false if another
    /// worker holds it.
    pub fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    pub fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_wakes_and_dirties() {
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        assert_eq!(chunk.state(), ChunkState::Inactive);

        let was_asleep = chunk.mark_dirty(3, 4);
        assert!(was_asleep);
        assert_eq!(chunk.state(), ChunkState::Dirty);
        assert_eq!(chunk.active_rect, Some(DirtyRect::new(3, 4)));

        // Second write in the same frame doesn't re-propagate
        assert!(!chunk.mark_dirty(10, 2));
        let rect = chunk.active_rect.unwrap();
        assert_eq!((rect.min_x, rect.min_y, rect.max_x, rect.max_y), (3, 2, 10, 4));
    }

    #[test]
    fn redraw_returns_dirty_to_active() {
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        chunk.mark_dirty(1, 1);
        chunk.mark_redrawn();
        assert_eq!(chunk.state(), ChunkState::Active);
        assert!(chunk.active_rect.is_none());
    }

    #[test]
    fn idle_chunk_sleeps_then_unloads() {
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        chunk.mark_dirty(0, 0);
        chunk.mark_redrawn();

        for _ in 0..3 {
            chunk.begin_frame();
            chunk.end_frame(3, 2);
        }
        assert_eq!(chunk.state(), ChunkState::Sleeping);

        for _ in 0..2 {
            chunk.begin_frame();
            chunk.end_frame(3, 2);
        }
        assert_eq!(chunk.state(), ChunkState::Inactive);
    }

    #[test]
    fn activity_resets_sleep_countdown() {
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        chunk.mark_dirty(0, 0);
        chunk.mark_redrawn();

        chunk.begin_frame();
        chunk.end_frame(3, 2);
        chunk.begin_frame();
        chunk.mark_dirty(1, 0);
        chunk.end_frame(3, 2);
        // Countdown restarted by the write
        chunk.begin_frame();
        chunk.end_frame(3, 2);
        assert_ne!(chunk.state(), ChunkState::Sleeping);
    }

    #[test]
    fn sleeping_chunk_wakes_on_activation() {
        let mut chunk = Chunk::new(IVec2::new(0, 0));
        chunk.mark_dirty(0, 0);
        chunk.mark_redrawn();
        for _ in 0..5 {
            chunk.begin_frame();
            chunk.end_frame(3, 100);
        }
        assert_eq!(chunk.state(), ChunkState::Sleeping);

        assert!(chunk.activate(NeighborMask::N));
        assert_eq!(chunk.state(), ChunkState::Active);
        assert!(chunk.woken_by.contains(NeighborMask::N));
    }

    #[test]
    fn try_lock_is_exclusive() {
        let chunk = Chunk::new(IVec2::new(0, 0));
        assert!(chunk.try_lock());
        assert!(!chunk.try_lock());
        chunk.unlock();
        assert!(chunk.try_lock());
    }

    #[test]
    fn neighbor_mask_covers_all_offsets() {
        let mut all = NeighborMask::empty();
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let mask = NeighborMask::from_offset(dx, dy);
                assert!(!mask.is_empty());
                all |= mask;
            }
        }
        assert_eq!(all, NeighborMask::all());
    }
}
