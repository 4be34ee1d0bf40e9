//! Cellular automata core - per-material movement rules and the
//! checkerboard sweep that schedules them
//!
//! The sweep is the engine's central correctness mechanism. Each frame
//! runs two phases over cell parity: all cells where (x + y) is even are
//! processed first, scanned bottom-to-top and left-to-right, then all odd
//! cells. Orthogonally adjacent cells always have opposite parity, so no
//! two cells processed in the same phase can contest each other's
//! neighbor slots that way; diagonal contention within a phase is caught
//! by re-checking the next grid immediately before every commit. Every
//! rule reads the current grid and writes only the next grid.

pub mod chemistry;
mod displacement;
mod fire;
mod gas;
mod liquid;
mod powder;

use std::collections::BTreeMap;

use glam::IVec2;

use crate::config::SimulationConfig;
use crate::simulation::{Behavior, Cell, MaterialRegistry};
use crate::world::chunk::CHUNK_SIZE;
use crate::world::{ChunkManager, SimStats, WorldRng};

pub use chemistry::ChemistrySystem;
pub use displacement::can_displace;

/// Borrowed window onto the world's double buffer for one pass.
///
/// The world owns the grids; rule code only ever sees this accessor, so
/// there is exactly one mutable owner of cell memory at any time. All
/// reads come from the current buffer, all writes land in the next
/// buffer, and every write marks the covering chunk dirty.
pub struct GridView<'a> {
    width: i32,
    height: i32,
    current: &'a [Cell],
    next: &'a mut [Cell],
    chunks: &'a mut ChunkManager,
}

impl<'a> GridView<'a> {
    pub fn new(
        width: i32,
        height: i32,
        current: &'a [Cell],
        next: &'a mut [Cell],
        chunks: &'a mut ChunkManager,
    ) -> Self {
        Self {
            width,
            height,
            current,
            next,
            chunks,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    /// Cell in the current grid; out of bounds reads as empty
    #[inline]
    pub fn cell(&self, x: i32, y: i32) -> Cell {
        if !self.in_bounds(x, y) {
            return Cell::EMPTY;
        }
        self.current[self.index(x, y)]
    }

    /// Cell in the next grid; out of bounds reads as empty
    #[inline]
    pub fn next_cell(&self, x: i32, y: i32) -> Cell {
        if !self.in_bounds(x, y) {
            return Cell::EMPTY;
        }
        self.next[self.index(x, y)]
    }

    /// True while nothing has committed to this slot this frame
    #[inline]
    pub fn untouched(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        self.next[idx] == self.current[idx]
    }

    /// Empty in BOTH grids: the only slots a plain move may claim
    #[inline]
    pub fn is_open(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        self.current[idx].is_empty() && self.next[idx].is_empty()
    }

    /// Unconditional write into the next grid (chemistry, explosions,
    /// decay). Marks the covering chunk dirty when the value changes.
    pub fn write_next(&mut self, x: i32, y: i32, cell: Cell) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        if self.next[idx] == cell {
            return;
        }
        self.next[idx] = cell;
        self.chunks.mark_cell_dirty(x, y);
    }

    /// Write only the temperature field of the next grid. Deliberately
    /// does not wake chunks; converging diffusion must let regions sleep.
    pub fn set_next_temperature(&mut self, x: i32, y: i32, temperature: f32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.next[idx].temperature = temperature;
    }

    /// Move `mover` into an open destination, vacating the source.
    /// Fails if the destination is occupied in either grid or the source
    /// was already touched this frame.
    pub fn commit_move(&mut self, fx: i32, fy: i32, tx: i32, ty: i32, mover: Cell) -> bool {
        if !self.is_open(tx, ty) || !self.untouched(fx, fy) {
            return false;
        }
        let vacated = Cell::vacated(self.cell(fx, fy).temperature);
        self.write_next(tx, ty, mover);
        self.write_next(fx, fy, vacated);
        true
    }

    /// Swap `mover` with the destination's current occupant. Both slots
    /// must be untouched this frame, which is what prevents two sources
    /// from colliding on one destination inside a phase.
    pub fn commit_swap(&mut self, fx: i32, fy: i32, tx: i32, ty: i32, mover: Cell) -> bool {
        if !self.untouched(tx, ty) || !self.untouched(fx, fy) {
            return false;
        }
        let occupant = self.cell(tx, ty);
        self.write_next(tx, ty, mover);
        self.write_next(fx, fy, occupant);
        true
    }

    /// Coordinates of chunks scheduled for update, sorted bottom-up then
    /// left-to-right so sweeps stay deterministic
    pub fn awake_chunks(&self) -> Vec<IVec2> {
        self.chunks.awake_coords_sorted()
    }

    /// Visit every in-bounds cell of a chunk, bottom-to-top
    pub fn for_each_cell_in_chunk<F>(&mut self, coord: IVec2, mut f: F)
    where
        F: FnMut(&mut Self, i32, i32),
    {
        let x0 = coord.x * CHUNK_SIZE;
        let y0 = coord.y * CHUNK_SIZE;
        for ly in 0..CHUNK_SIZE {
            let y = y0 + ly;
            if y < 0 || y >= self.height {
                continue;
            }
            for lx in 0..CHUNK_SIZE {
                let x = x0 + lx;
                if x < 0 || x >= self.width {
                    continue;
                }
                f(self, x, y);
            }
        }
    }
}

/// The per-cell rule dispatcher
pub struct CellularAutomata;

impl CellularAutomata {
    /// Run the movement pass: two checkerboard phases over all awake
    /// chunks, bottom-to-top, left-to-right
    pub fn update<R: WorldRng>(
        view: &mut GridView,
        materials: &MaterialRegistry,
        config: &SimulationConfig,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        let bands = Self::row_bands(view);
        for phase in 0..2i32 {
            for (&cy, band) in &bands {
                let y0 = cy * CHUNK_SIZE;
                for ly in 0..CHUNK_SIZE {
                    let y = y0 + ly;
                    if y < 0 || y >= view.height() {
                        continue;
                    }
                    for &cx in band {
                        let x0 = cx * CHUNK_SIZE;
                        for lx in 0..CHUNK_SIZE {
                            let x = x0 + lx;
                            if x < 0 || x >= view.width() {
                                continue;
                            }
                            if (x + y).rem_euclid(2) != phase {
                                continue;
                            }
                            Self::update_cell(view, x, y, materials, config, rng, stats);
                        }
                    }
                }
            }
        }
    }

    /// Awake chunk columns grouped by chunk row, both sorted ascending,
    /// so each phase scans the world in global row order
    fn row_bands(view: &GridView) -> BTreeMap<i32, Vec<i32>> {
        let mut bands: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for coord in view.awake_chunks() {
            bands.entry(coord.y).or_default().push(coord.x);
        }
        bands
    }

    fn update_cell<R: WorldRng>(
        view: &mut GridView,
        x: i32,
        y: i32,
        materials: &MaterialRegistry,
        config: &SimulationConfig,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        let cell = view.cell(x, y);
        if cell.is_empty() {
            return;
        }
        // Skip sources that were displaced into or out of this frame
        if !view.untouched(x, y) {
            return;
        }

        let def = materials.get(cell.material);
        match &def.behavior {
            Behavior::Static => {}
            Behavior::Powder(params) => {
                powder::update(view, x, y, cell, def, params, materials, config, rng, stats)
            }
            Behavior::Liquid(params) => {
                liquid::update(view, x, y, cell, def, params, materials, config, rng, stats)
            }
            Behavior::Gas(params) => {
                gas::update(view, x, y, cell, def, params, materials, config, rng, stats)
            }
            Behavior::Fire(params) => {
                fire::update(view, x, y, cell, def, params, materials, config, rng, stats)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::MaterialId;
    use crate::world::SimulationWorld;

    #[test]
    fn checkerboard_visits_every_cell_exactly_twice_per_frame() {
        // Parity partition: each cell matches exactly one phase, and both
        // phases together cover the grid
        for y in 0..8i32 {
            for x in 0..8i32 {
                let matches: i32 = (0..2).map(|p| i32::from((x + y).rem_euclid(2) == p)).sum();
                assert_eq!(matches, 1);
            }
        }
    }

    #[test]
    fn single_sand_cell_falls_straight_down() {
        let mut world = SimulationWorld::with_seed(12, 12, 42);
        world.set_material(5, 5, MaterialId::SAND);

        world.update(1.0 / 60.0);

        assert_eq!(world.material_at(5, 5), MaterialId::EMPTY);
        assert_eq!(world.material_at(5, 4), MaterialId::SAND);
    }

    #[test]
    fn moves_never_write_out_of_bounds() {
        let mut world = SimulationWorld::with_seed(4, 4, 42);
        // Bottom row full of sand: nowhere to go
        for x in 0..4 {
            world.set_material(x, 0, MaterialId::SAND);
        }
        for _ in 0..10 {
            world.update(1.0 / 60.0);
        }
        let count = (0..4).filter(|&x| world.material_at(x, 0) == MaterialId::SAND).count();
        assert_eq!(count, 4);
    }

    #[test]
    fn blocked_mover_stays_in_place() {
        let mut world = SimulationWorld::with_seed(8, 8, 42);
        world.set_material(3, 1, MaterialId::SAND);
        world.set_material(2, 0, MaterialId::STONE);
        world.set_material(3, 0, MaterialId::STONE);
        world.set_material(4, 0, MaterialId::STONE);

        world.update(1.0 / 60.0);

        assert_eq!(world.material_at(3, 1), MaterialId::SAND);
    }
}
