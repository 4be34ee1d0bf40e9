//! SimulationWorld - owns the double-buffered grid, the chunk tracker,
//! the pixel buffer, and the per-frame pipeline

use glam::IVec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::automata::{CellularAutomata, ChemistrySystem, GridView};
use crate::config::SimulationConfig;
use crate::simulation::{
    Cell, Effect, EffectKind, Explosion, ExplosionSystem, MaterialRegistry, TemperatureSystem,
    AMBIENT_TEMPERATURE,
};
use crate::world::chunk::CHUNK_SIZE;
use crate::world::chunk_manager::ChunkManager;
use crate::world::framebuffer;
use crate::world::grid::CellGrid;
use crate::world::stats::FrameStats;

const FIXED_TIMESTEP: f32 = 1.0 / 60.0;

/// The simulation world.
///
/// Per-frame pipeline (when not paused, or when a step was requested):
/// baseline-copy current into next, movement pass, temperature
/// diffusion, reaction pass, buffer swap at the single well-defined
/// point, framebuffer regeneration for dirty chunks, then chunk
/// sleep/unload bookkeeping.
pub struct SimulationWorld {
    grid: CellGrid,
    materials: MaterialRegistry,
    chunks: ChunkManager,
    config: SimulationConfig,
    rng: Xoshiro256StarStar,

    framebuffer: Vec<u8>,
    /// Coarse dirty bitmap (one bit per chunk tile) for incremental
    /// redraw by external consumers
    dirty_regions: Vec<bool>,
    chunks_w: i32,
    chunks_h: i32,

    paused: bool,
    speed: f32,
    time_accumulator: f32,
    frame: u64,
    stats: FrameStats,
    pending_explosions: Vec<Explosion>,
}

impl SimulationWorld {
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_seed(width, height, 0)
    }

    pub fn with_seed(width: i32, height: i32, seed: u64) -> Self {
        Self::with_config(width, height, seed, SimulationConfig::default())
    }

    pub fn with_config(width: i32, height: i32, seed: u64, config: SimulationConfig) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let chunks_w = (width + CHUNK_SIZE - 1) / CHUNK_SIZE;
        let chunks_h = (height + CHUNK_SIZE - 1) / CHUNK_SIZE;

        log::info!(
            "created {width}x{height} world ({chunks_w}x{chunks_h} chunks, seed {seed})"
        );

        Self {
            grid: CellGrid::new(width, height),
            materials: MaterialRegistry::new(),
            chunks: ChunkManager::new(config.chunk_sleep_frames, config.chunk_unload_frames),
            speed: config.default_speed,
            config,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            framebuffer: vec![0; (width * height) as usize * 4],
            dirty_regions: vec![false; (chunks_w * chunks_h) as usize],
            chunks_w,
            chunks_h,
            paused: false,
            time_accumulator: 0.0,
            frame: 0,
            stats: FrameStats::default(),
            pending_explosions: Vec::new(),
        }
    }

    // --- queries ---

    pub fn width(&self) -> i32 {
        self.grid.width()
    }

    pub fn height(&self) -> i32 {
        self.grid.height()
    }

    pub fn is_valid_position(&self, x: i32, y: i32) -> bool {
        self.grid.in_bounds(x, y)
    }

    /// Material at a position; out of bounds reads as empty
    pub fn material_at(&self, x: i32, y: i32) -> u16 {
        self.grid.cell(x, y).material
    }

    /// Temperature at a position; out of bounds reads as ambient
    pub fn temperature_at(&self, x: i32, y: i32) -> f32 {
        if !self.grid.in_bounds(x, y) {
            return AMBIENT_TEMPERATURE;
        }
        self.grid.cell(x, y).temperature
    }

    /// Read-only snapshot of one cell
    pub fn cell_at(&self, x: i32, y: i32) -> Option<Cell> {
        self.grid.in_bounds(x, y).then(|| self.grid.cell(x, y))
    }

    /// Packed RGBA bytes, 4 per cell, row-major
    pub fn pixel_data(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Number of cells holding the given material
    pub fn count_material(&self, material: u16) -> usize {
        self.grid.count_material(material)
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialRegistry {
        &mut self.materials
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn last_frame_stats(&self) -> FrameStats {
        self.stats
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.chunk_count()
    }

    /// Any dirty chunk overlapping the cell-space rectangle?
    pub fn is_region_dirty(&self, x: i32, y: i32, width: i32, height: i32) -> bool {
        self.region_tiles(x, y, width, height)
            .any(|idx| self.dirty_regions[idx])
    }

    /// Consumer finished redrawing the rectangle
    pub fn mark_region_clean(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let tiles: Vec<usize> = self.region_tiles(x, y, width, height).collect();
        for idx in tiles {
            self.dirty_regions[idx] = false;
        }
    }

    fn region_tiles(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> impl Iterator<Item = usize> + '_ {
        let degenerate = width <= 0
            || height <= 0
            || x >= self.width()
            || y >= self.height()
            || x + width <= 0
            || y + height <= 0;
        let (min_cx, min_cy, max_cx, max_cy) = if degenerate {
            (0, 0, -1, -1)
        } else {
            (
                x.max(0) / CHUNK_SIZE,
                y.max(0) / CHUNK_SIZE,
                (x + width - 1).clamp(0, self.width() - 1) / CHUNK_SIZE,
                (y + height - 1).clamp(0, self.height() - 1) / CHUNK_SIZE,
            )
        };
        let chunks_w = self.chunks_w;
        (min_cy..=max_cy)
            .flat_map(move |cy| (min_cx..=max_cx).map(move |cx| (cy * chunks_w + cx) as usize))
    }

    // --- mutation (paint tools, world generators) ---

    /// Place a material, replacing whatever is there. Out of bounds is a
    /// silent no-op.
    pub fn set_material(&mut self, x: i32, y: i32, material: u16) {
        if !self.grid.in_bounds(x, y) {
            log::warn!("set_material out of bounds: ({x}, {y})");
            return;
        }
        let base_temp = self.grid.cell(x, y).temperature;
        let cell = self.materials.spawn(material, base_temp);
        self.write_cell(x, y, cell);
    }

    /// Overwrite only the temperature field at a position
    pub fn set_temperature(&mut self, x: i32, y: i32, temperature: f32) {
        if !self.grid.in_bounds(x, y) {
            return;
        }
        let mut cell = self.grid.cell(x, y);
        cell.temperature = temperature;
        self.write_cell(x, y, cell);
    }

    /// Apply an effect layer to a non-empty cell. Intensity 0 clears.
    pub fn set_effect(&mut self, x: i32, y: i32, kind: EffectKind, intensity: u8, duration: u8) {
        if !self.grid.in_bounds(x, y) {
            return;
        }
        let mut cell = self.grid.cell(x, y);
        if cell.is_empty() {
            return;
        }
        cell.effect = Effect::new(kind, intensity, duration);
        self.write_cell(x, y, cell);
    }

    /// Fill an axis-aligned rectangle with a material
    pub fn fill_region(&mut self, x: i32, y: i32, width: i32, height: i32, material: u16) {
        for cy in y..y + height {
            for cx in x..x + width {
                if self.grid.in_bounds(cx, cy) {
                    let base_temp = self.grid.cell(cx, cy).temperature;
                    let cell = self.materials.spawn(material, base_temp);
                    self.write_cell(cx, cy, cell);
                }
            }
        }
    }

    /// Fill a circular brush with a material
    pub fn fill_circle(&mut self, center_x: i32, center_y: i32, radius: i32, material: u16) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let x = center_x + dx;
                let y = center_y + dy;
                if self.grid.in_bounds(x, y) {
                    let base_temp = self.grid.cell(x, y).temperature;
                    let cell = self.materials.spawn(material, base_temp);
                    self.write_cell(x, y, cell);
                }
            }
        }
    }

    /// Queue an explosion; it detonates during the next frame's reaction
    /// pass
    pub fn explode(&mut self, x: i32, y: i32, power: f32, radius: i32) {
        log::debug!("queued explosion at ({x}, {y}), power {power}, radius {radius}");
        self.pending_explosions.push(Explosion {
            center: IVec2::new(x, y),
            power,
            radius,
        });
        // Wake the area so the blast is processed even in a cold region
        let (coord, _, _) = ChunkManager::chunk_coords(x, y);
        self.chunks.activate(coord);
    }

    fn write_cell(&mut self, x: i32, y: i32, cell: Cell) {
        self.grid.set_cell(x, y, cell);
        self.chunks.mark_cell_dirty(x, y);
        let width = self.width();
        framebuffer::redraw_cell(
            &mut self.framebuffer,
            self.grid.current(),
            width,
            x,
            y,
            &self.materials,
        );
        self.mark_tile_dirty(x, y);
    }

    fn mark_tile_dirty(&mut self, x: i32, y: i32) {
        let (coord, _, _) = ChunkManager::chunk_coords(x, y);
        if coord.x >= 0 && coord.x < self.chunks_w && coord.y >= 0 && coord.y < self.chunks_h {
            self.dirty_regions[(coord.y * self.chunks_w + coord.x) as usize] = true;
        }
    }

    // --- transport ---

    pub fn play(&mut self) {
        self.paused = false;
    }

    /// Halts the pipeline; takes effect between frames
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Execute exactly one frame regardless of the pause flag
    pub fn step(&mut self) {
        self.step_frame(FIXED_TIMESTEP);
    }

    /// Speed multiplier applied to delta time
    pub fn set_simulation_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn simulation_speed(&self) -> f32 {
        self.speed
    }

    /// Clear both grids, all chunks, and the pixel buffer
    pub fn reset(&mut self) {
        log::info!("world reset at frame {}", self.frame);
        self.grid.clear();
        self.chunks.clear();
        self.framebuffer.fill(0);
        self.dirty_regions.fill(true);
        self.pending_explosions.clear();
        self.stats.reset();
        self.frame = 0;
    }

    /// Advance the simulation with a fixed timestep if running. The
    /// speed multiplier scales the accumulated delta time, so it changes
    /// how many fixed steps a wall-clock second produces.
    pub fn update(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        self.time_accumulator += dt * self.speed;
        while self.time_accumulator >= FIXED_TIMESTEP {
            self.step_frame(FIXED_TIMESTEP);
            self.time_accumulator -= FIXED_TIMESTEP;
        }
    }

    fn step_frame(&mut self, dt: f32) {
        self.stats.reset();
        self.chunks.begin_frame();
        let pending: Vec<Explosion> = self.pending_explosions.drain(..).collect();

        {
            let width = self.grid.width();
            let height = self.grid.height();
            let (current, next) = self.grid.begin_frame();
            let mut view = GridView::new(width, height, current, next, &mut self.chunks);

            CellularAutomata::update(
                &mut view,
                &self.materials,
                &self.config,
                &mut self.rng,
                &mut self.stats,
            );
            TemperatureSystem::diffuse(
                &mut view,
                &self.materials,
                self.config.temperature_diffusion,
                dt,
            );
            ChemistrySystem::update(
                &mut view,
                &self.materials,
                &self.config,
                &mut self.rng,
                &mut self.stats,
            );
            for explosion in pending {
                ExplosionSystem::apply(
                    &mut view,
                    &self.materials,
                    explosion,
                    &mut self.rng,
                    &mut self.stats,
                );
            }
        }

        self.grid.finish_writing();
        self.grid.swap();

        self.redraw_dirty_chunks();
        self.chunks.end_frame();
        if self.config.unload_sweep_interval > 0
            && self.frame % self.config.unload_sweep_interval == 0
        {
            self.chunks.unload_inactive_chunks();
        }
        self.frame += 1;
    }

    fn redraw_dirty_chunks(&mut self) {
        for coord in self.chunks.dirty_coords_sorted() {
            framebuffer::redraw_chunk(
                &mut self.framebuffer,
                self.grid.current(),
                self.grid.width(),
                self.grid.height(),
                coord,
                &self.materials,
            );
            if let Some(chunk) = self.chunks.get_mut(coord) {
                chunk.mark_redrawn();
            }
            if coord.x >= 0 && coord.x < self.chunks_w && coord.y >= 0 && coord.y < self.chunks_h {
                self.dirty_regions[(coord.y * self.chunks_w + coord.x) as usize] = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::MaterialId;

    #[test]
    fn out_of_bounds_paint_is_a_silent_no_op() {
        let mut world = SimulationWorld::with_seed(8, 8, 1);
        world.set_material(-1, 3, MaterialId::SAND);
        world.set_material(8, 3, MaterialId::SAND);
        world.set_material(3, 99, MaterialId::SAND);
        assert_eq!(world.count_material(MaterialId::SAND), 0);

        world.set_temperature(-5, -5, 500.0);
        world.set_effect(100, 0, EffectKind::Burning, 200, 50);
        assert_eq!(world.temperature_at(-5, -5), AMBIENT_TEMPERATURE);
    }

    #[test]
    fn pause_step_and_play() {
        let mut world = SimulationWorld::with_seed(8, 8, 1);
        world.set_material(4, 4, MaterialId::SAND);

        world.pause();
        assert!(world.is_paused());
        world.update(1.0 / 60.0);
        assert_eq!(world.material_at(4, 4), MaterialId::SAND);

        // Step runs exactly one frame while paused
        world.step();
        assert_eq!(world.material_at(4, 3), MaterialId::SAND);
        let frame = world.frame();
        world.update(1.0 / 60.0);
        assert_eq!(world.frame(), frame);

        world.play();
        world.update(1.0 / 60.0);
        assert_eq!(world.frame(), frame + 1);
    }

    #[test]
    fn reset_clears_grid_chunks_and_pixels() {
        let mut world = SimulationWorld::with_seed(16, 16, 1);
        world.fill_region(2, 2, 8, 8, MaterialId::WATER);
        world.update(1.0 / 60.0);
        assert!(world.count_material(MaterialId::WATER) > 0);

        world.reset();
        assert_eq!(world.count_material(MaterialId::WATER), 0);
        assert_eq!(world.chunk_count(), 0);
        assert_eq!(world.frame(), 0);
        assert!(world.pixel_data().iter().all(|&b| b == 0));
    }

    #[test]
    fn pixel_data_tracks_painted_cells() {
        let mut world = SimulationWorld::with_seed(8, 8, 1);
        world.set_material(2, 3, MaterialId::STONE);

        let idx = (3 * 8 + 2) * 4;
        let stone = world.materials().get(MaterialId::STONE).color;
        assert_eq!(&world.pixel_data()[idx..idx + 4], &stone);
    }

    #[test]
    fn dirty_region_tracking_round_trip() {
        let mut world = SimulationWorld::with_seed(128, 128, 1);
        assert!(!world.is_region_dirty(0, 0, 64, 64));

        world.set_material(10, 10, MaterialId::STONE);
        assert!(world.is_region_dirty(0, 0, 64, 64));
        // The far corner chunk was never touched
        assert!(!world.is_region_dirty(100, 100, 20, 20));

        world.mark_region_clean(0, 0, 64, 64);
        assert!(!world.is_region_dirty(0, 0, 64, 64));
    }

    #[test]
    fn fill_circle_stays_in_bounds() {
        let mut world = SimulationWorld::with_seed(8, 8, 1);
        world.fill_circle(0, 0, 3, MaterialId::STONE);
        assert!(world.count_material(MaterialId::STONE) > 0);
    }

    #[test]
    fn speed_scales_how_many_steps_a_delta_produces() {
        let mut world = SimulationWorld::with_seed(8, 8, 1);
        world.set_simulation_speed(0.0);
        world.set_material(4, 4, MaterialId::SAND);

        for _ in 0..20 {
            world.update(1.0 / 60.0);
        }
        // Speed zero: time never accumulates, nothing steps
        assert_eq!(world.frame(), 0);
        assert_eq!(world.material_at(4, 4), MaterialId::SAND);

        world.set_simulation_speed(2.0);
        world.update(1.0 / 60.0);
        assert_eq!(world.frame(), 2);
    }
}
