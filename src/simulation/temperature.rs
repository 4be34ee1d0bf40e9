//! Temperature diffusion pass
//!
//! Each cell's temperature relaxes toward the average of its occupied
//! neighbors, scaled by the diffusion rate, the material's conductivity
//! and heat capacity, and the frame delta. The pass reads the current
//! grid and writes ONLY the temperature field of the next grid; material
//! identity is owned exclusively by the movement and reaction passes.

use crate::automata::GridView;
use crate::simulation::cell::AMBIENT_TEMPERATURE;
use crate::simulation::materials::MaterialRegistry;

/// Conductivity used for the air in empty cells, which carry a
/// temperature but no material properties
const AIR_CONDUCTIVITY: f32 = 0.15;

/// Rate at which empty cells drift back toward ambient
const AIR_RELAXATION: f32 = 0.02;

/// Temperature deltas below this are not written, so settled regions
/// stop churning
const WRITE_EPSILON: f32 = 0.01;

pub struct TemperatureSystem;

impl TemperatureSystem {
    /// Diffuse temperature across all awake chunks
    pub fn diffuse(view: &mut GridView, materials: &MaterialRegistry, rate: f32, dt: f32) {
        let step = (dt * 60.0).clamp(0.0, 2.0);
        for coord in view.awake_chunks() {
            view.for_each_cell_in_chunk(coord, |view, x, y| {
                Self::diffuse_cell(view, materials, x, y, rate, step);
            });
        }
    }

    fn diffuse_cell(view: &mut GridView, materials: &MaterialRegistry, x: i32, y: i32, rate: f32, step: f32) {
        let cell = view.cell(x, y);

        let mut neighbor_sum = 0.0;
        let mut neighbor_count = 0;
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let nx = x + dx;
            let ny = y + dy;
            if !view.in_bounds(nx, ny) {
                continue;
            }
            let neighbor = view.cell(nx, ny);
            if !neighbor.is_empty() {
                neighbor_sum += neighbor.temperature;
                neighbor_count += 1;
            }
        }

        let mut temperature = cell.temperature;
        if neighbor_count > 0 {
            let average = neighbor_sum / neighbor_count as f32;
            let conductivity = if cell.is_empty() {
                AIR_CONDUCTIVITY
            } else {
                let def = materials.get(cell.material);
                def.conductivity / def.heat_capacity.max(0.1)
            };
            let factor = (rate * conductivity * step).clamp(0.0, 1.0);
            temperature += (average - temperature) * factor;
        }
        if cell.is_empty() {
            temperature += (AMBIENT_TEMPERATURE - temperature) * (AIR_RELAXATION * step).min(1.0);
        }

        if (temperature - cell.temperature).abs() > WRITE_EPSILON {
            view.set_next_temperature(x, y, temperature);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::MaterialId;
    use crate::world::SimulationWorld;

    #[test]
    fn heat_spreads_to_adjacent_occupied_cells() {
        let mut world = SimulationWorld::with_seed(16, 16, 3);
        world.fill_region(2, 2, 6, 3, MaterialId::METAL);
        world.set_temperature(2, 2, 800.0);

        for _ in 0..30 {
            world.update(1.0 / 60.0);
        }

        // Conduction along the metal bar
        assert!(world.temperature_at(3, 2) > 100.0);
        assert!(world.temperature_at(2, 2) < 800.0);
    }

    #[test]
    fn diffusion_never_touches_material_identity() {
        let mut world = SimulationWorld::with_seed(16, 16, 3);
        world.fill_region(0, 0, 16, 2, MaterialId::STONE);
        world.set_temperature(4, 1, 500.0);

        for _ in 0..20 {
            world.update(1.0 / 60.0);
        }

        for x in 0..16 {
            for y in 0..2 {
                assert_eq!(world.material_at(x, y), MaterialId::STONE);
            }
        }
    }
}
