//! Gas movement: a biased random walk with bounded retries, a decaying
//! life counter that ends in dissipation, and condensation for gases
//! with a liquid form

use crate::automata::displacement::try_step;
use crate::automata::GridView;
use crate::config::SimulationConfig;
use crate::simulation::{Cell, GasParams, MaterialDef, MaterialRegistry};
use crate::world::{SimStats, WorldRng};

pub fn update<R: WorldRng>(
    view: &mut GridView,
    x: i32,
    y: i32,
    cell: Cell,
    def: &MaterialDef,
    params: &GasParams,
    materials: &MaterialRegistry,
    config: &SimulationConfig,
    rng: &mut R,
    stats: &mut dyn SimStats,
) {
    let mut mover = cell;

    // Decay: gases eventually thin out to nothing
    if params.dissipation > 0.0 && rng.chance(params.dissipation) {
        if mover.life <= 1 {
            view.write_next(x, y, Cell::vacated(cell.temperature));
            return;
        }
        mover.life -= 1;
    }

    // Condensation back into the liquid form when cold enough
    if let (Some(liquid), Some(threshold)) = (params.condenses_to, params.condense_below) {
        if cell.temperature < threshold {
            view.write_next(x, y, materials.spawn(liquid, cell.temperature));
            stats.record_state_change();
            return;
        }
    }

    // Turbulent walk: upward bias plus horizontal jitter, retried a
    // bounded number of times
    for _ in 0..config.gas_move_retries {
        let dy = i32::from(rng.chance(params.rise_bias));
        let dx = if rng.chance(params.turbulence) {
            if rng.coin() {
                1
            } else {
                -1
            }
        } else {
            0
        };
        if dx == 0 && dy == 0 {
            continue;
        }
        if try_step(
            view,
            materials,
            config.liquid_swap_threshold,
            x,
            y,
            x + dx,
            y + dy,
            mover,
            def,
            stats,
        ) {
            return;
        }
    }

    // Trapped: still persist the decayed life
    if mover != cell {
        view.write_next(x, y, mover);
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::MaterialId;
    use crate::world::SimulationWorld;

    #[test]
    fn smoke_rises() {
        let mut world = SimulationWorld::with_seed(10, 20, 11);
        world.set_material(5, 2, MaterialId::SMOKE);

        let mut best = 2;
        for _ in 0..40 {
            world.update(1.0 / 60.0);
            for y in 0..20 {
                for x in 0..10 {
                    if world.material_at(x, y) == MaterialId::SMOKE {
                        best = best.max(y);
                    }
                }
            }
        }
        assert!(best > 5, "smoke should drift upward, reached y={best}");
    }

    #[test]
    fn gas_dissipates_to_empty_eventually() {
        let mut world = SimulationWorld::with_seed(8, 8, 11);
        // Sealed box so the smoke cannot escape upward out of bounds
        world.set_material(3, 3, MaterialId::SMOKE);

        for _ in 0..4000 {
            world.update(1.0 / 60.0);
            if world.count_material(MaterialId::SMOKE) == 0 {
                return;
            }
        }
        panic!("smoke never dissipated");
    }

    #[test]
    fn smoke_bubbles_up_through_water() {
        let mut world = SimulationWorld::with_seed(5, 12, 11);
        for y in 0..9 {
            world.set_material(1, y, MaterialId::STONE);
            world.set_material(3, y, MaterialId::STONE);
        }
        for y in 1..8 {
            world.set_material(2, y, MaterialId::WATER);
        }
        world.set_material(2, 0, MaterialId::SMOKE);

        let mut top = 0;
        for _ in 0..200 {
            world.update(1.0 / 60.0);
            for y in 0..12 {
                for x in 0..5 {
                    if world.material_at(x, y) == MaterialId::SMOKE {
                        top = top.max(y);
                    }
                }
            }
            if top >= 8 {
                break;
            }
        }
        assert!(top >= 6, "smoke should bubble up through water, reached y={top}");
    }
}
