//! Powder movement: gravity-first fall, diagonal dispersal, and
//! angle-of-repose sliding with a settle check to suppress jitter

use crate::automata::displacement::try_step;
use crate::automata::GridView;
use crate::config::SimulationConfig;
use crate::simulation::{Behavior, Cell, CellFlags, MaterialDef, MaterialRegistry, PowderParams};
use crate::world::{SimStats, WorldRng};

/// Cap for the free-fall counter kept in velocity\[1\]
const MAX_FALL: i8 = 60;

pub fn update<R: WorldRng>(
    view: &mut GridView,
    x: i32,
    y: i32,
    cell: Cell,
    def: &MaterialDef,
    params: &PowderParams,
    materials: &MaterialRegistry,
    config: &SimulationConfig,
    rng: &mut R,
    stats: &mut dyn SimStats,
) {
    // Cohesion: chance to resist movement entirely this frame
    if params.cohesion > 0.0 && rng.chance(params.cohesion) {
        return;
    }

    let mut mover = cell;

    // Settled grains only re-check their footing occasionally
    if mover.flags.contains(CellFlags::SETTLED) {
        if supported(view, materials, x, y, params) {
            if !rng.chance(config.settled_recheck) {
                return;
            }
        }
        mover.flags.remove(CellFlags::SETTLED);
    }

    // Straight fall, through liquids and gases if we are denser
    let mut falling = mover;
    falling.velocity[1] = (falling.velocity[1] + 1).min(MAX_FALL);
    if try_step(
        view,
        materials,
        config.liquid_swap_threshold,
        x,
        y,
        x,
        y - 1,
        falling,
        def,
        stats,
    ) {
        return;
    }

    // Diagonal fall, both sides in a random order
    mover.velocity[1] = 0;
    let side = if rng.coin() { 1 } else { -1 };
    for dx in [side, -side] {
        if try_step(
            view,
            materials,
            config.liquid_swap_threshold,
            x,
            y,
            x + dx,
            y - 1,
            mover,
            def,
            stats,
        ) {
            return;
        }
    }

    // Angle-of-repose slide: lateral step toward the side whose pile
    // drops deeper than the material tolerates, gated on friction
    let limit = params.angle_of_repose as i32 + 1;
    let drop_left = drop_depth(view, x - 1, y, limit);
    let drop_right = drop_depth(view, x + 1, y, limit);
    let (dx, drop) = if drop_left == drop_right {
        (side, drop_left)
    } else if drop_left > drop_right {
        (-1, drop_left)
    } else {
        (1, drop_right)
    };
    if drop > params.angle_of_repose as i32 && rng.chance(1.0 - def.friction) {
        if try_step(
            view,
            materials,
            config.liquid_swap_threshold,
            x,
            y,
            x + dx,
            y,
            mover,
            def,
            stats,
        ) {
            return;
        }
    }

    // Nothing moved: settle if there is real support below
    if supported(view, materials, x, y, params) {
        mover.flags.insert(CellFlags::SETTLED);
    }
    mover.velocity[1] = 0;
    if mover != cell {
        view.write_next(x, y, mover);
    }
}

/// How many empty cells a grain at (x, y) would drop through, capped
fn drop_depth(view: &GridView, x: i32, y: i32, limit: i32) -> i32 {
    if !view.in_bounds(x, y) || !view.cell(x, y).is_empty() {
        return 0;
    }
    let mut depth = 0;
    while depth < limit && view.in_bounds(x, y - 1 - depth) && view.cell(x, y - 1 - depth).is_empty()
    {
        depth += 1;
    }
    depth
}

/// Solid footing or a pile deep enough to count as support
fn supported(view: &GridView, materials: &MaterialRegistry, x: i32, y: i32, params: &PowderParams) -> bool {
    if y == 0 {
        return true;
    }
    let below = view.cell(x, y - 1);
    if below.is_empty() {
        return false;
    }
    let below_def = materials.get(below.material);
    if below_def.behavior.is_static() {
        return true;
    }
    if !matches!(below_def.behavior, Behavior::Powder(_)) {
        return false;
    }
    // Deep pile: enough powder stacked beneath
    let mut depth = 0;
    while depth < params.settle_support as i32 {
        if !view.in_bounds(x, y - 1 - depth) {
            // The world edge backs the pile
            return true;
        }
        let probe = view.cell(x, y - 1 - depth);
        if probe.is_empty() {
            return false;
        }
        let probe_def = materials.get(probe.material);
        if probe_def.behavior.is_static() {
            return true;
        }
        if !probe_def.behavior.is_powder() {
            return false;
        }
        depth += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::simulation::MaterialId;
    use crate::world::SimulationWorld;

    #[test]
    fn sand_falls_through_empty_space() {
        let mut world = SimulationWorld::with_seed(10, 10, 9);
        world.set_material(4, 8, MaterialId::SAND);

        for _ in 0..10 {
            world.update(1.0 / 60.0);
        }

        assert_eq!(world.material_at(4, 0), MaterialId::SAND);
        for y in 1..10 {
            assert_ne!(world.material_at(4, y), MaterialId::SAND);
        }
    }

    #[test]
    fn sand_slides_off_a_single_stone() {
        let mut world = SimulationWorld::with_seed(10, 10, 9);
        world.set_material(4, 0, MaterialId::STONE);
        world.set_material(4, 1, MaterialId::SAND);

        for _ in 0..20 {
            world.update(1.0 / 60.0);
        }

        // The grain slid diagonally off the stone and landed beside it
        let left = world.material_at(3, 0);
        let right = world.material_at(5, 0);
        assert!(
            left == MaterialId::SAND || right == MaterialId::SAND,
            "sand should have slid off the stone"
        );
        assert_eq!(world.material_at(4, 1), MaterialId::EMPTY);
    }

    #[test]
    fn sand_sinks_through_water() {
        let mut world = SimulationWorld::with_seed(6, 12, 9);
        // Closed column of water with sand on top
        for x in [2, 4] {
            for y in 0..8 {
                world.set_material(x, y, MaterialId::STONE);
            }
        }
        for y in 0..5 {
            world.set_material(3, y, MaterialId::WATER);
        }
        world.set_material(3, 6, MaterialId::SAND);

        for _ in 0..60 {
            world.update(1.0 / 60.0);
        }

        assert_eq!(world.material_at(3, 0), MaterialId::SAND);
    }

    #[test]
    fn sand_conserves_mass_while_falling() {
        let mut world = SimulationWorld::with_seed(24, 24, 9);
        for x in 4..20 {
            for y in 16..20 {
                world.set_material(x, y, MaterialId::SAND);
            }
        }
        let before = world.count_material(MaterialId::SAND);
        for _ in 0..120 {
            world.update(1.0 / 60.0);
        }
        assert_eq!(world.count_material(MaterialId::SAND), before);
    }
}
