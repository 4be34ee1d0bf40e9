//! Liquid movement: gravity-first fall, diagonal fall, then lateral
//! flow toward the side with the larger pressure column. Viscosity
//! throttles flow attempts; buoyant liquids refuse to sink through
//! denser liquids and flow sideways or rise instead.

use crate::automata::displacement::{immiscible, try_step};
use crate::automata::GridView;
use crate::config::SimulationConfig;
use crate::simulation::{Cell, LiquidParams, MaterialDef, MaterialRegistry};
use crate::world::{SimStats, WorldRng};

/// Cap for the free-fall counter kept in velocity\[1\]
const MAX_FALL: i8 = 60;

/// How far up a pressure column is measured
const COLUMN_LIMIT: i32 = 16;

pub fn update<R: WorldRng>(
    view: &mut GridView,
    x: i32,
    y: i32,
    cell: Cell,
    def: &MaterialDef,
    params: &LiquidParams,
    materials: &MaterialRegistry,
    config: &SimulationConfig,
    rng: &mut R,
    stats: &mut dyn SimStats,
) {
    let mut mover = cell;

    let below = view.cell(x, y - 1);
    let below_def = materials.get(below.material);
    let refuses_to_sink = params.buoyant
        && !below.is_empty()
        && below_def.behavior.is_liquid()
        && below_def.density > def.density;

    if refuses_to_sink {
        // Buoyant liquid sitting on something denser: rise through a
        // denser liquid above, otherwise flow sideways below
        let above = view.cell(x, y + 1);
        if !above.is_empty() {
            let above_def = materials.get(above.material);
            if above_def.behavior.is_liquid()
                && above_def.density - def.density >= config.liquid_swap_threshold
                && view.commit_swap(x, y, x, y + 1, mover)
            {
                stats.record_cell_moved();
                return;
            }
        }
    } else {
        // Straight fall
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
            // Diagonal moves between immiscible liquids would blend the
            // boundary; only straight vertical passes are allowed there
            let diag = view.cell(x + dx, y - 1);
            if !diag.is_empty() && immiscible(def, materials.get(diag.material)) {
                continue;
            }
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
    }
    mover.velocity[1] = 0;

    // Viscosity gates how often lateral flow is attempted at all
    if def.viscosity > 0.0 && rng.chance(def.viscosity) {
        if mover != cell {
            view.write_next(x, y, mover);
        }
        return;
    }

    // Lateral flow toward the side with the larger pressure column,
    // preferring the direction we flowed last frame for coherent streams
    let remembered = mover.velocity[0].signum() as i32;
    let dir = if remembered != 0 && rng.chance(0.75) {
        remembered
    } else {
        let left = column_height(view, materials, x - 1, y);
        let right = column_height(view, materials, x + 1, y);
        if left == right {
            if rng.coin() {
                1
            } else {
                -1
            }
        } else if left > right {
            -1
        } else {
            1
        }
    };

    let reach = params.flow_rate.max(1) as i32;
    for dir in [dir, -dir] {
        // Claim the farthest open cell within reach along this direction
        let mut target = 0;
        for step in 1..=reach {
            if !view.is_open(x + dir * step, y) {
                break;
            }
            target = step;
        }
        if target > 0 {
            mover.velocity[0] = dir as i8;
            if view.commit_move(x, y, x + dir * target, y, mover) {
                stats.record_cell_moved();
                return;
            }
        }
    }

    // Stuck: drop the flow memory so the next frame re-measures
    mover.velocity[0] = 0;
    if mover != cell {
        view.write_next(x, y, mover);
    }
}

/// Contiguous same-behavior column height at and above (x, y), capped.
/// This is the pressure measure lateral flow steers by.
fn column_height(view: &GridView, materials: &MaterialRegistry, x: i32, y: i32) -> i32 {
    let mut height = 0;
    while height < COLUMN_LIMIT {
        let cell = view.cell(x, y + height);
        if cell.is_empty() || !materials.get(cell.material).behavior.is_liquid() {
            break;
        }
        height += 1;
    }
    height
}
