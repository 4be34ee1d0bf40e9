//! Reaction pass
//!
//! Runs after movement and temperature diffusion, operating on the next
//! grid. For every non-empty cell of an awake chunk it ticks the effect
//! layer, applies temperature-driven state changes, then scans the 8
//! neighbors for the first eligible reaction. A scratch bitmap ensures
//! at most one reaction commits per cell per frame, so reactions never
//! cascade within a single step. Explosive reactions are queued and the
//! blasts applied after the scan.

use glam::IVec2;
use smallvec::SmallVec;

use crate::automata::GridView;
use crate::config::SimulationConfig;
use crate::simulation::{
    Cell, Effect, EffectKind, Explosion, ExplosionSystem, MaterialId, MaterialRegistry,
    ReactionKind,
};
use crate::world::{SimStats, WorldRng};

const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// An explosive reaction waiting for the scan to finish. The material
/// change is applied after the blast, per the reaction's products.
struct PendingExplosion {
    explosion: Explosion,
    site_a: (i32, i32, u16),
    site_b: (i32, i32, u16),
}

pub struct ChemistrySystem;

impl ChemistrySystem {
    pub fn update<R: WorldRng>(
        view: &mut GridView,
        materials: &MaterialRegistry,
        config: &SimulationConfig,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        let mut reacted = vec![false; (view.width() * view.height()) as usize];
        let mut pending: Vec<PendingExplosion> = Vec::new();

        for coord in view.awake_chunks() {
            view.for_each_cell_in_chunk(coord, |view, x, y| {
                Self::update_cell(
                    view,
                    materials,
                    config,
                    x,
                    y,
                    &mut reacted,
                    &mut pending,
                    rng,
                    stats,
                );
            });
        }

        for item in pending {
            ExplosionSystem::apply(view, materials, item.explosion, rng, stats);
            let (ax, ay, product_a) = item.site_a;
            let (bx, by, product_b) = item.site_b;
            let temp_a = view.next_cell(ax, ay).temperature;
            let temp_b = view.next_cell(bx, by).temperature;
            view.write_next(ax, ay, materials.spawn(product_a, temp_a));
            view.write_next(bx, by, materials.spawn(product_b, temp_b));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn update_cell<R: WorldRng>(
        view: &mut GridView,
        materials: &MaterialRegistry,
        config: &SimulationConfig,
        x: i32,
        y: i32,
        reacted: &mut [bool],
        pending: &mut Vec<PendingExplosion>,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        let idx = (y * view.width() + x) as usize;
        let mut cell = view.next_cell(x, y);

        if cell.is_empty() {
            // Invariant: an empty cell carries no effect layer
            if !cell.effect.is_none() {
                cell.effect = Effect::NONE;
                view.write_next(x, y, cell);
            }
            return;
        }

        // 1. Effect layer tick (may consume the cell)
        if !cell.effect.is_none() {
            Self::tick_effect(view, materials, config, x, y, rng, stats);
            cell = view.next_cell(x, y);
            if cell.is_empty() {
                return;
            }
        }

        // Fire keeps its own cell hot so heat diffuses outward
        let def = materials.get(cell.material);
        if def.behavior.is_fire() && cell.temperature < 800.0 {
            cell.temperature += config.fire_heat;
            view.write_next(x, y, cell);
        }

        // 2. Temperature-driven state change
        if Self::check_state_change(view, materials, x, y, &cell, stats) {
            return;
        }

        // 3. Neighbor reactions: first eligible wins, one per cell
        if reacted[idx] {
            return;
        }
        let neighbors: SmallVec<[(i32, i32); 8]> = NEIGHBORS_8
            .iter()
            .map(|&(dx, dy)| (x + dx, y + dy))
            .filter(|&(nx, ny)| view.in_bounds(nx, ny))
            .collect();
        for (nx, ny) in neighbors {
            let nidx = (ny * view.width() + nx) as usize;
            if reacted[nidx] {
                continue;
            }
            let neighbor = view.next_cell(nx, ny);
            if neighbor.is_empty() {
                continue;
            }
            if let Some(outcome) =
                materials.try_react(cell.material, neighbor.material, cell.temperature, rng)
            {
                Self::apply_reaction(
                    view, materials, config, x, y, nx, ny, cell, neighbor, outcome, pending, rng,
                    stats,
                );
                reacted[idx] = true;
                reacted[nidx] = true;
                stats.record_reaction();
                return;
            }
        }
    }

    /// Advance the effect layer one frame. Burning injects heat and
    /// gradually consumes fuel; Corroding slowly eats the material;
    /// everything else just counts down.
    fn tick_effect<R: WorldRng>(
        view: &mut GridView,
        materials: &MaterialRegistry,
        config: &SimulationConfig,
        x: i32,
        y: i32,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        let mut cell = view.next_cell(x, y);
        let def = materials.get(cell.material);

        match cell.effect.kind {
            EffectKind::Burning => {
                cell.temperature += config.fire_heat;

                // Rare conversion keeps fuel from vanishing instantly
                if def.burn_rate > 0.0 && rng.chance(def.burn_rate) {
                    let product = def.burns_to.unwrap_or(MaterialId::EMPTY);
                    view.write_next(x, y, materials.spawn(product, cell.temperature));
                    stats.record_state_change();
                    return;
                }

                // A burning surface sheds flames into open air above
                if rng.chance(0.12) && view.next_cell(x, y + 1).is_empty() {
                    view.write_next(x, y + 1, materials.spawn(MaterialId::FIRE, cell.temperature));
                }
            }
            EffectKind::Corroding => {
                if rng.chance(0.05) {
                    view.write_next(x, y, Cell::vacated(cell.temperature));
                    stats.record_state_change();
                    return;
                }
            }
            _ => {}
        }

        cell.effect.tick();
        view.write_next(x, y, cell);
    }

    /// Melt, boil, or freeze based on the post-diffusion temperature.
    /// Returns true when the cell changed material.
    fn check_state_change(
        view: &mut GridView,
        materials: &MaterialRegistry,
        x: i32,
        y: i32,
        cell: &Cell,
        stats: &mut dyn SimStats,
    ) -> bool {
        let def = materials.get(cell.material);
        let temperature = cell.temperature;

        let product = if let (Some(point), Some(to)) = (def.boiling_point, def.boils_to) {
            (temperature >= point).then_some(to)
        } else {
            None
        }
        .or_else(|| {
            if let (Some(point), Some(to)) = (def.melting_point, def.melts_to) {
                (temperature >= point).then_some(to)
            } else {
                None
            }
        })
        .or_else(|| {
            if let (Some(point), Some(to)) = (def.freezing_point, def.freezes_to) {
                (temperature <= point).then_some(to)
            } else {
                None
            }
        });

        if let Some(product) = product {
            let mut changed = materials.spawn(product, temperature);
            // State changes keep the temperature that caused them
            changed.temperature = temperature;
            view.write_next(x, y, changed);
            stats.record_state_change();
            return true;
        }
        false
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_reaction<R: WorldRng>(
        view: &mut GridView,
        materials: &MaterialRegistry,
        config: &SimulationConfig,
        x: i32,
        y: i32,
        nx: i32,
        ny: i32,
        cell: Cell,
        neighbor: Cell,
        outcome: crate::simulation::ReactionOutcome,
        pending: &mut Vec<PendingExplosion>,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        match outcome.kind {
            ReactionKind::Transform => {
                view.write_next(x, y, materials.spawn(outcome.product_a, cell.temperature));
                view.write_next(nx, ny, materials.spawn(outcome.product_b, neighbor.temperature));
            }
            ReactionKind::Electrify => {
                // Conduction: the better conductor gains a charge layer,
                // nothing changes mass
                let neighbor_conducts = materials.get(neighbor.material).conductivity
                    >= materials.get(cell.material).conductivity;
                let (tx, ty, target) = if neighbor_conducts {
                    (nx, ny, neighbor)
                } else {
                    (x, y, cell)
                };
                let mut charged = target;
                charged.effect = Effect::new(EffectKind::Electrified, 220, 40);
                view.write_next(tx, ty, charged);
            }
            ReactionKind::Burn => {
                // The combustible side smolders; rare instant conversion
                let neighbor_burns = materials.get(neighbor.material).is_flammable();
                let (tx, ty, target, product) = if neighbor_burns {
                    (nx, ny, neighbor, outcome.product_b)
                } else {
                    (x, y, cell, outcome.product_a)
                };
                if rng.chance(config.burn_convert_chance) {
                    view.write_next(tx, ty, materials.spawn(product, target.temperature + 100.0));
                    stats.record_state_change();
                } else {
                    let mut lit = target;
                    lit.effect = Effect::new(EffectKind::Burning, 200, 160);
                    view.write_next(tx, ty, lit);
                }
            }
            ReactionKind::Explosive { power, radius } => {
                pending.push(PendingExplosion {
                    explosion: Explosion {
                        center: IVec2::new(x, y),
                        power,
                        radius,
                    },
                    site_a: (x, y, outcome.product_a),
                    site_b: (nx, ny, outcome.product_b),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::simulation::{EffectKind, MaterialId};
    use crate::world::SimulationWorld;

    #[test]
    fn water_on_lava_makes_steam_and_stone() {
        let mut world = SimulationWorld::with_seed(6, 8, 21);
        // Pin both liquids between stone walls
        for y in 0..4 {
            world.set_material(1, y, MaterialId::STONE);
            world.set_material(3, y, MaterialId::STONE);
        }
        world.set_material(2, 0, MaterialId::LAVA);
        world.set_material(2, 1, MaterialId::WATER);
        world.set_material(2, 2, MaterialId::WATER);
        world.set_material(2, 3, MaterialId::WATER);

        let mut converted = false;
        for _ in 0..400 {
            world.update(1.0 / 60.0);
            if world.count_material(MaterialId::STONE) > 8 {
                converted = true;
                break;
            }
        }
        assert!(converted, "quenching never produced stone");
    }

    #[test]
    fn acid_corrodes_metal_away() {
        let mut world = SimulationWorld::with_seed(6, 8, 21);
        // Acid resting on a metal floor
        for x in 0..6 {
            world.set_material(x, 0, MaterialId::METAL);
        }
        world.set_material(3, 1, MaterialId::ACID);

        let before = world.count_material(MaterialId::METAL);
        let mut corroded = false;
        for _ in 0..600 {
            world.update(1.0 / 60.0);
            if world.count_material(MaterialId::METAL) < before {
                corroded = true;
                break;
            }
        }
        assert!(corroded, "acid never corroded the metal");
    }

    #[test]
    fn spark_electrifies_metal_without_mass_change() {
        let mut world = SimulationWorld::with_seed(8, 8, 21);
        world.set_material(3, 0, MaterialId::METAL);
        world.set_material(4, 0, MaterialId::METAL);

        let mut electrified = false;
        for _ in 0..30 {
            world.set_material(3, 1, MaterialId::SPARK);
            world.update(1.0 / 60.0);
            for x in 0..8 {
                if let Some(cell) = world.cell_at(x, 0) {
                    if cell.effect.kind == EffectKind::Electrified {
                        electrified = true;
                    }
                }
            }
            if electrified {
                break;
            }
        }
        assert!(electrified, "spark never charged the metal");
        assert_eq!(world.count_material(MaterialId::METAL), 2);
    }

    #[test]
    fn gunpowder_blast_clears_a_crater() {
        let mut world = SimulationWorld::with_seed(24, 24, 21);
        for x in 6..18 {
            for y in 6..12 {
                world.set_material(x, y, MaterialId::GUNPOWDER);
            }
        }
        world.set_material(12, 11, MaterialId::FIRE);
        let before = world.count_material(MaterialId::GUNPOWDER);

        for _ in 0..120 {
            world.update(1.0 / 60.0);
        }
        let after = world.count_material(MaterialId::GUNPOWDER);
        assert!(after < before, "the charge never went off");
    }
}
