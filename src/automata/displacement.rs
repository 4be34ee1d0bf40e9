//! Density-based displacement
//!
//! Decides whether a mover may take an occupied cell's place, swapping
//! the occupant into the vacated slot. Rules, in priority order:
//! static targets are never displaced; denser movers sink through
//! lighter targets of compatible class (powders through liquids and
//! gases, never through other powders); lighter movers rise through
//! denser targets (gases and fire float through liquids and powders);
//! two liquids swap when their densities differ enough, except named
//! immiscible pairs, which only separate vertically; and a liquid never
//! displaces a powder - only a powder falling into a liquid swaps.

use crate::automata::GridView;
use crate::simulation::{Behavior, Cell, MaterialDef, MaterialRegistry};
use crate::world::SimStats;

/// Can `mover` take `target`'s cell? `swap_threshold` is the minimum
/// density difference for liquid-liquid swaps.
pub fn can_displace(mover: &MaterialDef, target: &MaterialDef, swap_threshold: f32) -> bool {
    if target.behavior.is_static() {
        return false;
    }
    match &mover.behavior {
        Behavior::Static => false,
        Behavior::Powder(_) => {
            // Powders stack; they never swap with other powders
            !target.behavior.is_powder()
                && !target.behavior.is_static()
                && mover.density > target.density
        }
        Behavior::Gas(_) | Behavior::Fire(_) => {
            (target.behavior.is_liquid() || target.behavior.is_powder())
                && mover.density < target.density
        }
        Behavior::Liquid(_) => {
            if target.behavior.is_powder() {
                return false;
            }
            if target.behavior.is_gas() || target.behavior.is_fire() {
                return mover.density > target.density;
            }
            if target.behavior.is_liquid() {
                // Denser liquid sinks; immiscibility only restricts
                // lateral motion and is checked by the caller
                return mover.density - target.density >= swap_threshold;
            }
            false
        }
    }
}

/// True when the two liquids are a named pair that must not blend
pub fn immiscible(a: &MaterialDef, b: &MaterialDef) -> bool {
    let listed = |def: &MaterialDef, other: u16| match &def.behavior {
        Behavior::Liquid(params) => params.immiscible_with.contains(&other),
        _ => false,
    };
    listed(a, b.id) || listed(b, a.id)
}

/// One movement step: claim an open destination, or displace a lighter
/// occupant. Returns true if the mover left its cell.
pub fn try_step(
    view: &mut GridView,
    materials: &MaterialRegistry,
    swap_threshold: f32,
    fx: i32,
    fy: i32,
    tx: i32,
    ty: i32,
    mover: Cell,
    mover_def: &MaterialDef,
    stats: &mut dyn SimStats,
) -> bool {
    if !view.in_bounds(tx, ty) {
        return false;
    }

    if view.is_open(tx, ty) {
        if view.commit_move(fx, fy, tx, ty, mover) {
            stats.record_cell_moved();
            return true;
        }
        return false;
    }

    let target = view.cell(tx, ty);
    if target.is_empty() {
        // Empty in current but claimed in next: contested, leave it
        return false;
    }
    let target_def = materials.get(target.material);
    if !can_displace(mover_def, target_def, swap_threshold) {
        return false;
    }
    // Immiscible liquid pairs only pass each other vertically
    if mover_def.behavior.is_liquid()
        && target_def.behavior.is_liquid()
        && fx != tx
        && immiscible(mover_def, target_def)
    {
        return false;
    }

    if view.commit_swap(fx, fy, tx, ty, mover) {
        stats.record_cell_moved();
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{MaterialId, MaterialRegistry};

    fn defs(registry: &MaterialRegistry, a: u16, b: u16) -> (&MaterialDef, &MaterialDef) {
        (registry.get(a), registry.get(b))
    }

    #[test]
    fn static_materials_are_never_displaced() {
        let registry = MaterialRegistry::new();
        let (lava, stone) = defs(&registry, MaterialId::LAVA, MaterialId::STONE);
        assert!(!can_displace(lava, stone, 0.15));
        let (sand, bedrock) = defs(&registry, MaterialId::SAND, MaterialId::BEDROCK);
        assert!(!can_displace(sand, bedrock, 0.15));
    }

    #[test]
    fn powder_sinks_through_liquid_but_not_powder() {
        let registry = MaterialRegistry::new();
        let (sand, water) = defs(&registry, MaterialId::SAND, MaterialId::WATER);
        assert!(can_displace(sand, water, 0.15));
        let (sand, ash) = defs(&registry, MaterialId::SAND, MaterialId::ASH);
        assert!(!can_displace(sand, ash, 0.15));
    }

    #[test]
    fn liquid_never_displaces_powder() {
        let registry = MaterialRegistry::new();
        let (water, ash) = defs(&registry, MaterialId::WATER, MaterialId::ASH);
        // Ash is lighter than water, but the powder keeps its cell
        assert!(!can_displace(water, ash, 0.15));
    }

    #[test]
    fn gas_rises_through_liquid() {
        let registry = MaterialRegistry::new();
        let (steam, water) = defs(&registry, MaterialId::STEAM, MaterialId::WATER);
        assert!(can_displace(steam, water, 0.15));
        let (water, steam) = defs(&registry, MaterialId::WATER, MaterialId::STEAM);
        assert!(can_displace(water, steam, 0.15));
    }

    #[test]
    fn liquids_swap_only_past_the_threshold() {
        let registry = MaterialRegistry::new();
        let (water, oil) = defs(&registry, MaterialId::WATER, MaterialId::OIL);
        // 1.0 vs 0.8
        assert!(can_displace(water, oil, 0.15));
        assert!(!can_displace(oil, water, 0.15));
        assert!(!can_displace(water, oil, 0.5));
    }

    #[test]
    fn water_and_oil_are_immiscible() {
        let registry = MaterialRegistry::new();
        let (water, oil) = defs(&registry, MaterialId::WATER, MaterialId::OIL);
        assert!(immiscible(water, oil));
        let (water, acid) = defs(&registry, MaterialId::WATER, MaterialId::ACID);
        assert!(!immiscible(water, acid));
    }
}
