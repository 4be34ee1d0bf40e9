//! Explosion propagation
//!
//! Blast force falls off linearly with distance from the center. A cell
//! is destroyed only when the local force exceeds its hardness plus
//! explosive resistance; the force tier at the point of destruction
//! picks the debris left behind. Survivors near the blast get scorched
//! or ignited.

use glam::IVec2;

use crate::automata::GridView;
use crate::simulation::cell::{Effect, EffectKind};
use crate::simulation::materials::{MaterialId, MaterialRegistry};
use crate::world::{SimStats, WorldRng};

/// A pending blast: center cell, peak force, and reach in cells
#[derive(Clone, Copy, Debug)]
pub struct Explosion {
    pub center: IVec2,
    pub power: f32,
    pub radius: i32,
}

/// Temperature assigned to the fiery core of a blast
const BLAST_CORE_TEMPERATURE: f32 = 900.0;

pub struct ExplosionSystem;

impl ExplosionSystem {
    /// Apply one blast to the next grid
    pub fn apply<R: WorldRng + ?Sized>(
        view: &mut GridView,
        materials: &MaterialRegistry,
        explosion: Explosion,
        rng: &mut R,
        stats: &mut dyn SimStats,
    ) {
        let radius = explosion.radius.max(1);
        let power = explosion.power.max(0.0);
        let center = explosion.center;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let dist_sq = dx * dx + dy * dy;
                if dist_sq > radius * radius {
                    continue;
                }
                let x = center.x + dx;
                let y = center.y + dy;
                if !view.in_bounds(x, y) {
                    continue;
                }

                let dist = (dist_sq as f32).sqrt();
                let force = power * (1.0 - dist / radius as f32);
                let cell = view.next_cell(x, y);
                if cell.is_empty() {
                    continue;
                }

                let def = materials.get(cell.material);
                let resistance = def.hardness + def.blast_resistance;
                if force > resistance {
                    let debris = Self::debris_for(force / power);
                    let mut destroyed = materials.spawn(debris, BLAST_CORE_TEMPERATURE);
                    if debris == MaterialId::EMPTY || debris == MaterialId::ASH {
                        destroyed.effect = Effect::new(EffectKind::Blackened, 180, 255);
                        destroyed.temperature = cell.temperature + force * 20.0;
                    }
                    view.write_next(x, y, destroyed);
                }
            }
        }

        // Scorch ring: survivors just past the destruction front pick up
        // blackening, and flammables may catch
        let reach = radius + 1;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let dist_sq = dx * dx + dy * dy;
                if dist_sq > reach * reach {
                    continue;
                }
                let x = center.x + dx;
                let y = center.y + dy;
                if !view.in_bounds(x, y) {
                    continue;
                }

                let cell = view.next_cell(x, y);
                if cell.is_empty() || !cell.effect.is_none() {
                    continue;
                }
                let def = materials.get(cell.material);
                let dist = (dist_sq as f32).sqrt();
                let force = power * (1.0 - dist / reach as f32);
                if force <= 0.0 {
                    continue;
                }

                let mut scorched = cell;
                if def.is_flammable() && rng.chance((force * 0.05).min(0.9)) {
                    scorched.effect = Effect::new(EffectKind::Burning, 200, 120);
                } else if rng.chance((force * 0.08).min(0.9)) {
                    scorched.effect = Effect::new(EffectKind::Blackened, (force * 25.0).min(255.0) as u8, 255);
                }
                if scorched != cell {
                    view.write_next(x, y, scorched);
                }
            }
        }

        stats.record_explosion();
    }

    /// Debris tier: the hotter the local force relative to the blast's
    /// peak, the more energetic the leftover
    fn debris_for(force_fraction: f32) -> u16 {
        if force_fraction >= 0.75 {
            MaterialId::FIRE
        } else if force_fraction >= 0.5 {
            MaterialId::SMOKE
        } else if force_fraction >= 0.25 {
            MaterialId::ASH
        } else {
            MaterialId::EMPTY
        }
    }
}
