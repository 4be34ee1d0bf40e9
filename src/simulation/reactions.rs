//! Material reactions
//!
//! A reaction is a probabilistic, optionally temperature-gated
//! transformation triggered by two adjacent materials. Reactions are
//! owned by a material as an ordered list; the first eligible entry
//! decides what happens, so at most one reaction can fire per cell per
//! frame and cascades within a single step are impossible.

use serde::{Deserialize, Serialize};

use crate::simulation::materials::{MaterialId, MaterialRegistry};

/// How a matched reaction is applied
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ReactionKind {
    /// Replace the cell and/or neighbor material outright
    #[default]
    Transform,
    /// Paint an Electrified effect layer on the partner instead of
    /// changing material; models conduction without mass change
    Electrify,
    /// Paint a Burning effect layer on the combustible partner; actual
    /// conversion to the burn product is rare, so fuel is consumed
    /// gradually instead of instantly
    Burn,
    /// Run the explosion algorithm at the site, then apply the products
    Explosive { power: f32, radius: i32 },
}

/// One entry in a material's ordered reaction list
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialReaction {
    /// The adjacent material that triggers this entry
    pub reactant: u16,
    /// Product for the owning material (EMPTY = vanish)
    pub product_self: u16,
    /// Product for the reactant (EMPTY = vanish)
    pub product_other: u16,
    /// Per-frame probability once adjacency and temperature are met
    pub probability: f32,
    /// Minimum temperature gate, if any
    pub min_temp: Option<f32>,
    pub kind: ReactionKind,
}

/// A matched reaction, oriented so `product_a` applies to the first
/// material passed to `try_react`
#[derive(Clone, Debug)]
pub struct ReactionOutcome {
    pub product_a: u16,
    pub product_b: u16,
    pub kind: ReactionKind,
}

/// Install the built-in reaction set onto the built-in roster
pub fn register_default_reactions(registry: &mut MaterialRegistry) {
    // Water + lava quenches: steam above fresh stone
    registry.add_reaction(
        MaterialId::WATER,
        MaterialReaction {
            reactant: MaterialId::LAVA,
            product_self: MaterialId::STEAM,
            product_other: MaterialId::STONE,
            probability: 0.3,
            min_temp: None,
            kind: ReactionKind::Transform,
        },
    );

    // Ice + lava cools without boiling everything at once
    registry.add_reaction(
        MaterialId::ICE,
        MaterialReaction {
            reactant: MaterialId::LAVA,
            product_self: MaterialId::WATER,
            product_other: MaterialId::STONE,
            probability: 0.4,
            min_temp: None,
            kind: ReactionKind::Transform,
        },
    );

    // Corrosion family: acid eats through metal, stone, and wood at
    // different rates, surviving the stone and wood cases
    registry.add_reaction(
        MaterialId::ACID,
        MaterialReaction {
            reactant: MaterialId::METAL,
            product_self: MaterialId::TOXIC_GAS,
            product_other: MaterialId::EMPTY,
            probability: 0.05,
            min_temp: None,
            kind: ReactionKind::Transform,
        },
    );
    registry.add_reaction(
        MaterialId::ACID,
        MaterialReaction {
            reactant: MaterialId::STONE,
            product_self: MaterialId::ACID,
            product_other: MaterialId::EMPTY,
            probability: 0.01,
            min_temp: None,
            kind: ReactionKind::Transform,
        },
    );
    registry.add_reaction(
        MaterialId::ACID,
        MaterialReaction {
            reactant: MaterialId::WOOD,
            product_self: MaterialId::ACID,
            product_other: MaterialId::EMPTY,
            probability: 0.03,
            min_temp: None,
            kind: ReactionKind::Transform,
        },
    );

    // Toxic gas dissolves into water as acid
    registry.add_reaction(
        MaterialId::TOXIC_GAS,
        MaterialReaction {
            reactant: MaterialId::WATER,
            product_self: MaterialId::EMPTY,
            product_other: MaterialId::ACID,
            probability: 0.03,
            min_temp: None,
            kind: ReactionKind::Transform,
        },
    );

    // Sand vitrifies against lava once things are hot enough
    registry.add_reaction(
        MaterialId::SAND,
        MaterialReaction {
            reactant: MaterialId::LAVA,
            product_self: MaterialId::GLASS,
            product_other: MaterialId::LAVA,
            probability: 0.02,
            min_temp: Some(800.0),
            kind: ReactionKind::Transform,
        },
    );

    // Growth/burn pair: fire and lava smolder wood and oil rather than
    // deleting them outright
    registry.add_reaction(
        MaterialId::FIRE,
        MaterialReaction {
            reactant: MaterialId::WOOD,
            product_self: MaterialId::FIRE,
            product_other: MaterialId::ASH,
            probability: 0.15,
            min_temp: None,
            kind: ReactionKind::Burn,
        },
    );
    registry.add_reaction(
        MaterialId::FIRE,
        MaterialReaction {
            reactant: MaterialId::OIL,
            product_self: MaterialId::FIRE,
            product_other: MaterialId::FIRE,
            probability: 0.25,
            min_temp: None,
            kind: ReactionKind::Burn,
        },
    );
    registry.add_reaction(
        MaterialId::LAVA,
        MaterialReaction {
            reactant: MaterialId::WOOD,
            product_self: MaterialId::LAVA,
            product_other: MaterialId::ASH,
            probability: 0.1,
            min_temp: None,
            kind: ReactionKind::Burn,
        },
    );

    // Gunpowder detonates on contact with fire
    registry.add_reaction(
        MaterialId::GUNPOWDER,
        MaterialReaction {
            reactant: MaterialId::FIRE,
            product_self: MaterialId::SMOKE,
            product_other: MaterialId::SMOKE,
            probability: 0.9,
            min_temp: None,
            kind: ReactionKind::Explosive {
                power: 12.0,
                radius: 6,
            },
        },
    );

    // Sparks conduct: effect layer only, no mass change
    registry.add_reaction(
        MaterialId::SPARK,
        MaterialReaction {
            reactant: MaterialId::METAL,
            product_self: MaterialId::SPARK,
            product_other: MaterialId::METAL,
            probability: 0.8,
            min_temp: None,
            kind: ReactionKind::Electrify,
        },
    );
    registry.add_reaction(
        MaterialId::SPARK,
        MaterialReaction {
            reactant: MaterialId::WATER,
            product_self: MaterialId::SPARK,
            product_other: MaterialId::WATER,
            probability: 0.6,
            min_temp: None,
            kind: ReactionKind::Electrify,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn water_lava_reacts_both_ways() {
        let registry = MaterialRegistry::new();
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);

        let mut hit = 0;
        for _ in 0..200 {
            if let Some(outcome) =
                registry.try_react(MaterialId::WATER, MaterialId::LAVA, 20.0, &mut rng)
            {
                assert_eq!(outcome.product_a, MaterialId::STEAM);
                assert_eq!(outcome.product_b, MaterialId::STONE);
                hit += 1;
            }
            if let Some(outcome) =
                registry.try_react(MaterialId::LAVA, MaterialId::WATER, 20.0, &mut rng)
            {
                assert_eq!(outcome.product_a, MaterialId::STONE);
                assert_eq!(outcome.product_b, MaterialId::STEAM);
                hit += 1;
            }
        }
        // probability 0.3 over 400 rolls
        assert!(hit > 50, "expected regular matches, got {hit}");
    }

    #[test]
    fn sand_water_has_no_reaction() {
        let registry = MaterialRegistry::new();
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        for _ in 0..100 {
            assert!(registry
                .try_react(MaterialId::SAND, MaterialId::WATER, 20.0, &mut rng)
                .is_none());
        }
    }

    #[test]
    fn vitrification_needs_heat() {
        let registry = MaterialRegistry::new();
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        for _ in 0..500 {
            assert!(registry
                .try_react(MaterialId::SAND, MaterialId::LAVA, 20.0, &mut rng)
                .is_none());
        }
        let mut hit = false;
        for _ in 0..2000 {
            if registry
                .try_react(MaterialId::SAND, MaterialId::LAVA, 900.0, &mut rng)
                .is_some()
            {
                hit = true;
                break;
            }
        }
        assert!(hit);
    }

    #[test]
    fn gunpowder_reaction_is_explosive() {
        let registry = MaterialRegistry::new();
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let mut seen = false;
        for _ in 0..50 {
            if let Some(outcome) =
                registry.try_react(MaterialId::GUNPOWDER, MaterialId::FIRE, 20.0, &mut rng)
            {
                assert!(matches!(
                    outcome.kind,
                    ReactionKind::Explosive { power, radius } if power > 0.0 && radius > 0
                ));
                seen = true;
                break;
            }
        }
        assert!(seen);
    }
}
