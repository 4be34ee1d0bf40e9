//! Material definitions and registry

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::simulation::cell::Cell;
use crate::simulation::reactions::{MaterialReaction, ReactionOutcome};
use crate::world::WorldRng;

/// Built-in material ids
pub struct MaterialId;

impl MaterialId {
    pub const EMPTY: u16 = 0;
    pub const STONE: u16 = 1;
    pub const SAND: u16 = 2;
    pub const WATER: u16 = 3;
    pub const WOOD: u16 = 4;
    pub const FIRE: u16 = 5;
    pub const SMOKE: u16 = 6;
    pub const STEAM: u16 = 7;
    pub const LAVA: u16 = 8;
    pub const OIL: u16 = 9;
    pub const ACID: u16 = 10;
    pub const ICE: u16 = 11;
    pub const GLASS: u16 = 12;
    pub const METAL: u16 = 13;
    pub const BEDROCK: u16 = 14;
    pub const ASH: u16 = 15;
    pub const GUNPOWDER: u16 = 16;
    pub const TOXIC_GAS: u16 = 17;
    pub const SPARK: u16 = 18;
}

/// Physical state of matter. Descriptive only; movement is driven by
/// [`Behavior`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialState {
    #[default]
    Solid,
    Liquid,
    Gas,
    Plasma,
}

/// Tuning for powder movement
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PowderParams {
    /// Pile-height difference (in cells) that triggers lateral sliding
    pub angle_of_repose: u8,
    /// Chance per frame to resist any movement at all
    pub cohesion: f32,
    /// Pile depth below that counts as support for the settled check
    pub settle_support: u8,
}

impl Default for PowderParams {
    fn default() -> Self {
        Self {
            angle_of_repose: 2,
            cohesion: 0.0,
            settle_support: 3,
        }
    }
}

/// Tuning for liquid movement
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiquidParams {
    /// Maximum lateral cells per frame; derived from viscosity at
    /// registration time for the built-in roster
    pub flow_rate: u8,
    /// Refuses to sink through denser liquids; flows sideways or rises
    pub buoyant: bool,
    /// Named pairs that never lateral-mix, only separate vertically
    pub immiscible_with: Vec<u16>,
}

impl Default for LiquidParams {
    fn default() -> Self {
        Self {
            flow_rate: 3,
            buoyant: false,
            immiscible_with: Vec::new(),
        }
    }
}

/// Tuning for gas movement and decay
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GasParams {
    /// Probability that a movement attempt points upward
    pub rise_bias: f32,
    /// Probability that a movement attempt gains a horizontal component
    pub turbulence: f32,
    /// Chance per frame to lose one life point
    pub dissipation: f32,
    /// Life assigned when the gas is created
    pub initial_life: u8,
    /// Condensation product, applied below `condense_below`
    pub condenses_to: Option<u16>,
    pub condense_below: Option<f32>,
}

impl Default for GasParams {
    fn default() -> Self {
        Self {
            rise_bias: 0.7,
            turbulence: 0.4,
            dissipation: 0.05,
            initial_life: 120,
            condenses_to: None,
            condense_below: None,
        }
    }
}

/// Tuning for fire movement and spread
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FireParams {
    /// Life assigned when the fire is created
    pub lifetime: u8,
    /// Probability of lateral drift while rising
    pub drift: f32,
    /// Per-neighbor, per-frame ignition probability for combustibles
    pub ignite_chance: f32,
}

impl Default for FireParams {
    fn default() -> Self {
        Self {
            lifetime: 40,
            drift: 0.3,
            ignite_chance: 0.08,
        }
    }
}

/// Algorithm class a material uses, carrying only the parameters that
/// algorithm needs
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum Behavior {
    #[default]
    Static,
    Powder(PowderParams),
    Liquid(LiquidParams),
    Gas(GasParams),
    Fire(FireParams),
}

impl Behavior {
    pub fn is_static(&self) -> bool {
        matches!(self, Behavior::Static)
    }

    pub fn is_powder(&self) -> bool {
        matches!(self, Behavior::Powder(_))
    }

    pub fn is_liquid(&self) -> bool {
        matches!(self, Behavior::Liquid(_))
    }

    pub fn is_gas(&self) -> bool {
        matches!(self, Behavior::Gas(_))
    }

    pub fn is_fire(&self) -> bool {
        matches!(self, Behavior::Fire(_))
    }

    /// Gases and fire float; everything else falls
    pub fn rises(&self) -> bool {
        self.is_gas() || self.is_fire()
    }
}

/// Definition of a material's identity, properties, and reactions
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDef {
    pub id: u16,
    pub name: String,
    pub state: MaterialState,
    pub behavior: Behavior,

    /// Base color (RGBA)
    pub color: [u8; 4],

    // Physical properties
    /// Density (g/cm3); drives displacement ordering
    pub density: f32,
    /// Flow resistance (0.0 - 1.0, liquids)
    pub viscosity: f32,
    /// Sliding resistance (0.0 - 1.0, powders)
    pub friction: f32,
    /// Resistance to blast destruction
    pub hardness: f32,
    /// Extra blast resistance on top of hardness
    pub blast_resistance: f32,

    // Thermal properties
    pub melting_point: Option<f32>,
    pub boiling_point: Option<f32>,
    pub freezing_point: Option<f32>,
    pub ignition_point: Option<f32>,
    /// Heat conductivity (0.0 - 1.0)
    pub conductivity: f32,
    /// Scales how quickly diffusion changes this material's temperature
    pub heat_capacity: f32,

    // State transitions
    pub melts_to: Option<u16>,
    pub boils_to: Option<u16>,
    pub freezes_to: Option<u16>,
    /// What burning leaves behind
    pub burns_to: Option<u16>,
    /// Chance per frame that a burning cell converts to `burns_to`
    pub burn_rate: f32,

    // Optical properties
    /// Self-illumination (0.0 - 1.0); also gates the heat glow shift
    pub emission: f32,
    pub reflectivity: f32,
    pub transparency: f32,

    /// Temperature forced onto freshly spawned cells (fire, lava, ...)
    pub spawn_temperature: Option<f32>,

    /// Ordered reaction list; first eligible entry wins
    pub reactions: Vec<MaterialReaction>,
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            state: MaterialState::Solid,
            behavior: Behavior::Static,
            color: [255, 0, 255, 255], // Magenta for missing materials
            density: 1.0,
            viscosity: 0.5,
            friction: 0.5,
            hardness: 1.0,
            blast_resistance: 0.0,
            melting_point: None,
            boiling_point: None,
            freezing_point: None,
            ignition_point: None,
            conductivity: 0.5,
            heat_capacity: 1.0,
            melts_to: None,
            boils_to: None,
            freezes_to: None,
            burns_to: None,
            burn_rate: 0.0,
            emission: 0.0,
            reflectivity: 0.0,
            transparency: 0.0,
            spawn_temperature: None,
            reactions: Vec::new(),
        }
    }
}

impl MaterialDef {
    pub fn is_flammable(&self) -> bool {
        self.ignition_point.is_some()
    }
}

/// Registry of all materials
///
/// Owned by the simulation context; never accessed through globals, so
/// independent worlds can carry independent rosters.
pub struct MaterialRegistry {
    defs: Vec<MaterialDef>,
    by_name: AHashMap<String, u16>,
}

impl MaterialRegistry {
    /// Registry with the built-in roster and reaction set
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_defaults();
        crate::simulation::reactions::register_default_reactions(&mut registry);
        registry
    }

    /// Registry containing only the reserved empty material
    pub fn empty() -> Self {
        let mut registry = Self {
            defs: Vec::new(),
            by_name: AHashMap::new(),
        };
        registry.register(MaterialDef {
            id: MaterialId::EMPTY,
            name: "empty".to_string(),
            state: MaterialState::Gas,
            behavior: Behavior::Static,
            color: [0, 0, 0, 0],
            density: 0.0,
            hardness: 0.0,
            ..Default::default()
        });
        registry
    }

    /// Register a material, idempotent by name: re-registering a known
    /// name returns the existing id without touching its definition.
    pub fn create_material(&mut self, name: &str) -> u16 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.defs.len() as u16;
        self.register(MaterialDef {
            id,
            name: name.to_string(),
            ..Default::default()
        });
        id
    }

    /// Insert or replace a full definition at its declared id
    pub fn register(&mut self, material: MaterialDef) {
        let id = material.id as usize;
        if self.defs.len() <= id {
            self.defs.resize(id + 1, MaterialDef::default());
        }
        self.by_name.insert(material.name.clone(), material.id);
        self.defs[id] = material;
    }

    /// Get a definition by id; unregistered ids resolve to the empty
    /// sentinel instead of failing
    pub fn get(&self, id: u16) -> &MaterialDef {
        self.defs
            .get(id as usize)
            .filter(|def| !def.name.is_empty())
            .unwrap_or(&self.defs[0])
    }

    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    pub fn has(&self, id: u16) -> bool {
        self.defs
            .get(id as usize)
            .is_some_and(|def| !def.name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Append a reaction to a material's ordered list
    pub fn add_reaction(&mut self, owner: u16, reaction: MaterialReaction) {
        if let Some(def) = self.defs.get_mut(owner as usize) {
            def.reactions.push(reaction);
        }
    }

    /// Look up a reaction between two adjacent materials.
    ///
    /// Scans `a`'s ordered reaction list for `b` as reactant, then `b`'s
    /// list for `a`. The first entry whose temperature gate is met decides
    /// the outcome: its probability is rolled once, and a miss means
    /// nothing happens this frame. Only one reaction may apply per cell
    /// per frame; cascading is deliberately impossible within a step.
    pub fn try_react<R: WorldRng + ?Sized>(
        &self,
        a: u16,
        b: u16,
        temperature: f32,
        rng: &mut R,
    ) -> Option<ReactionOutcome> {
        if let Some(reaction) = self.first_eligible(a, b, temperature) {
            if !rng.chance(reaction.probability) {
                return None;
            }
            return Some(ReactionOutcome {
                product_a: reaction.product_self,
                product_b: reaction.product_other,
                kind: reaction.kind.clone(),
            });
        }
        if let Some(reaction) = self.first_eligible(b, a, temperature) {
            if !rng.chance(reaction.probability) {
                return None;
            }
            return Some(ReactionOutcome {
                product_a: reaction.product_other,
                product_b: reaction.product_self,
                kind: reaction.kind.clone(),
            });
        }
        None
    }

    fn first_eligible(&self, owner: u16, reactant: u16, temperature: f32) -> Option<&MaterialReaction> {
        self.get(owner)
            .reactions
            .iter()
            .find(|r| r.reactant == reactant && r.min_temp.map_or(true, |t| temperature >= t))
    }

    /// Build a cell of the given material, initializing behavior decay
    /// counters and any forced spawn temperature
    pub fn spawn(&self, id: u16, temperature: f32) -> Cell {
        let def = self.get(id);
        let mut cell = Cell::new(def.id);
        cell.temperature = def.spawn_temperature.unwrap_or(temperature);
        match &def.behavior {
            Behavior::Gas(params) => cell.life = params.initial_life,
            Behavior::Fire(params) => cell.life = params.lifetime,
            _ => {}
        }
        cell
    }

    fn register_defaults(&mut self) {
        self.register(MaterialDef {
            id: MaterialId::STONE,
            name: "stone".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Static,
            color: [128, 128, 128, 255],
            density: 2.5,
            hardness: 5.0,
            blast_resistance: 2.0,
            melting_point: Some(1200.0),
            melts_to: Some(MaterialId::LAVA),
            conductivity: 0.3,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::SAND,
            name: "sand".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Powder(PowderParams {
                angle_of_repose: 2,
                cohesion: 0.0,
                settle_support: 3,
            }),
            color: [194, 178, 128, 255],
            density: 1.5,
            friction: 0.3,
            hardness: 1.0,
            melting_point: Some(1700.0),
            melts_to: Some(MaterialId::GLASS),
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::WATER,
            name: "water".to_string(),
            state: MaterialState::Liquid,
            behavior: Behavior::Liquid(LiquidParams {
                flow_rate: 4,
                buoyant: false,
                immiscible_with: vec![MaterialId::OIL, MaterialId::LAVA],
            }),
            color: [64, 164, 223, 200],
            density: 1.0,
            viscosity: 0.1,
            hardness: 0.0,
            boiling_point: Some(100.0),
            boils_to: Some(MaterialId::STEAM),
            freezing_point: Some(0.0),
            freezes_to: Some(MaterialId::ICE),
            conductivity: 0.6,
            transparency: 0.4,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::WOOD,
            name: "wood".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Static,
            color: [139, 90, 43, 255],
            density: 0.6,
            hardness: 2.0,
            ignition_point: Some(300.0),
            burns_to: Some(MaterialId::ASH),
            burn_rate: 0.02,
            conductivity: 0.2,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::FIRE,
            name: "fire".to_string(),
            state: MaterialState::Plasma,
            behavior: Behavior::Fire(FireParams {
                lifetime: 40,
                drift: 0.3,
                ignite_chance: 0.08,
            }),
            color: [255, 100, 0, 255],
            density: 0.0001,
            hardness: 0.0,
            emission: 1.0,
            spawn_temperature: Some(800.0),
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::SMOKE,
            name: "smoke".to_string(),
            state: MaterialState::Gas,
            behavior: Behavior::Gas(GasParams {
                rise_bias: 0.75,
                turbulence: 0.5,
                dissipation: 0.04,
                initial_life: 110,
                condenses_to: None,
                condense_below: None,
            }),
            color: [60, 60, 60, 150],
            density: 0.001,
            hardness: 0.0,
            transparency: 0.5,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::STEAM,
            name: "steam".to_string(),
            state: MaterialState::Gas,
            behavior: Behavior::Gas(GasParams {
                rise_bias: 0.8,
                turbulence: 0.4,
                dissipation: 0.02,
                initial_life: 160,
                condenses_to: Some(MaterialId::WATER),
                condense_below: Some(95.0),
            }),
            color: [200, 200, 200, 100],
            density: 0.0006,
            hardness: 0.0,
            transparency: 0.7,
            spawn_temperature: Some(110.0),
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::LAVA,
            name: "lava".to_string(),
            state: MaterialState::Liquid,
            behavior: Behavior::Liquid(LiquidParams {
                flow_rate: 1,
                buoyant: false,
                immiscible_with: vec![MaterialId::WATER],
            }),
            color: [255, 80, 0, 255],
            density: 3.0,
            viscosity: 0.8,
            hardness: 0.0,
            freezing_point: Some(700.0),
            freezes_to: Some(MaterialId::STONE),
            conductivity: 0.8,
            emission: 0.9,
            spawn_temperature: Some(1100.0),
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::OIL,
            name: "oil".to_string(),
            state: MaterialState::Liquid,
            behavior: Behavior::Liquid(LiquidParams {
                flow_rate: 3,
                buoyant: true,
                immiscible_with: vec![MaterialId::WATER],
            }),
            color: [50, 40, 30, 255],
            density: 0.8,
            viscosity: 0.3,
            hardness: 0.0,
            ignition_point: Some(200.0),
            burns_to: Some(MaterialId::SMOKE),
            burn_rate: 0.05,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::ACID,
            name: "acid".to_string(),
            state: MaterialState::Liquid,
            behavior: Behavior::Liquid(LiquidParams {
                flow_rate: 4,
                buoyant: false,
                immiscible_with: Vec::new(),
            }),
            color: [0, 255, 0, 200],
            density: 1.1,
            viscosity: 0.2,
            hardness: 0.0,
            transparency: 0.3,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::ICE,
            name: "ice".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Static,
            color: [200, 230, 255, 200],
            density: 0.9,
            hardness: 2.0,
            melting_point: Some(0.0),
            melts_to: Some(MaterialId::WATER),
            conductivity: 0.4,
            reflectivity: 0.3,
            transparency: 0.4,
            spawn_temperature: Some(-20.0),
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::GLASS,
            name: "glass".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Static,
            color: [200, 220, 255, 150],
            density: 2.5,
            hardness: 3.0,
            melting_point: Some(1400.0),
            melts_to: Some(MaterialId::LAVA),
            reflectivity: 0.4,
            transparency: 0.8,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::METAL,
            name: "metal".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Static,
            color: [180, 180, 190, 255],
            density: 7.8,
            hardness: 7.0,
            blast_resistance: 3.0,
            melting_point: Some(1500.0),
            melts_to: Some(MaterialId::LAVA),
            conductivity: 0.9,
            reflectivity: 0.6,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::BEDROCK,
            name: "bedrock".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Static,
            color: [40, 40, 50, 255],
            density: 100.0,
            hardness: 1000.0,
            blast_resistance: 1000.0,
            conductivity: 0.1,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::ASH,
            name: "ash".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Powder(PowderParams {
                angle_of_repose: 1,
                cohesion: 0.1,
                settle_support: 2,
            }),
            color: [128, 128, 128, 200],
            density: 0.5,
            friction: 0.1,
            hardness: 0.5,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::GUNPOWDER,
            name: "gunpowder".to_string(),
            state: MaterialState::Solid,
            behavior: Behavior::Powder(PowderParams {
                angle_of_repose: 2,
                cohesion: 0.05,
                settle_support: 2,
            }),
            color: [64, 64, 64, 255],
            density: 1.7,
            friction: 0.2,
            hardness: 1.0,
            ignition_point: Some(150.0),
            burns_to: Some(MaterialId::SMOKE),
            burn_rate: 0.9,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::TOXIC_GAS,
            name: "toxic_gas".to_string(),
            state: MaterialState::Gas,
            behavior: Behavior::Gas(GasParams {
                rise_bias: 0.55,
                turbulence: 0.6,
                dissipation: 0.01,
                initial_life: 200,
                condenses_to: None,
                condense_below: None,
            }),
            color: [50, 205, 50, 150],
            density: 0.002,
            hardness: 0.0,
            transparency: 0.5,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::SPARK,
            name: "spark".to_string(),
            state: MaterialState::Plasma,
            behavior: Behavior::Fire(FireParams {
                lifetime: 8,
                drift: 0.6,
                ignite_chance: 0.25,
            }),
            color: [255, 255, 160, 255],
            density: 0.0001,
            hardness: 0.0,
            emission: 1.0,
            spawn_temperature: Some(400.0),
            ..Default::default()
        });
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn builtin_roster_is_registered() {
        let registry = MaterialRegistry::new();
        assert!(registry.has(MaterialId::EMPTY));
        assert!(registry.has(MaterialId::SAND));
        assert!(registry.has(MaterialId::SPARK));
        assert_eq!(registry.id_of("water"), Some(MaterialId::WATER));
        assert_eq!(registry.get(MaterialId::OIL).name, "oil");
    }

    #[test]
    fn unregistered_id_resolves_to_empty_sentinel() {
        let registry = MaterialRegistry::new();
        let def = registry.get(9999);
        assert_eq!(def.id, MaterialId::EMPTY);
        assert_eq!(def.name, "empty");
        assert!(!registry.has(9999));
    }

    #[test]
    fn create_material_is_idempotent_by_name() {
        let mut registry = MaterialRegistry::new();
        let first = registry.create_material("slime");
        let second = registry.create_material("slime");
        assert_eq!(first, second);
        assert!(registry.has(first));
        assert_eq!(registry.get(first).name, "slime");
    }

    #[test]
    fn create_material_returns_builtin_id_for_builtin_name() {
        let mut registry = MaterialRegistry::new();
        assert_eq!(registry.create_material("sand"), MaterialId::SAND);
    }

    #[test]
    fn empty_material_has_no_behavior() {
        let registry = MaterialRegistry::new();
        assert!(registry.get(MaterialId::EMPTY).behavior.is_static());
        assert_eq!(registry.get(MaterialId::EMPTY).density, 0.0);
    }

    #[test]
    fn temperature_gate_rejects_cold_reactions() {
        let mut registry = MaterialRegistry::empty();
        let a = registry.create_material("a");
        let b = registry.create_material("b");
        registry.add_reaction(
            a,
            MaterialReaction {
                reactant: b,
                product_self: MaterialId::EMPTY,
                product_other: MaterialId::EMPTY,
                probability: 1.0,
                min_temp: Some(500.0),
                kind: crate::simulation::ReactionKind::Transform,
            },
        );

        let mut rng = Xoshiro256StarStar::seed_from_u64(7);
        assert!(registry.try_react(a, b, 20.0, &mut rng).is_none());
        assert!(registry.try_react(a, b, 600.0, &mut rng).is_some());
    }

    #[test]
    fn reaction_orientation_flips_products() {
        let mut registry = MaterialRegistry::empty();
        let a = registry.create_material("a");
        let b = registry.create_material("b");
        let x = registry.create_material("x");
        let y = registry.create_material("y");
        registry.add_reaction(
            a,
            MaterialReaction {
                reactant: b,
                product_self: x,
                product_other: y,
                probability: 1.0,
                min_temp: None,
                kind: crate::simulation::ReactionKind::Transform,
            },
        );

        let mut rng = Xoshiro256StarStar::seed_from_u64(7);
        let forward = registry.try_react(a, b, 20.0, &mut rng).unwrap();
        assert_eq!((forward.product_a, forward.product_b), (x, y));

        let reverse = registry.try_react(b, a, 20.0, &mut rng).unwrap();
        assert_eq!((reverse.product_a, reverse.product_b), (y, x));
    }
}
