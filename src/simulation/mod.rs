//! Simulation data and passes - cells, materials, reactions, temperature

pub mod cell;
mod explosion;
mod materials;
pub mod reactions;
pub mod temperature;

pub use cell::{Cell, CellFlags, Effect, EffectKind, AMBIENT_TEMPERATURE};
pub use explosion::{Explosion, ExplosionSystem};
pub use materials::{
    Behavior, FireParams, GasParams, LiquidParams, MaterialDef, MaterialId, MaterialRegistry,
    MaterialState, PowderParams,
};
pub use reactions::{MaterialReaction, ReactionKind, ReactionOutcome};
pub use temperature::TemperatureSystem;
