//! # Cinderbox - falling-sand material simulation engine
//!
//! A 2D grid of cells, each holding a material id and auxiliary state,
//! evolved frame by frame by per-material movement and reaction rules:
//! gravity, flow, dispersion, combustion, corrosion, and explosions.
//!
//! The engine is deliberately narrow: it owns the double-buffered cell
//! grid, the material registry, and the chunk activity tracker, and it
//! exposes accessors, an RGBA pixel buffer, and transport controls.
//! Rendering, UI, and entities live with the consumer.
//!
//! ```
//! use cinderbox::prelude::*;
//!
//! let mut world = SimulationWorld::with_seed(256, 256, 42);
//! world.fill_region(100, 200, 32, 8, MaterialId::SAND);
//! for _ in 0..60 {
//!     world.update(1.0 / 60.0);
//! }
//! let pixels = world.pixel_data(); // RGBA, 4 bytes per cell
//! assert_eq!(pixels.len(), 256 * 256 * 4);
//! ```

pub mod automata;
pub mod config;
pub mod simulation;
pub mod world;

pub use config::{load_material_pack, ConfigError, SimulationConfig};

/// Common imports for consumers
pub mod prelude {
    pub use crate::config::SimulationConfig;
    pub use crate::simulation::{
        Behavior, Cell, Effect, EffectKind, MaterialDef, MaterialId, MaterialRegistry,
    };
    pub use crate::world::{SimulationWorld, CHUNK_SIZE};
    pub use glam::IVec2;
}
