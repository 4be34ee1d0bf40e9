//! Simulation tuning configuration
//!
//! All the empirical constants live here rather than as magic numbers in
//! the rule code, and the whole struct can be overridden from RON text.
//! Material packs load the same way.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulation::{MaterialDef, MaterialRegistry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse RON: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Engine-wide tuning values
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Heat diffusion rate per frame (0.0 - 1.0)
    pub temperature_diffusion: f32,
    /// Minimum density difference for liquid-liquid swaps
    pub liquid_swap_threshold: f32,
    /// Movement attempts per frame for gases
    pub gas_move_retries: u8,
    /// Chance per frame that a settled powder re-checks its footing
    pub settled_recheck: f32,
    /// Heat injected per frame by fire cells and burning surfaces
    pub fire_heat: f32,
    /// Chance that a Burn reaction converts fuel outright instead of
    /// just smoldering
    pub burn_convert_chance: f32,
    /// Quiet frames before an awake chunk goes to sleep
    pub chunk_sleep_frames: u32,
    /// Sleeping frames before a chunk unloads
    pub chunk_unload_frames: u32,
    /// How often (in frames) the inactive-chunk sweep runs
    pub unload_sweep_interval: u64,
    /// Transport speed multiplier applied to delta time
    pub default_speed: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            temperature_diffusion: 0.1,
            liquid_swap_threshold: 0.15,
            gas_move_retries: 4,
            settled_recheck: 0.08,
            fire_heat: 12.0,
            burn_convert_chance: 0.04,
            chunk_sleep_frames: 30,
            chunk_unload_frames: 300,
            unload_sweep_interval: 120,
            default_speed: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Parse a config from RON text; missing fields keep their defaults
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }
}

/// Load extra material definitions from RON text into a registry.
/// Returns the number of materials registered.
pub fn load_material_pack(
    registry: &mut MaterialRegistry,
    text: &str,
) -> Result<usize, ConfigError> {
    let defs: Vec<MaterialDef> = ron::from_str(text)?;
    let count = defs.len();
    for def in defs {
        registry.register(def);
    }
    Ok(count)
}
