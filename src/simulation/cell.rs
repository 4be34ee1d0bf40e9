//! Cell types and constants
//!
//! Foundational per-grid-position state for the simulation: material
//! identity plus the auxiliary fields the rule passes read and write.

use bitflags::bitflags;

use crate::simulation::MaterialId;

/// Ambient temperature for freshly created cells (Celsius)
pub const AMBIENT_TEMPERATURE: f32 = 20.0;

bitflags! {
    /// Status bits carried by a cell between frames
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CellFlags: u8 {
        /// Powder has support below and skips most movement checks
        const SETTLED = 1 << 0;
    }
}

impl Default for CellFlags {
    fn default() -> Self {
        CellFlags::empty()
    }
}

/// Secondary overlay applied on top of a cell's material identity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectKind {
    #[default]
    None,
    Burning,
    Freezing,
    Electrified,
    Bloodied,
    Blackened,
    Corroding,
    Crystallizing,
    Glowing,
}

/// Effect layer: kind + intensity, a countdown timer, and one auxiliary byte
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Effect {
    pub kind: EffectKind,
    pub intensity: u8,
    pub timer: u8,
    pub data: u8,
}

impl Effect {
    pub const NONE: Effect = Effect {
        kind: EffectKind::None,
        intensity: 0,
        timer: 0,
        data: 0,
    };

    /// Build an effect, normalizing zero intensity to `None`
    pub fn new(kind: EffectKind, intensity: u8, timer: u8) -> Self {
        if intensity == 0 {
            return Effect::NONE;
        }
        Effect {
            kind,
            intensity,
            timer,
            data: 0,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, EffectKind::None) || self.intensity == 0
    }

    /// Advance the countdown one frame, clearing the effect when it expires
    pub fn tick(&mut self) {
        if self.is_none() {
            *self = Effect::NONE;
            return;
        }
        if self.timer > 0 {
            self.timer -= 1;
        }
        if self.timer == 0 {
            *self = Effect::NONE;
        }
    }
}

/// A single grid position: material identity plus auxiliary state
///
/// Cells are plain `Copy` values stored in flat row-major arrays and are
/// only ever overwritten in place, never individually allocated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    /// Material id (0 = empty)
    pub material: u16,
    /// Temperature (Celsius)
    pub temperature: f32,
    /// Velocity components; x is flow-direction memory for liquids,
    /// y counts consecutive frames of free fall for powders
    pub velocity: [i8; 2],
    /// Decay counter for gases and fire (0 = inert)
    pub life: u8,
    /// Overlay layer (burning, electrified, ...)
    pub effect: Effect,
    pub flags: CellFlags,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        material: MaterialId::EMPTY,
        temperature: AMBIENT_TEMPERATURE,
        velocity: [0, 0],
        life: 0,
        effect: Effect::NONE,
        flags: CellFlags::empty(),
    };

    pub fn new(material: u16) -> Self {
        Cell {
            material,
            ..Cell::EMPTY
        }
    }

    /// An empty cell that keeps the temperature left behind by a mover
    pub fn vacated(temperature: f32) -> Self {
        Cell {
            temperature,
            ..Cell::EMPTY
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.material == MaterialId::EMPTY
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::EMPTY
    }
}
