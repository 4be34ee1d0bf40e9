//! RGBA framebuffer regeneration
//!
//! The pixel buffer is derived from the current grid: base material
//! color, shifted toward incandescence for hot cells and tinted by the
//! effect layer. Only dirty chunks are redrawn each frame.

use glam::IVec2;

use crate::simulation::{Cell, EffectKind, MaterialDef, MaterialRegistry};
use crate::world::chunk::CHUNK_SIZE;

/// Temperature where the incandescent shift starts
const GLOW_START: f32 = 400.0;
/// Temperature of a fully white-hot cell
const GLOW_FULL: f32 = 1200.0;

const BYTES_PER_CELL: usize = 4;

/// Redraw every cell of one chunk into the framebuffer
pub fn redraw_chunk(
    framebuffer: &mut [u8],
    cells: &[Cell],
    width: i32,
    height: i32,
    chunk: IVec2,
    materials: &MaterialRegistry,
) {
    let x0 = chunk.x * CHUNK_SIZE;
    let y0 = chunk.y * CHUNK_SIZE;
    for ly in 0..CHUNK_SIZE {
        let y = y0 + ly;
        if y < 0 || y >= height {
            continue;
        }
        for lx in 0..CHUNK_SIZE {
            let x = x0 + lx;
            if x < 0 || x >= width {
                continue;
            }
            let idx = (y * width + x) as usize;
            let rgba = shade(&cells[idx], materials.get(cells[idx].material));
            framebuffer[idx * BYTES_PER_CELL..idx * BYTES_PER_CELL + 4].copy_from_slice(&rgba);
        }
    }
}

/// Redraw a single cell (paint tools touch the buffer directly)
pub fn redraw_cell(
    framebuffer: &mut [u8],
    cells: &[Cell],
    width: i32,
    x: i32,
    y: i32,
    materials: &MaterialRegistry,
) {
    let idx = (y * width + x) as usize;
    let rgba = shade(&cells[idx], materials.get(cells[idx].material));
    framebuffer[idx * BYTES_PER_CELL..idx * BYTES_PER_CELL + 4].copy_from_slice(&rgba);
}

/// Final display color for one cell
pub fn shade(cell: &Cell, def: &MaterialDef) -> [u8; 4] {
    let mut color = def.color;

    // Hot cells shift toward incandescent white-orange; emissive
    // materials (fire, lava) are already drawn at full brightness
    if !cell.is_empty() && def.emission < 1.0 && cell.temperature > GLOW_START {
        let heat = ((cell.temperature - GLOW_START) / (GLOW_FULL - GLOW_START)).clamp(0.0, 1.0);
        color = lerp_rgb(color, [255, 160, 60], heat * 0.8);
        if color[3] < 255 {
            color[3] = color[3].max(200);
        }
    }

    match cell.effect.kind {
        EffectKind::None => {}
        EffectKind::Burning => {
            color = lerp_rgb(color, [255, 120, 0], strength(cell, 0.6));
        }
        EffectKind::Freezing => {
            color = lerp_rgb(color, [180, 220, 255], strength(cell, 0.5));
        }
        EffectKind::Electrified => {
            color = lerp_rgb(color, [255, 255, 180], strength(cell, 0.7));
        }
        EffectKind::Bloodied => {
            color = lerp_rgb(color, [150, 20, 20], strength(cell, 0.5));
        }
        EffectKind::Blackened => {
            color = lerp_rgb(color, [20, 16, 12], strength(cell, 0.7));
        }
        EffectKind::Corroding => {
            color = lerp_rgb(color, [80, 220, 80], strength(cell, 0.5));
        }
        EffectKind::Crystallizing => {
            color = lerp_rgb(color, [200, 180, 255], strength(cell, 0.5));
        }
        EffectKind::Glowing => {
            color = lerp_rgb(color, [255, 255, 220], strength(cell, 0.6));
        }
    }

    color
}

fn strength(cell: &Cell, scale: f32) -> f32 {
    (cell.effect.intensity as f32 / 255.0) * scale
}

fn lerp_rgb(base: [u8; 4], toward: [u8; 3], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t) as u8;
    [
        mix(base[0], toward[0]),
        mix(base[1], toward[1]),
        mix(base[2], toward[2]),
        base[3],
    ]
}
