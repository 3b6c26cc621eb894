use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use glam::Vec2;

use crate::config::EngineConfig;
use crate::map::WallKind;
use crate::projector::WallSlice;
use crate::scaler::lerp_color_u32;
use crate::texture::TextureSet;

#[inline]
fn weight(t: f32) -> u32 {
    (t.clamp(0.0, 1.0) * 256.0) as u32
}

/// Ceiling above the horizon, floor below, each a two-stop vertical gradient.
#[inline]
fn background(y: usize, height: usize, cfg: &EngineConfig) -> u32 {
    let horizon = height / 2;
    if y < horizon {
        let t = y as f32 / horizon as f32;
        lerp_color_u32(cfg.ceiling[0], cfg.ceiling[1], weight(t))
    } else {
        let span = (height - horizon).max(1);
        let t = (y - horizon) as f32 / span as f32;
        lerp_color_u32(cfg.floor[0], cfg.floor[1], weight(t))
    }
}

#[inline]
fn fogged(color: u32, distance: f32, cfg: &EngineConfig) -> u32 {
    match cfg.fog {
        Some(fog) => {
            let t = distance / fog.distance.max(f32::EPSILON);
            lerp_color_u32(color, fog.color, weight(t))
        }
        None => color,
    }
}

/// Depth of the floor (or ceiling) seen through row `y`, mirroring the wall projection.
#[inline]
fn plane_distance(y: usize, height: usize, wall_height: f32) -> f32 {
    let from_horizon = (y as f32 + 0.5 - height as f32 * 0.5).abs().max(1e-3);
    height as f32 * wall_height / (2.0 * from_horizon)
}

/// Texture and depth for the plane visible on row `y`, if that plane is textured.
#[inline]
fn plane_for_row(y: usize, height: usize, cfg: &EngineConfig) -> Option<(WallKind, f32)> {
    let kind = if y < height / 2 {
        cfg.ceiling_texture?
    } else {
        cfg.floor_texture?
    };
    Some((kind, plane_distance(y, height, cfg.wall_height)))
}

#[inline]
fn plane_texel(
    origin: Vec2,
    slice: &WallSlice,
    kind: WallKind,
    distance: f32,
    textures: &TextureSet,
    cfg: &EngineConfig,
) -> u32 {
    let world = origin + slice.depth_dir * distance;
    let tex = textures.get(kind);
    let texel = tex.texel(tex.column(world.x.rem_euclid(1.0)), world.y.rem_euclid(1.0));
    fogged(texel, distance, cfg)
}

#[inline]
fn wall_texel(slice: &WallSlice, y: usize, height: usize, textures: &TextureSet, cfg: &EngineConfig) -> Option<u32> {
    let kind = slice.wall?;
    let yi = y as i32;
    if yi < slice.top || yi >= slice.bottom {
        return None;
    }

    let top = (height as f32 - slice.height) * 0.5;
    let v = (y as f32 + 0.5 - top) / slice.height;
    let texel = textures.get(kind).texel(slice.tex_column, v.clamp(0.0, 1.0));

    // brightness scales toward black
    let color = lerp_color_u32(0, texel, weight(slice.brightness));
    Some(fogged(color, slice.distance, cfg))
}

/// Composites one frame of wall slices over the ceiling and floor.
///
/// `origin` is the viewer position the slices were cast from, used to place plane texels.
/// Rows are independent and written in parallel; every row only reads `slices`.
pub fn render_frame(
    buf: &mut [u32],
    width: usize,
    height: usize,
    slices: &[WallSlice],
    origin: Vec2,
    textures: &TextureSet,
    cfg: &EngineConfig,
) {
    debug_assert_eq!(buf.len(), width * height);
    if width == 0 || height == 0 {
        return;
    }

    let draw_row = |(y, row): (usize, &mut [u32])| {
        let bg = background(y, height, cfg);
        let plane = plane_for_row(y, height, cfg);
        for (x, px) in row.iter_mut().enumerate() {
            let Some(slice) = slices.get(x) else {
                *px = bg;
                continue;
            };
            *px = match (wall_texel(slice, y, height, textures, cfg), plane) {
                (Some(wall), _) => wall,
                (None, Some((kind, distance))) => {
                    plane_texel(origin, slice, kind, distance, textures, cfg)
                }
                (None, None) => bg,
            };
        }
    };

    if cfg.parallel {
        buf.par_chunks_mut(width).enumerate().for_each(draw_row);
    } else {
        buf.chunks_mut(width).enumerate().for_each(draw_row);
    }
}
