use glam::Vec2;

use crate::config::EngineConfig;
use crate::map::WallKind;
use crate::raycaster::RayHit;
use crate::texture::TextureSet;

/// Distances are clamped to this before dividing.
pub const MIN_DISTANCE: f32 = 1e-4;

/// Render instruction for one screen column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallSlice {
    pub x: usize,
    /// First wall row, may be negative when the slice overflows the viewport.
    pub top: i32,
    /// One past the last wall row, may exceed the viewport height.
    pub bottom: i32,
    /// Unrounded slice height in pixels, used for texture v-mapping.
    pub height: f32,
    /// `None` renders background only.
    pub wall: Option<WallKind>,
    pub tex_column: usize,
    pub brightness: f32,
    pub distance: f32,
    /// Carried from the ray for floor and ceiling casting.
    pub depth_dir: Vec2,
}

/// On-screen height of a wall at perpendicular `distance`.
#[inline]
pub fn slice_height(distance: f32, viewport_height: usize, wall_height: f32, max_scale: f32) -> f32 {
    let vh = viewport_height as f32;
    let h = vh * wall_height / distance.max(MIN_DISTANCE);
    h.min(vh * max_scale)
}

pub fn project(
    hit: &RayHit,
    x: usize,
    viewport_height: usize,
    cfg: &EngineConfig,
    textures: &TextureSet,
) -> WallSlice {
    let horizon = viewport_height as i32 / 2;
    let Some(kind) = hit.wall else {
        return WallSlice {
            x,
            top: horizon,
            bottom: horizon,
            height: 0.0,
            wall: None,
            tex_column: 0,
            brightness: 0.0,
            distance: hit.distance,
            depth_dir: hit.depth_dir,
        };
    };

    let height = slice_height(
        hit.distance,
        viewport_height,
        cfg.wall_height,
        cfg.max_slice_scale,
    );
    // centered on the horizon
    let top = ((viewport_height as f32 - height) * 0.5).floor() as i32;
    let bottom = top + height.ceil() as i32;

    WallSlice {
        x,
        top,
        bottom,
        height,
        wall: Some(kind),
        tex_column: textures.get(kind).column(hit.face_offset),
        brightness: cfg.shade(hit.axis),
        distance: hit.distance,
        depth_dir: hit.depth_dir,
    }
}

/// Projects every hit, left to right, into `out` (cleared first, allocation reused).
pub fn project_columns(
    hits: &[RayHit],
    viewport_height: usize,
    cfg: &EngineConfig,
    textures: &TextureSet,
    out: &mut Vec<WallSlice>,
) {
    out.clear();
    out.extend(
        hits.iter()
            .enumerate()
            .map(|(x, hit)| project(hit, x, viewport_height, cfg, textures)),
    );
}
