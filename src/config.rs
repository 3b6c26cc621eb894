use std::f32::consts::PI;
use std::time::Duration;

use crate::map::WallKind;

#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    // BGRA8 in little-endian memory
    (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
    // Alpha at 0
}

/// Distance fog: wall and plane texels fade linearly toward `color`, fully hidden at `distance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub distance: f32,
    pub color: u32,
}

/// Engine tunables. Levels may override a subset through their META section.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub fov_degrees: f32,
    /// Rays stop and report a void hit once they travel this many cells.
    pub max_trace_distance: f32,
    /// Wall height in world units, scales every projected slice.
    pub wall_height: f32,
    /// Projected slices never exceed `viewport_height * max_slice_scale` pixels.
    pub max_slice_scale: f32,
    /// Brightness of walls hit on a vertical grid line.
    pub shade_lit: f32,
    /// Brightness of walls hit on a horizontal grid line.
    pub shade_dark: f32,
    /// How close the viewer may get to a wall, in cells.
    pub collision_margin: f32,
    pub move_speed: f32, // cells/s
    pub turn_speed: f32, // rad/s
    pub render_width: usize,
    pub render_height: usize,
    pub max_frame_dt: Duration,
    pub ceiling: [u32; 2], // top, horizon
    pub floor: [u32; 2],   // horizon, bottom
    /// Textured planes replace the gradients when set.
    pub ceiling_texture: Option<WallKind>,
    pub floor_texture: Option<WallKind>,
    pub fog: Option<Fog>,
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 66.0,
            max_trace_distance: 64.0,
            wall_height: 1.0,
            max_slice_scale: 8.0,
            shade_lit: 1.0,
            shade_dark: 0.7,
            collision_margin: 0.2,
            move_speed: 3.0,
            turn_speed: PI,
            render_width: 640,
            render_height: 480,
            max_frame_dt: Duration::from_millis(100),
            ceiling: [pack_rgb(70, 110, 170), pack_rgb(173, 216, 230)],
            floor: [pack_rgb(90, 90, 90), pack_rgb(200, 200, 200)],
            ceiling_texture: None,
            floor_texture: None,
            fog: None,
            parallel: true,
        }
    }
}

impl EngineConfig {
    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    /// Brightness multiplier for the grid axis a ray crossed last.
    #[inline]
    pub fn shade(&self, axis: crate::raycaster::Axis) -> f32 {
        match axis {
            crate::raycaster::Axis::Vertical => self.shade_lit,
            crate::raycaster::Axis::Horizontal => self.shade_dark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raycaster::Axis;

    #[test]
    fn packs_as_xrgb() {
        assert_eq!(pack_rgb(12, 200, 255), 0x000C_C8FF);
    }

    #[test]
    fn horizontal_walls_are_darker_by_default() {
        let cfg = EngineConfig::default();
        assert!(cfg.shade(Axis::Horizontal) < cfg.shade(Axis::Vertical));
        assert!((cfg.fov() - 66f32.to_radians()).abs() < 1e-6);
    }
}
