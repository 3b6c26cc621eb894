use std::f32::consts::{PI, TAU};

use anyhow::bail;
use glam::Vec2;

use crate::config::EngineConfig;
use crate::map::MapGrid;

/// Camera pose on the grid. Angle 0 looks along +X, angles grow toward +Y (clockwise on screen).
///
/// Position is only changed through [`crate::motion::MotionController`], which keeps it walkable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewer {
    pos: Vec2,     // cell units
    facing: f32,   // radians, normalized to [-pi, pi)
    fov: f32,      // radians
    pub move_speed: f32,
    pub turn_speed: f32,
}

impl Viewer {
    pub fn spawn(map: &MapGrid, pos: Vec2, facing: f32, cfg: &EngineConfig) -> anyhow::Result<Self> {
        if !pos.is_finite() || !map.is_walkable_at(pos) {
            bail!("viewer spawn {pos} is not an empty cell");
        }
        Ok(Self {
            pos,
            facing: wrap_angle(facing),
            fov: cfg.fov(),
            move_speed: cfg.move_speed,
            turn_speed: cfg.turn_speed,
        })
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn facing(&self) -> f32 {
        self.facing
    }

    #[inline]
    pub fn direction(&self) -> Vec2 {
        Vec2::from_angle(self.facing)
    }

    /// Unit vector to the viewer's right.
    #[inline]
    pub fn right(&self) -> Vec2 {
        self.direction().perp()
    }

    /// Angle of the ray through `column` of a `screen_width`-wide viewport.
    #[inline]
    pub fn ray_angle(&self, column: usize, screen_width: usize) -> f32 {
        self.facing + (column as f32 / screen_width as f32 - 0.5) * self.fov
    }

    pub(crate) fn set_pos(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    pub(crate) fn turn(&mut self, delta: f32) {
        self.facing = wrap_angle(self.facing + delta);
    }
}

/// Keep yaw in [-pi, pi) to avoid float drift
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}
