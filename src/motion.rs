use glam::Vec2;

use crate::config::EngineConfig;
use crate::map::MapGrid;
use crate::viewer::Viewer;

/// Per-frame movement request, device independent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Intent {
    /// -1 backward .. 1 forward
    pub forward: f32,
    /// -1 left .. 1 right
    pub strafe: f32,
    /// -1 left .. 1 right
    pub turn: f32,
}

impl Intent {
    /// Scales the movement part to unit length so diagonals are not faster.
    pub fn normalized(self) -> Self {
        let len = Vec2::new(self.forward, self.strafe).length();
        if len > 1.0 {
            Self {
                forward: self.forward / len,
                strafe: self.strafe / len,
                turn: self.turn.clamp(-1.0, 1.0),
            }
        } else {
            Self {
                turn: self.turn.clamp(-1.0, 1.0),
                ..self
            }
        }
    }
}

/// Applies intents to the viewer with per-axis wall sliding.
#[derive(Clone, Copy, Debug)]
pub struct MotionController {
    /// Minimum gap kept between the viewer and any wall, in cells.
    pub margin: f32,
}

impl MotionController {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            margin: cfg.collision_margin,
        }
    }

    pub fn apply(&self, viewer: &mut Viewer, map: &MapGrid, intent: Intent, dt: f32) {
        let intent = intent.normalized();

        // Rotation cannot intersect geometry
        if intent.turn != 0.0 {
            viewer.turn(intent.turn * viewer.turn_speed * dt);
        }

        if intent.forward == 0.0 && intent.strafe == 0.0 {
            return;
        }

        let step = (viewer.direction() * intent.forward + viewer.right() * intent.strafe)
            * viewer.move_speed
            * dt;
        let mut pos = viewer.pos();

        // X first, then Y from wherever X ended up
        if step.x != 0.0 {
            let probe = Vec2::new(pos.x + step.x + self.margin.copysign(step.x), pos.y);
            if map.is_walkable_at(probe) {
                pos.x += step.x;
            }
        }
        if step.y != 0.0 {
            let probe = Vec2::new(pos.x, pos.y + step.y + self.margin.copysign(step.y));
            if map.is_walkable_at(probe) {
                pos.y += step.y;
            }
        }

        if map.is_walkable_at(pos) {
            viewer.set_pos(pos);
        } else {
            log::warn!("rejected move into wall at {pos}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::WallKind;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn setup(x: f32, y: f32, facing: f32) -> (MapGrid, Viewer, MotionController) {
        let map = MapGrid::bordered(10, 10, WallKind::GreyStone).unwrap();
        let cfg = EngineConfig::default();
        let viewer = Viewer::spawn(&map, Vec2::new(x, y), facing, &cfg).unwrap();
        (map, viewer, MotionController::new(&cfg))
    }

    fn forward() -> Intent {
        Intent {
            forward: 1.0,
            ..Intent::default()
        }
    }

    #[test]
    fn walks_forward_in_open_space() {
        let (map, mut viewer, motion) = setup(4.5, 4.5, 0.0);
        motion.apply(&mut viewer, &map, forward(), 0.1);
        assert!((viewer.pos().x - 4.8).abs() < 1e-5);
        assert_eq!(viewer.pos().y, 4.5);
    }

    #[test]
    fn head_on_wall_blocks_completely() {
        let (map, mut viewer, motion) = setup(8.5, 5.5, 0.0);
        let before = viewer.pos();
        motion.apply(&mut viewer, &map, forward(), 0.1);
        assert_eq!(viewer.pos(), before);
    }

    #[test]
    fn creeping_up_to_a_wall_stops_at_the_margin() {
        let (map, mut viewer, motion) = setup(8.79, 5.5, 0.0);
        let limit = 9.0 - motion.margin;
        for _ in 0..200 {
            motion.apply(&mut viewer, &map, forward(), 0.001);
            assert!(viewer.pos().x < limit + 1e-4, "{} crossed {limit}", viewer.pos().x);
        }
        assert!(viewer.pos().x > 8.79);

        let settled = viewer.pos();
        motion.apply(&mut viewer, &map, forward(), 0.001);
        assert_eq!(viewer.pos(), settled);
    }

    #[test]
    fn diagonal_into_wall_slides_along_open_axis() {
        let (map, mut viewer, motion) = setup(8.5, 5.5, FRAC_PI_4);
        motion.apply(&mut viewer, &map, forward(), 0.2);
        assert_eq!(viewer.pos().x, 8.5);
        assert!(viewer.pos().y > 5.9);
    }

    #[test]
    fn corner_blocks_both_axes() {
        let (map, mut viewer, motion) = setup(8.5, 8.5, FRAC_PI_4);
        let before = viewer.pos();
        motion.apply(&mut viewer, &map, forward(), 0.2);
        assert_eq!(viewer.pos(), before);
    }

    #[test]
    fn turning_ignores_walls() {
        let (map, mut viewer, motion) = setup(1.5, 1.5, 0.0);
        let turn = Intent {
            turn: 1.0,
            ..Intent::default()
        };
        motion.apply(&mut viewer, &map, turn, 0.5);
        assert!((viewer.facing() - FRAC_PI_2).abs() < 1e-5);
        assert_eq!(viewer.pos(), Vec2::new(1.5, 1.5));
    }

    #[test]
    fn strafe_moves_right_of_facing() {
        let (map, mut viewer, motion) = setup(4.5, 4.5, 0.0);
        let right = Intent {
            strafe: 1.0,
            ..Intent::default()
        };
        motion.apply(&mut viewer, &map, right, 0.1);
        assert!((viewer.pos().y - 4.8).abs() < 1e-5);
    }

    #[test]
    fn diagonal_intent_is_not_faster() {
        let i = Intent {
            forward: 1.0,
            strafe: 1.0,
            turn: 3.0,
        }
        .normalized();
        assert!((Vec2::new(i.forward, i.strafe).length() - 1.0).abs() < 1e-6);
        assert_eq!(i.turn, 1.0);
    }

    #[test]
    fn position_stays_walkable_under_random_walk() {
        let (map, mut viewer, motion) = setup(2.5, 2.5, 0.3);
        for i in 0..2000 {
            let intent = Intent {
                forward: ((i * 7) % 5) as f32 / 2.0 - 1.0,
                strafe: ((i * 3) % 7) as f32 / 3.0 - 1.0,
                turn: if i % 50 < 10 { 1.0 } else { 0.0 },
            };
            motion.apply(&mut viewer, &map, intent, 0.1);
            assert!(map.is_walkable_at(viewer.pos()), "step {i}: {}", viewer.pos());
        }
    }
}
