use glam::{IVec2, Vec2};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

use crate::config::EngineConfig;
use crate::map::{Cell, MapGrid, WallKind};
use crate::viewer::Viewer;

/// Which family of grid lines a ray crossed when it entered the hit cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// x = const line, the face points along X
    Vertical,
    /// y = const line, the face points along Y
    Horizontal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec2,
    pub angle: f32,
}

impl Ray {
    #[inline]
    pub fn for_column(viewer: &Viewer, column: usize, screen_width: usize) -> Self {
        Self {
            origin: viewer.pos(),
            angle: viewer.ray_angle(column, screen_width),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance projected on the viewer's facing direction.
    pub distance: f32,
    /// `None` is the void sentinel: nothing was hit within the trace limit.
    pub wall: Option<WallKind>,
    /// Fractional position along the hit face in [0, 1].
    pub face_offset: f32,
    pub axis: Axis,
    /// Cell boundaries crossed before stopping.
    pub steps: u32,
    /// World offset per unit of perpendicular depth along this ray.
    pub depth_dir: Vec2,
}

impl RayHit {
    pub fn void(max_distance: f32) -> Self {
        Self {
            distance: max_distance,
            wall: None,
            face_offset: 0.0,
            axis: Axis::Vertical,
            steps: 0,
            depth_dir: Vec2::ZERO,
        }
    }

    #[cfg(test)]
    pub fn is_void(&self) -> bool {
        self.wall.is_none()
    }
}

/// Steps `ray` through `map` one grid line at a time until it enters a wall cell.
///
/// Never fails: a ray that travels past `max_distance` yields [`RayHit::void`].
pub fn trace(map: &MapGrid, ray: Ray, facing: f32, max_distance: f32) -> RayHit {
    let dir = Vec2::from_angle(ray.angle);
    let mut cell = ray.origin.floor().as_ivec2();

    let step = IVec2::new(
        if dir.x < 0.0 { -1 } else { 1 },
        if dir.y < 0.0 { -1 } else { 1 },
    );
    // Ray length per whole cell on each axis; infinite when parallel to it
    let delta = (Vec2::ONE / dir).abs();
    // Ray length to the first line on each axis
    let mut side = Vec2::new(
        if dir.x < 0.0 {
            (ray.origin.x - cell.x as f32) * delta.x
        } else {
            (cell.x as f32 + 1.0 - ray.origin.x) * delta.x
        },
        if dir.y < 0.0 {
            (ray.origin.y - cell.y as f32) * delta.y
        } else {
            (cell.y as f32 + 1.0 - ray.origin.y) * delta.y
        },
    );

    // fisheye correction
    let cos_offset = (ray.angle - facing).cos();
    let depth_dir = dir / cos_offset;
    let mut steps = 0u32;

    loop {
        let (traveled, axis) = if side.x < side.y {
            let t = side.x;
            side.x += delta.x;
            cell.x += step.x;
            (t, Axis::Vertical)
        } else {
            let t = side.y;
            side.y += delta.y;
            cell.y += step.y;
            (t, Axis::Horizontal)
        };
        steps += 1;

        // negated so a NaN limit also stops the walk
        if !(traveled <= max_distance) {
            return RayHit {
                axis,
                steps,
                depth_dir,
                ..RayHit::void(max_distance)
            };
        }

        if let Cell::Wall(kind) = map.cell_at(cell.x, cell.y) {
            let hit = ray.origin + dir * traveled;
            let along = match axis {
                Axis::Vertical => hit.y,
                Axis::Horizontal => hit.x,
            };
            let mut face_offset = along - along.floor();
            // keep textures unmirrored when looking at a face from its far side
            if (axis == Axis::Vertical && dir.x < 0.0) || (axis == Axis::Horizontal && dir.y > 0.0)
            {
                face_offset = 1.0 - face_offset;
            }

            return RayHit {
                distance: traveled * cos_offset,
                wall: Some(kind),
                face_offset,
                axis,
                steps,
                depth_dir,
            };
        }
    }
}

/// Traces one ray per screen column into `out`, reusing its allocation across frames.
///
/// Rays only read the grid and the viewer snapshot, so columns fan out over rayon freely.
pub fn cast_columns(
    map: &MapGrid,
    viewer: &Viewer,
    cfg: &EngineConfig,
    screen_width: usize,
    out: &mut Vec<RayHit>,
) {
    let max_distance = cfg.max_trace_distance;
    out.clear();
    out.resize(screen_width, RayHit::void(max_distance));

    let cast = |(column, hit): (usize, &mut RayHit)| {
        let ray = Ray::for_column(viewer, column, screen_width);
        *hit = trace(map, ray, viewer.facing(), max_distance);
    };

    if cfg.parallel {
        out.par_iter_mut().enumerate().for_each(cast);
    } else {
        out.iter_mut().enumerate().for_each(cast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn viewer_at(map: &MapGrid, x: f32, y: f32, facing: f32) -> Viewer {
        Viewer::spawn(map, Vec2::new(x, y), facing, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn central_column_hits_border_straight_ahead() {
        let map = MapGrid::bordered(10, 10, WallKind::RedBrick).unwrap();
        let viewer = viewer_at(&map, 4.5, 5.5, 0.0);
        let cfg = EngineConfig::default();

        let mut hits = Vec::new();
        cast_columns(&map, &viewer, &cfg, 64, &mut hits);

        let center = hits[32];
        assert!((center.distance - 4.5).abs() < 1e-4, "{center:?}");
        assert_eq!(center.wall, Some(WallKind::RedBrick));
        assert_eq!(center.axis, Axis::Vertical);
        assert!((center.face_offset - 0.5).abs() < 1e-4);
    }

    #[test]
    fn straight_ray_distance_is_euclidean() {
        let map = MapGrid::bordered(10, 10, WallKind::Wood).unwrap();
        for (facing, expected) in [
            (0.0, 9.0 - 3.25),
            (PI, 3.25 - 1.0),
            (FRAC_PI_2, 9.0 - 6.75),
            (-FRAC_PI_2, 6.75 - 1.0),
        ] {
            let ray = Ray {
                origin: Vec2::new(3.25, 6.75),
                angle: facing,
            };
            let hit = trace(&map, ray, facing, 64.0);
            assert!(
                (hit.distance - expected).abs() < 1e-4,
                "facing {facing}: {hit:?}"
            );
        }
    }

    #[test]
    fn off_axis_rays_are_fisheye_corrected() {
        let map = MapGrid::bordered(10, 10, WallKind::Wood).unwrap();
        let origin = Vec2::new(4.5, 5.5);
        // a flat wall at x = 9 must report the same depth from any angle
        for offset in [-0.4f32, -0.2, 0.1, 0.3] {
            let hit = trace(
                &map,
                Ray {
                    origin,
                    angle: offset,
                },
                0.0,
                64.0,
            );
            assert_eq!(hit.axis, Axis::Vertical);
            assert!((hit.distance - 4.5).abs() < 1e-3, "{offset}: {hit:?}");
        }
    }

    #[test]
    fn horizontal_faces_report_horizontal_axis() {
        let map = MapGrid::bordered(10, 10, WallKind::Wood).unwrap();
        let hit = trace(
            &map,
            Ray {
                origin: Vec2::new(4.25, 5.5),
                angle: -FRAC_PI_2,
            },
            -FRAC_PI_2,
            64.0,
        );
        assert_eq!(hit.axis, Axis::Horizontal);
        assert!((hit.distance - 4.5).abs() < 1e-4);
        assert!((hit.face_offset - 0.25).abs() < 1e-4);
    }

    #[test]
    fn depth_dir_has_unit_depth_along_facing() {
        let map = MapGrid::bordered(10, 10, WallKind::Wood).unwrap();
        let facing = 0.4;
        let forward = Vec2::from_angle(facing);
        for offset in [-0.5f32, 0.0, 0.25] {
            let ray = Ray {
                origin: Vec2::new(4.5, 5.5),
                angle: facing + offset,
            };
            let hit = trace(&map, ray, facing, 64.0);
            assert!((hit.depth_dir.dot(forward) - 1.0).abs() < 1e-5, "{offset}: {hit:?}");
        }
    }

    #[test]
    fn gives_up_at_max_distance_with_void() {
        let map = MapGrid::bordered(64, 64, WallKind::Wood).unwrap();
        let hit = trace(
            &map,
            Ray {
                origin: Vec2::new(2.5, 2.5),
                angle: 0.3,
            },
            0.3,
            6.0,
        );
        assert!(hit.is_void());
        assert_eq!(hit.distance, 6.0);
    }

    #[test]
    fn traversal_is_bounded_by_trace_limit() {
        let map = MapGrid::bordered(200, 200, WallKind::Wood).unwrap();
        let max_distance = 8.0;
        let bound = 2.0 * max_distance + 3.0;
        for i in 0..25 {
            let origin = Vec2::new(90.0 + i as f32 * 0.77, 95.0 + i as f32 * 0.31);
            for a in 0..72 {
                let angle = a as f32 * (PI / 36.0) - PI;
                let hit = trace(&map, Ray { origin, angle }, angle, max_distance);
                assert!(hit.is_void());
                assert!(hit.steps as f32 <= bound, "{origin} {angle}: {}", hit.steps);
            }
        }
    }

    #[test]
    fn every_interior_pose_hits_a_wall() {
        let map = MapGrid::bordered(10, 10, WallKind::Mossy).unwrap();
        for x in 1..9 {
            for y in 1..9 {
                for a in 0..16 {
                    let angle = a as f32 * FRAC_PI_4 / 2.0;
                    let ray = Ray {
                        origin: Vec2::new(x as f32 + 0.5, y as f32 + 0.5),
                        angle,
                    };
                    let hit = trace(&map, ray, angle, 64.0);
                    assert_eq!(hit.wall, Some(WallKind::Mossy));
                    assert!(hit.distance > 0.0 && hit.distance < 12.0);
                    assert!((0.0..=1.0).contains(&hit.face_offset));
                }
            }
        }
    }

    #[test]
    fn casting_is_deterministic_and_parallel_agnostic() {
        let map = MapGrid::bordered(12, 9, WallKind::Eagle).unwrap();
        let viewer = viewer_at(&map, 3.3, 4.1, 0.7);
        let mut cfg = EngineConfig::default();

        let mut first = Vec::new();
        let mut second = Vec::new();
        cast_columns(&map, &viewer, &cfg, 160, &mut first);
        cast_columns(&map, &viewer, &cfg, 160, &mut second);
        assert_eq!(first, second);

        cfg.parallel = false;
        let mut sequential = Vec::new();
        cast_columns(&map, &viewer, &cfg, 160, &mut sequential);
        assert_eq!(first, sequential);
        assert_eq!(first.len(), 160);
    }

    #[test]
    fn buffer_is_reused_between_frames() {
        let map = MapGrid::bordered(8, 8, WallKind::Eagle).unwrap();
        let viewer = viewer_at(&map, 3.5, 3.5, 0.0);
        let cfg = EngineConfig::default();
        let mut hits = Vec::with_capacity(64);
        let ptr = hits.as_ptr();
        cast_columns(&map, &viewer, &cfg, 64, &mut hits);
        cast_columns(&map, &viewer, &cfg, 64, &mut hits);
        assert_eq!(hits.as_ptr(), ptr);
    }
}
