//! Picking - Ray casts against the cube set and the single-cube selection
//!
//! A pick tests the ray against every cube's axis-aligned box and keeps the
//! closest hit. Equal distances go to the lower grid index so the outcome
//! never depends on iteration order. Boxes that contain the ray origin are
//! not hit: only front faces count, the way a raycaster treats single-sided
//! materials.

use crate::scene::{CubeEntity, EMISSIVE_NORMAL, EMISSIVE_SELECTED};
use cubic_protocol::PoseData;
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    /// `direction` is normalized; a zero direction stays zero and hits nothing.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray along a pose's local -Z axis, starting at the pose position.
    pub fn from_pose(position: Vec3, orientation: Quat) -> Self {
        Self::new(position, orientation * Vec3::NEG_Z)
    }

    pub fn from_pose_data(pose: &PoseData) -> Self {
        Self::from_pose(
            Vec3::from_array(pose.position),
            Quat::from_array(pose.orientation).normalize(),
        )
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_size(center: Vec3, size: f32) -> Self {
        let half = Vec3::splat(size / 2.0);
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Distance along `ray` to the entry face, if the ray enters the box.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if direction.abs() < f32::EPSILON {
                // Parallel to this slab: must already be between its planes
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let t1 = (lo - origin) / direction;
            let t2 = (hi - origin) / direction;
            let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_max < t_min {
                return None;
            }
        }

        if t_min < 0.0 {
            // Box is behind the origin, or the origin is inside it
            return None;
        }
        Some(t_min)
    }
}

/// The closest cube along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub index: usize,
    pub distance: f32,
    pub point: Vec3,
}

/// Nearest cube hit by `ray`, ties broken by lower index.
pub fn cast(ray: &Ray, cubes: &[CubeEntity]) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for (index, cube) in cubes.iter().enumerate() {
        let Some(distance) = cube.bounds().intersect(ray) else {
            continue;
        };
        // Strict comparison keeps the earlier (lower) index on ties
        if best.is_none_or(|hit| distance < hit.distance) {
            best = Some(Hit {
                index,
                distance,
                point: ray.at(distance),
            });
        }
    }
    best
}

/// Which cube, if any, is highlighted.
///
/// Owns the invariant that the selected cube is the only one at
/// `EMISSIVE_SELECTED`; every other cube stays at `EMISSIVE_NORMAL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<usize>,
}

/// Emissive changes caused by a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<usize>,
    pub current: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Highlight `index`, restoring the previously selected cube.
    pub fn select(&mut self, index: usize, cubes: &mut [CubeEntity]) -> SelectionChange {
        let previous = self.selected.replace(index);
        if let Some(previous) = previous {
            if let Some(cube) = cubes.get_mut(previous) {
                cube.emissive_intensity = EMISSIVE_NORMAL;
            }
        }
        if let Some(cube) = cubes.get_mut(index) {
            cube.emissive_intensity = EMISSIVE_SELECTED;
        }
        SelectionChange {
            previous,
            current: index,
        }
    }

    /// Cast `ray` and select the hit cube. A miss changes nothing.
    pub fn pick(&mut self, ray: &Ray, cubes: &mut [CubeEntity]) -> Option<(Hit, SelectionChange)> {
        let hit = cast(ray, cubes)?;
        let change = self.select(hit.index, cubes);
        Some((hit, change))
    }
}
