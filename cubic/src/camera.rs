//! Camera and Orbit Controls
//!
//! `PerspectiveCamera` is the view the shells render from. `OrbitControls`
//! turns mouse drags and wheel input into damped rotation, panning and zoom
//! around a target point. Pending motion is applied a fraction at a time on
//! each `update`, so the camera keeps gliding for a while after the pointer
//! is released.

use crate::pick::Ray;
use cubic_protocol::{CameraData, Command, EnvironmentCommand, MouseButton};
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::f32::consts::PI;

/// Smallest polar angle, keeps the camera off the poles
const POLAR_EPSILON: f32 = 1e-6;
/// Zoom factor per wheel notch
const ZOOM_SCALE: f32 = 0.95;
/// Movement below this (squared) does not count as a camera change
const CHANGE_EPSILON: f32 = 1e-6;

/// Size of the drawing area in CSS/logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Pixel position to normalized device coordinates (`-1..1`, y up).
    pub fn to_ndc(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x / self.width) * 2.0 - 1.0,
            -(y / self.height) * 2.0 + 1.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            fov_degrees,
            near,
            far,
            aspect,
        }
    }

    /// Camera described by a `SetCamera` command, for shells that render it.
    pub fn from_camera_data(data: &CameraData, aspect: f32) -> Self {
        Self {
            position: Vec3::from_array(data.position),
            target: Vec3::from_array(data.target),
            fov_degrees: data.fov_degrees,
            near: data.near,
            far: data.far,
            aspect,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the eye through a pixel of the viewport.
    pub fn ray_through(&self, x: f32, y: f32, viewport: Viewport) -> Ray {
        let ndc = viewport.to_ndc(x, y);
        let inv_view_proj = self.view_projection().inverse();
        let point = inv_view_proj * Vec4::new(ndc.x, ndc.y, 0.5, 1.0);
        let point = point.truncate() / point.w;
        Ray::new(self.position, point - self.position)
    }

    /// Pixel position of a world point, or `None` if it is behind the camera.
    pub fn project(&self, world: Vec3, viewport: Viewport) -> Option<Vec2> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) / 2.0 * viewport.width,
            (1.0 - ndc.y) / 2.0 * viewport.height,
        ))
    }

    pub fn to_camera_data(&self) -> CameraData {
        CameraData {
            position: self.position.to_array(),
            target: self.target.to_array(),
            up: [0.0, 1.0, 0.0],
            fov_degrees: self.fov_degrees,
            near: self.near,
            far: self.far,
        }
    }

    pub fn to_command(&self) -> Command {
        Command::Environment(EnvironmentCommand::SetCamera(self.to_camera_data()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
}

/// Damped orbit controls.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Point the camera orbits around and looks at
    pub target: Vec3,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub enabled: bool,
    // Pending azimuth (theta) and polar (phi) rotation
    delta_theta: f32,
    delta_phi: f32,
    pan_offset: Vec3,
    scale: f32,
    drag: Option<DragMode>,
    last_pointer: Vec2,
}

impl OrbitControls {
    pub fn new(target: Vec3, damping_factor: f32, min_distance: f32, max_distance: f32) -> Self {
        Self {
            target,
            damping_factor,
            min_distance,
            max_distance,
            rotate_speed: 1.0,
            enabled: true,
            delta_theta: 0.0,
            delta_phi: 0.0,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
            drag: None,
            last_pointer: Vec2::ZERO,
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Move closer by `factor` (< 1 zooms in, > 1 zooms out).
    pub fn dolly(&mut self, factor: f32) {
        self.scale *= factor;
    }

    /// Wheel input: negative `dy` (scrolling up) zooms in.
    pub fn wheel(&mut self, dy: f32) {
        if !self.enabled {
            return;
        }
        if dy < 0.0 {
            self.dolly(ZOOM_SCALE);
        } else if dy > 0.0 {
            self.dolly(1.0 / ZOOM_SCALE);
        }
    }

    pub fn pointer_down(&mut self, button: MouseButton, x: f32, y: f32) {
        if !self.enabled {
            return;
        }
        self.drag = match button {
            MouseButton::Left => Some(DragMode::Rotate),
            MouseButton::Right => Some(DragMode::Pan),
            MouseButton::Middle => None,
        };
        self.last_pointer = Vec2::new(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, camera: &PerspectiveCamera, viewport: Viewport) {
        let pointer = Vec2::new(x, y);
        let delta = pointer - self.last_pointer;
        self.last_pointer = pointer;

        match self.drag {
            Some(DragMode::Rotate) => {
                let delta = delta * self.rotate_speed;
                self.rotate_left(2.0 * PI * delta.x / viewport.height);
                self.rotate_up(2.0 * PI * delta.y / viewport.height);
            }
            Some(DragMode::Pan) => self.pan(delta, camera, viewport),
            None => {}
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    fn pan(&mut self, delta: Vec2, camera: &PerspectiveCamera, viewport: Viewport) {
        let offset = camera.position - self.target;
        // Half the visible height at the target's depth
        let target_distance = offset.length() * (camera.fov_degrees.to_radians() / 2.0).tan();

        let forward = (self.target - camera.position).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);

        let left = 2.0 * delta.x * target_distance / viewport.height;
        let upward = 2.0 * delta.y * target_distance / viewport.height;
        self.pan_offset += -right * left + up * upward;
    }

    /// Place the camera and target at once, dropping any pending motion.
    pub fn teleport(&mut self, camera: &mut PerspectiveCamera, position: Vec3, target: Vec3) {
        self.target = target;
        camera.position = position;
        camera.look_at(target);
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.pan_offset = Vec3::ZERO;
        self.scale = 1.0;
    }

    /// True while rotation or panning is still being eased out.
    pub fn is_moving(&self) -> bool {
        self.delta_theta.abs() > CHANGE_EPSILON
            || self.delta_phi.abs() > CHANGE_EPSILON
            || self.pan_offset.length_squared() > CHANGE_EPSILON
            || (self.scale - 1.0).abs() > CHANGE_EPSILON
    }

    /// Advance one damping step. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        theta += self.delta_theta * self.damping_factor;
        phi += self.delta_phi * self.damping_factor;
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pan_offset * self.damping_factor;

        let offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );

        let previous = camera.position;
        let previous_target = camera.target;
        camera.position = self.target + offset;
        camera.look_at(self.target);

        let decay = 1.0 - self.damping_factor;
        self.delta_theta *= decay;
        self.delta_phi *= decay;
        self.pan_offset *= decay;
        self.scale = 1.0;

        camera.position.distance_squared(previous) > CHANGE_EPSILON
            || camera.target.distance_squared(previous_target) > CHANGE_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Vec3) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        camera.position = position;
        camera.look_at(Vec3::ZERO);
        camera
    }

    #[test]
    fn test_idle_update_does_not_move() {
        let mut camera = camera_at(Vec3::splat(128.0));
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05, 4.0, 384.0);
        assert!(!controls.update(&mut camera));
        assert!((camera.position - Vec3::splat(128.0)).length() < 1e-3);
    }

    #[test]
    fn test_rotation_is_damped() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 100.0));
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05, 4.0, 384.0);
        controls.rotate_left(-1.0);

        assert!(controls.update(&mut camera));
        // First step applies 5% of the pending rotation
        let theta = camera.position.x.atan2(camera.position.z);
        assert!((theta - 0.05).abs() < 1e-4, "theta = {theta}");
        assert!((controls.delta_theta - 0.95).abs() < 1e-6);

        controls.update(&mut camera);
        assert!((controls.delta_theta - 0.95 * 0.95).abs() < 1e-6);
        // Distance to the target is preserved while orbiting
        assert!((camera.position.length() - 100.0).abs() < 1e-2);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 5.0));
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05, 4.0, 384.0);
        controls.dolly(0.1);
        controls.update(&mut camera);
        assert!((camera.position.length() - 4.0).abs() < 1e-3);

        controls.dolly(1000.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 384.0).abs() < 1e-2);
    }

    #[test]
    fn test_wheel_up_zooms_in() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 100.0));
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05, 4.0, 384.0);
        controls.wheel(-120.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 95.0).abs() < 1e-2);
    }

    #[test]
    fn test_teleport_clears_pending_motion() {
        let mut camera = camera_at(Vec3::splat(128.0));
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05, 4.0, 384.0);
        controls.rotate_left(2.0);
        controls.teleport(&mut camera, Vec3::new(1.0, 2.0, 13.0), Vec3::new(1.0, 2.0, 3.0));
        assert!(!controls.is_moving());
        assert!(!controls.update(&mut camera));
        assert!((camera.position - Vec3::new(1.0, 2.0, 13.0)).length() < 1e-3);
        assert_eq!(camera.target, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_disabled_controls_ignore_input() {
        let mut controls = OrbitControls::new(Vec3::ZERO, 0.05, 4.0, 384.0);
        controls.enabled = false;
        controls.pointer_down(MouseButton::Left, 0.0, 0.0);
        controls.wheel(-1.0);
        assert!(!controls.is_moving());
        assert!(controls.drag.is_none());
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let mut camera = camera_at(Vec3::splat(128.0));
        camera.look_at(Vec3::ZERO);
        let viewport = Viewport::new(800.0, 600.0);
        camera.aspect = viewport.aspect();
        let ray = camera.ray_through(400.0, 300.0, viewport);
        let expected = (-Vec3::splat(128.0)).normalize();
        assert!((ray.direction - expected).length() < 1e-4);
        assert_eq!(ray.origin, camera.position);
    }

    #[test]
    fn test_camera_data_roundtrip() {
        let mut camera = camera_at(Vec3::new(3.0, 4.0, 5.0));
        camera.aspect = 1.6;
        let rebuilt = PerspectiveCamera::from_camera_data(&camera.to_camera_data(), 1.6);
        assert_eq!(rebuilt, camera);
    }

    #[test]
    fn test_project_inverts_ray() {
        let mut camera = camera_at(Vec3::splat(128.0));
        camera.look_at(Vec3::ZERO);
        let viewport = Viewport::new(1024.0, 768.0);
        camera.aspect = viewport.aspect();
        let world = Vec3::new(10.0, -20.0, 5.0);
        let pixel = camera.project(world, viewport).unwrap();
        let ray = camera.ray_through(pixel.x, pixel.y, viewport);
        let expected = (world - camera.position).normalize();
        assert!((ray.direction - expected).length() < 1e-3);
    }
}
