//! Scene camera construction and damped orbit controls around a three-d [Camera].

use std::f32::consts::PI;

use three_d::*;

use crate::config::{CameraConfig, ControlsConfig};


/// Squared distance under which a camera update counts as "no movement".
const MOVE_EPSILON: f32 = 1e-6;
/// Pending input smaller than this is dropped instead of decayed forever.
const REST_EPSILON: f32 = 1e-5;
/// Dolly factor for one wheel step at zoom speed 1.
const ZOOM_BASE: f32 = 0.95;


/// Builds the scene camera for a `width` x `height` viewport.
pub fn scene_camera(config: &CameraConfig, width: u32, height: u32) -> Camera {
    let [px, py, pz] = config.position;
    let [tx, ty, tz] = config.target;
    Camera::new_perspective(
        Viewport::new_at_origo(width.max(1), height.max(1)),
        vec3(px, py, pz),
        vec3(tx, ty, tz),
        vec3(0.0, 1.0, 0.0),
        degrees(config.fov_y),
        config.near,
        config.far,
    )
}

/// Sets the viewport, and with it aspect = width / height.
/// A degenerate size leaves the camera unchanged.
pub fn resize_camera(camera: &mut Camera, width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    camera.set_viewport(Viewport::new_at_origo(width, height));
    true
}

pub fn aspect(camera: &Camera) -> f32 {
    let viewport = camera.viewport();
    viewport.width as f32 / viewport.height.max(1) as f32
}


/// Pointer input already translated from DOM events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    /// Primary-button drag, in pixels
    Rotate { dx: f32, dy: f32 },
    /// Secondary-button drag, in pixels
    Pan { dx: f32, dy: f32 },
    /// Wheel delta; negative zooms in
    Zoom { delta: f32 },
}


/// Orbit controls with inertia. Input accumulates into pending rotation,
/// dolly and pan amounts; [OrbitControls::update] hands a fraction of them to
/// the camera each frame and decays the rest.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Pending orbit in radians (horizontal, vertical)
    orbit: (f32, f32),
    /// Pending dolly towards the target in world units
    dolly: f32,
    pan: Vec3,
}

impl OrbitControls {
    pub fn new(config: &ControlsConfig, camera: &Camera) -> Self {
        Self {
            target: *camera.target(),
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            orbit: (0.0, 0.0),
            dolly: 0.0,
            pan: Vec3::zero(),
        }
    }

    /// Accumulates pointer input. The camera viewport converts pixels to angles.
    pub fn handle(&mut self, input: PointerInput, camera: &Camera) {
        let height = camera.viewport().height.max(1) as f32;
        match input {
            PointerInput::Rotate { dx, dy } => {
                self.orbit.0 += 2.0 * PI * dx / height * self.rotate_speed;
                self.orbit.1 += 2.0 * PI * dy / height * self.rotate_speed;
            },
            PointerInput::Pan { dx, dy } => {
                // world units per pixel at the target distance
                let distance = self.target.distance(*camera.position());
                let unit = 2.0 * distance / (camera.projection()[1][1] * height) * self.pan_speed;
                let right = camera.right_direction();
                let up = right.cross(camera.view_direction());
                self.pan += -right * dx * unit + up * dy * unit;
            },
            PointerInput::Zoom { delta } => {
                let step = ZOOM_BASE.powf(self.zoom_speed);
                let current = (self.target.distance(*camera.position()) - self.dolly)
                    .clamp(self.min_distance, self.max_distance);
                let next = if delta < 0.0 {
                    current * step
                } else if delta > 0.0 {
                    current / step
                } else {
                    current
                };
                self.dolly += current - next;
            },
        }
    }

    /// Hands the damped share of the pending input to the camera. Must be called each frame.
    /// Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let before = *camera.position();
        let factor = if self.enable_damping { self.damping_factor } else { 1.0 };

        let pan = self.pan * factor;
        if pan.magnitude2() > 0.0 {
            camera.translate(&pan);
            self.target += pan;
        }

        let (x, y) = (self.orbit.0 * factor, self.orbit.1 * factor);
        if x != 0.0 || y != 0.0 {
            // three-d orbits by a displacement seen from the camera, so scale the angle by distance
            let distance = self.target.distance(*camera.position());
            camera.rotate_around_with_fixed_up(&self.target, x * distance, y * distance);
        }

        let dolly = self.dolly * factor;
        if dolly != 0.0 || self.distance_out_of_range(camera) {
            camera.zoom_towards(&self.target, dolly, self.min_distance, self.max_distance);
        }

        let keep = 1.0 - factor;
        self.pan = if (self.pan * keep).magnitude() > REST_EPSILON { self.pan * keep } else { Vec3::zero() };
        self.orbit = (settle(self.orbit.0 * keep), settle(self.orbit.1 * keep));
        self.dolly = settle(self.dolly * keep);

        (camera.position() - before).magnitude2() > MOVE_EPSILON || pan.magnitude2() > MOVE_EPSILON
    }

    fn distance_out_of_range(&self, camera: &Camera) -> bool {
        let distance = self.target.distance(*camera.position());
        distance < self.min_distance || distance > self.max_distance
    }
}

fn settle(v: f32) -> f32 {
    if v.abs() > REST_EPSILON { v } else { 0.0 }
}
