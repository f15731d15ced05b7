//! A fly-through camera driven by keyboard, mouse and scroll input.

use glam::{Mat3, Mat4, Vec3};

/// Default yaw in degrees. Looks down -Z.
pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
/// Movement speed in units per second.
pub const SPEED: f32 = 2.5;
/// Degrees of rotation per unit of mouse movement.
pub const SENSITIVITY: f32 = 0.1;
/// Vertical field of view in degrees, also the widest zoom allowed.
pub const ZOOM: f32 = 45.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const PITCH_LIMIT: f32 = 89.0;

/// A direction of keyboard movement relative to where the camera looks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Perspective parameters, kept around so the aspect ratio stays inspectable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    /// Returns the OpenGL style perspective matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }
}

/// Strips the translation out of a view matrix, keeping only its rotation.
pub fn rotation_only(view: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(view))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    /// Degrees.
    yaw: f32,
    /// Degrees.
    pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self::with_orientation(position, YAW, PITCH)
    }

    pub fn with_orientation(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw,
            pitch,
            speed: SPEED,
            sensitivity: SENSITIVITY,
            zoom: ZOOM,
            near: 0.1,
            far: 100.0,
        };
        camera.update_vectors();
        camera
    }

    /// Moves the camera by `speed * delta_time` in the given direction.
    pub fn process_keyboard(&mut self, direction: Movement, delta_time: f32) {
        let velocity = self.speed * delta_time;
        match direction {
            Movement::Forward => self.position += self.front * velocity,
            Movement::Backward => self.position -= self.front * velocity,
            Movement::Left => self.position -= self.right * velocity,
            Movement::Right => self.position += self.right * velocity,
        }
    }

    /// Turns the camera by a mouse offset. Positive `y_offset` looks up.
    pub fn process_mouse(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        if x_offset == 0.0 && y_offset == 0.0 {
            return;
        }
        self.yaw += x_offset * self.sensitivity;
        self.pitch += y_offset * self.sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_vectors();
    }

    /// Zooms in for positive `y_offset`.
    pub fn process_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, ZOOM);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection(&self, aspect: f32) -> Projection {
        Projection {
            fov_y_degrees: self.zoom,
            aspect,
            near: self.near,
            far: self.far,
        }
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Current field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Sets the field of view in degrees, clamped to the zoom range.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, -0.25));
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, EPSILON));
        assert!(camera.right().abs_diff_eq(Vec3::X, EPSILON));
        assert_eq!(camera.zoom(), 45.0);
    }

    #[test]
    fn test_forward_movement_is_frame_rate_independent() {
        let mut stepped = Camera::with_orientation(Vec3::ZERO, 30.0, 10.0);
        let mut single = stepped.clone();

        stepped.process_keyboard(Movement::Forward, 0.5);
        stepped.process_keyboard(Movement::Forward, 0.5);
        single.process_keyboard(Movement::Forward, 1.0);

        assert!(stepped.position.abs_diff_eq(single.position, EPSILON));
        let expected = single.front() * SPEED;
        assert!(single.position.abs_diff_eq(expected, EPSILON));
    }

    #[test]
    fn test_strafing_uses_right_vector() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.process_keyboard(Movement::Right, 2.0);
        assert!(camera.position.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), EPSILON));
        camera.process_keyboard(Movement::Left, 2.0);
        camera.process_keyboard(Movement::Backward, 0.4);
        assert!(camera.position.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), EPSILON));
    }

    #[test]
    fn test_zero_mouse_delta_changes_nothing() {
        let mut camera = Camera::with_orientation(Vec3::ZERO, 12.5, -33.0);
        let before = camera.clone();
        camera.process_mouse(0.0, 0.0, true);
        assert_eq!(camera.yaw(), before.yaw());
        assert_eq!(camera.pitch(), before.pitch());
        assert_eq!(camera, before);
    }

    #[test]
    fn test_pitch_is_constrained() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.process_mouse(10.0, 5000.0, true);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
        assert_eq!(camera.yaw(), YAW + 1.0);

        camera.process_mouse(0.0, -5000.0, false);
        assert!(camera.pitch() < -PITCH_LIMIT);
    }

    #[test]
    fn test_scroll_clamps_zoom() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.process_scroll(10.0);
        assert_eq!(camera.zoom(), 35.0);
        camera.process_scroll(100.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
        camera.process_scroll(-100.0);
        assert_eq!(camera.zoom(), ZOOM);
    }

    #[test]
    fn test_projection_aspect() {
        let camera = Camera::new(Vec3::ZERO);
        let projection = camera.projection(1600.0 / 900.0);
        assert_eq!(projection.aspect, 1600.0 / 900.0);
        assert_eq!(projection.fov_y_degrees, 45.0);

        let m = projection.matrix();
        let ratio = m.y_axis.y / m.x_axis.x;
        assert!((ratio - 1600.0 / 900.0).abs() < EPSILON);
    }

    #[test]
    fn test_rotation_only_strips_translation() {
        let camera = Camera::with_orientation(Vec3::new(3.0, -2.0, 7.0), 20.0, 15.0);
        let view = rotation_only(camera.view_matrix());

        assert_eq!(view.w_axis, Vec4::W);
        let moved = Camera::with_orientation(Vec3::new(-50.0, 8.0, 1.0), 20.0, 15.0);
        assert!(view.abs_diff_eq(rotation_only(moved.view_matrix()), EPSILON));
    }
}
