use glam::{EulerRot, Mat3, Mat4, Vec3};

/// Where the default camera sits: 2.5 units behind the origin, looking +Z.
pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 0.0, -2.5);

/// A free camera described by a position and Euler rotation in degrees.
///
/// `rotation.y` is yaw, `rotation.x` pitch, `rotation.z` roll. Yaw is applied
/// last, so pitch always tilts about the camera's own horizontal axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            rotation: Vec3::ZERO,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation_degrees: Vec3) {
        self.rotation = rotation_degrees;
    }

    fn orientation(&self) -> Mat3 {
        let r = self.rotation * std::f32::consts::PI / 180.0;
        Mat3::from_euler(EulerRot::YXZ, r.y, r.x, r.z)
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }

    /// Left-handed look-at from the position toward `position + forward`.
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.orientation();
        let forward = rotation * Vec3::Z;
        let up = rotation * Vec3::Y;
        Mat4::look_at_lh(self.position, self.position + forward, up)
    }
}
