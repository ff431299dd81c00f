use glam::{Mat4, Vec3};

/// Unit direction in the horizontal plane for the given yaw. The single
/// source for every yaw-to-direction conversion: camera facing, movement
/// and projectile launch all go through here so they cannot drift apart.
pub fn flat_heading(yaw: f32) -> Vec3 {
    Vec3::new(-yaw.sin(), 0.0, -yaw.cos())
}

/// First-person camera. Yaw is rotation about +y; at yaw = 0 the camera
/// faces -z and increasing yaw turns left. Position is unbounded.
pub struct Camera {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            up: Vec3::Y,
            fov_y: 90f32.to_radians(),
            aspect: width as f32 / height as f32,
            z_near: 0.1,
            z_far: 25.0,
        }
    }

    /// Facing direction projected onto the horizontal plane. Movement and
    /// projectile launch both derive from this, so they realign with the
    /// camera continuously as it turns.
    pub fn forward_flat(&self) -> Vec3 {
        flat_heading(self.yaw)
    }

    pub fn forward(&self) -> Vec3 {
        let cp = self.pitch.clamp(-1.5533, 1.5533); // Slightly less than π/2 to avoid gimbal lock
        Vec3::new(
            -self.yaw.sin() * cp.cos(),
            cp.sin(),
            -self.yaw.cos() * cp.cos(),
        )
        .normalize()
    }

    pub fn target(&self) -> Vec3 {
        self.eye + self.forward()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target(), self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        let dir = (target - self.eye).normalize();
        self.yaw = (-dir.x).atan2(-dir.z);
        self.pitch = dir.y.asin().clamp(-1.4, 1.4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_at_zero_yaw_points_down_negative_z() {
        let cam = Camera::new(800, 600);
        let fwd = cam.forward_flat();
        assert!(fwd.x.abs() < f32::EPSILON);
        assert!((fwd.z + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn increasing_yaw_turns_left() {
        let mut cam = Camera::new(800, 600);
        cam.yaw = std::f32::consts::FRAC_PI_2;
        let fwd = cam.forward_flat();
        assert!((fwd.x + 1.0).abs() < 1e-6);
        assert!(fwd.z.abs() < 1e-6);
    }

    #[test]
    fn look_at_recovers_forward_direction() {
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::new(0.0, 2.0, -5.0);
        cam.set_look_at(Vec3::new(0.0, 2.0, 0.0));
        // Target is straight ahead in +z, so yaw must be π (facing away
        // from the -z default).
        assert!((cam.yaw.abs() - std::f32::consts::PI).abs() < 1e-6);
        assert!(cam.pitch.abs() < 1e-6);
    }
}
