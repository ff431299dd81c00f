use glam::Vec3;

use crate::model::camera::flat_heading;

/// Distance a projectile covers per frame.
pub const MUZZLE_SPEED: f32 = 1.0;
/// Wall-clock lifetime of a projectile.
pub const LIFETIME_MS: f64 = 1000.0;

#[derive(Debug, Clone)]
pub struct Projectile {
    pub position: Vec3,
    pub velocity: Vec3,
    pub expires_at_ms: f64,
}

impl Projectile {
    pub fn is_alive(&self, now_ms: f64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// Owns every live projectile. Expiry is a per-entity deadline checked
/// during `advance`, so the whole lifecycle is driven from the frame loop
/// and nothing mutates the list between frames.
#[derive(Debug, Default)]
pub struct ProjectileSystem {
    projectiles: Vec<Projectile>,
}

impl ProjectileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    /// Spawn a projectile at `origin` travelling along the horizontal
    /// direction given by `yaw`. Velocity is fixed at spawn time.
    pub fn fire(&mut self, origin: Vec3, yaw: f32, now_ms: f64) {
        let velocity = flat_heading(yaw) * MUZZLE_SPEED;
        self.projectiles.push(Projectile {
            position: origin,
            velocity,
            expires_at_ms: now_ms + LIFETIME_MS,
        });
        tracing::debug!(
            live = self.projectiles.len(),
            "fired projectile at {origin:?}"
        );
    }

    /// Sweep out expired entries, then move each survivor by exactly one
    /// velocity step. Expired entries never move.
    pub fn advance(&mut self, now_ms: f64) {
        self.projectiles.retain(|p| p.is_alive(now_ms));
        for p in &mut self.projectiles {
            p.position += p.velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_accumulates_exactly_one_velocity_per_advance() {
        let mut sys = ProjectileSystem::new();
        let origin = Vec3::new(1.0, 0.07, 2.0);
        sys.fire(origin, 0.0, 0.0);
        let velocity = sys.iter().next().unwrap().velocity;
        for n in 1..=5 {
            sys.advance(1.0);
            let p = sys.iter().next().unwrap();
            assert_eq!(p.position, origin + velocity * n as f32);
        }
    }

    #[test]
    fn velocity_rotates_with_yaw() {
        let mut sys = ProjectileSystem::new();
        sys.fire(Vec3::ZERO, std::f32::consts::FRAC_PI_2, 0.0);
        let v = sys.iter().next().unwrap().velocity;
        assert!((v.x + MUZZLE_SPEED).abs() < 1e-6);
        assert!(v.y.abs() < f32::EPSILON);
        assert!(v.z.abs() < 1e-6);
    }

    #[test]
    fn expired_entries_are_swept_on_the_next_advance() {
        let mut sys = ProjectileSystem::new();
        sys.fire(Vec3::ZERO, 0.0, 0.0);
        sys.fire(Vec3::ZERO, 0.0, 500.0);
        sys.fire(Vec3::ZERO, 0.0, 999.0);
        assert_eq!(sys.len(), 3);

        // First projectile's deadline passes; the other two survive.
        sys.advance(LIFETIME_MS);
        assert_eq!(sys.len(), 2);

        // All deadlines passed, including the tail entry.
        sys.advance(999.0 + LIFETIME_MS);
        assert_eq!(sys.len(), 0);
    }

    #[test]
    fn dead_projectiles_do_not_move() {
        let mut sys = ProjectileSystem::new();
        sys.fire(Vec3::ZERO, 0.0, 0.0);
        sys.advance(100.0);
        let moved = sys.iter().next().unwrap().position;
        sys.advance(LIFETIME_MS); // expires here, must be removed untouched
        assert_eq!(sys.len(), 0);
        assert_eq!(moved, Vec3::new(0.0, 0.0, -MUZZLE_SPEED));
    }

    #[test]
    fn collection_returns_to_prefire_count_after_expiry() {
        let mut sys = ProjectileSystem::new();
        let before = sys.len();
        sys.fire(Vec3::ZERO, 0.3, 0.0);
        assert_eq!(sys.len(), before + 1);

        // ~60 frames at 16.7 ms carries the clock past the 1000 ms lifetime.
        let mut now = 0.0;
        for _ in 0..70 {
            now += 16.7;
            sys.advance(now);
        }
        assert_eq!(sys.len(), before);
    }
}
