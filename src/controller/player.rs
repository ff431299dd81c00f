use glam::Vec3;

use crate::controller::input::{InputProcessor, InputState};
use crate::model::camera::flat_heading;
use crate::model::{Camera, Scene};

/// Frames to wait between shots.
pub const FIRE_COOLDOWN_FRAMES: u32 = 10;
/// Muzzle sits slightly above the model origin.
const MUZZLE_RISE: f32 = 0.07;

/// Movement parameters plus the fire-rate gate. All magnitudes are
/// per-frame so one tick always moves the camera by exactly one step.
pub struct PlayerController {
    pub height: f32,
    pub speed: f32,
    pub turn_speed: f32,
    pub shoot_cooldown: u32,
    processor: InputProcessor,
}

impl PlayerController {
    pub fn new() -> Self {
        Self {
            height: 2.0,
            speed: 0.2,
            turn_speed: std::f32::consts::PI * 0.02,
            shoot_cooldown: 0,
            processor: InputProcessor::default(),
        }
    }

    /// Run one tick of input handling: cooldown decay, camera translation
    /// and turning, and a gated projectile launch.
    pub fn update(
        &mut self,
        camera: &mut Camera,
        scene: &mut Scene,
        input: &InputState,
        now_ms: f64,
    ) {
        // Decays every frame regardless of input, floored at zero
        self.shoot_cooldown = self.shoot_cooldown.saturating_sub(1);

        let p = &self.processor;
        if p.is_moving_forward(input) {
            camera.eye += camera.forward_flat() * self.speed;
        }
        if p.is_moving_backward(input) {
            camera.eye -= camera.forward_flat() * self.speed;
        }
        if p.is_strafing_left(input) {
            // Strafing is the forward heading rotated a quarter turn
            camera.eye += flat_heading(camera.yaw + std::f32::consts::FRAC_PI_2) * self.speed;
        }
        if p.is_strafing_right(input) {
            camera.eye += flat_heading(camera.yaw - std::f32::consts::FRAC_PI_2) * self.speed;
        }
        if p.is_turning_left(input) {
            camera.yaw += self.turn_speed;
        }
        if p.is_turning_right(input) {
            camera.yaw -= self.turn_speed;
        }

        if p.is_firing(input) && self.shoot_cooldown == 0 {
            let origin = muzzle_position(scene, camera);
            scene.projectiles.fire(origin, camera.yaw, now_ms);
            self.shoot_cooldown = FIRE_COOLDOWN_FRAMES;
        }
    }
}

impl Default for PlayerController {
    fn default() -> Self {
        Self::new()
    }
}

/// Shots leave from the visible model when it is loaded, otherwise from the
/// camera itself so firing works during (or after a failed) load.
fn muzzle_position(scene: &Scene, camera: &Camera) -> Vec3 {
    match scene.player_model.ready() {
        Some(model) => model.position + Vec3::new(0.0, MUZZLE_RISE, 0.0),
        None => camera.eye,
    }
}

/// Pin the loaded model to the camera: a fixed offset behind and below the
/// eye, with a small sine bob, facing the same way as the camera (the
/// model's forward axis is reversed, hence the half-turn on yaw). No-op
/// until the model load resolves.
pub fn lock_first_person_view(scene: &mut Scene, camera: &Camera, now_ms: f64) {
    let Some(model) = scene.player_model.ready_mut() else {
        return;
    };

    let t = (now_ms * 0.0005) as f32;
    let bob = (t * 4.0 + camera.eye.x + camera.eye.z).sin() * 0.01;
    let swing = camera.yaw + std::f32::consts::FRAC_PI_6;

    model.position = Vec3::new(
        camera.eye.x - swing.sin() * 0.75,
        camera.eye.y - 0.5 + bob,
        camera.eye.z + swing.cos() * 0.75,
    );
    model.rotation = Vec3::new(
        camera.pitch,
        camera.yaw - std::f32::consts::PI,
        camera.roll,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSlot;
    use crate::utils::Mesh;

    fn rig() -> (PlayerController, Camera, Scene, InputState) {
        (
            PlayerController::new(),
            Camera::new(800, 600),
            Scene::new(),
            InputState::new(),
        )
    }

    #[test]
    fn forward_at_zero_yaw_moves_down_negative_z() {
        let (mut ctl, mut cam, mut scene, mut input) = rig();
        cam.eye = Vec3::new(0.0, 2.0, -5.0);
        input.key_down("w");

        ctl.update(&mut cam, &mut scene, &input, 0.0);
        assert!((cam.eye.z - (-5.2)).abs() < 1e-6);
        assert_eq!(cam.eye.x, 0.0);
    }

    #[test]
    fn five_forward_ticks_cover_one_unit() {
        let (mut ctl, mut cam, mut scene, mut input) = rig();
        cam.eye = Vec3::new(0.0, 2.0, -5.0);
        input.key_down("w");

        for _ in 0..5 {
            ctl.update(&mut cam, &mut scene, &input, 0.0);
        }
        assert!((cam.eye.z - (-6.0)).abs() < 1e-5);
        assert_eq!(cam.eye.x, 0.0);
        assert_eq!(cam.eye.y, 2.0);
    }

    #[test]
    fn one_turn_tick_changes_yaw_by_the_turn_speed() {
        let (mut ctl, mut cam, mut scene, mut input) = rig();
        input.key_down("ArrowLeft");
        ctl.update(&mut cam, &mut scene, &input, 0.0);
        assert!((cam.yaw - ctl.turn_speed).abs() < 1e-6);

        input.key_up("ArrowLeft");
        input.key_down("ArrowRight");
        ctl.update(&mut cam, &mut scene, &input, 0.0);
        assert!(cam.yaw.abs() < 1e-6);
    }

    #[test]
    fn strafing_is_perpendicular_to_facing() {
        let (mut ctl, mut cam, mut scene, mut input) = rig();
        input.key_down("a");
        ctl.update(&mut cam, &mut scene, &input, 0.0);
        // Facing -z, left is -x
        assert!((cam.eye.x + ctl.speed).abs() < 1e-6);
        assert!(cam.eye.z.abs() < 1e-6);
    }

    #[test]
    fn fire_is_gated_by_the_cooldown() {
        let (mut ctl, mut cam, mut scene, mut input) = rig();
        input.key_down(" ");

        ctl.update(&mut cam, &mut scene, &input, 0.0);
        assert_eq!(scene.projectiles.len(), 1);
        assert_eq!(ctl.shoot_cooldown, FIRE_COOLDOWN_FRAMES);

        // Holding fire through the cooldown adds nothing and the counter
        // drops by exactly one per tick.
        for frame in 1..FIRE_COOLDOWN_FRAMES {
            ctl.update(&mut cam, &mut scene, &input, 0.0);
            assert_eq!(scene.projectiles.len(), 1);
            assert_eq!(ctl.shoot_cooldown, FIRE_COOLDOWN_FRAMES - frame);
        }

        // Cooldown reaches zero on this tick, so the shot goes out again
        ctl.update(&mut cam, &mut scene, &input, 0.0);
        assert_eq!(scene.projectiles.len(), 2);
    }

    #[test]
    fn cooldown_decays_without_input_and_floors_at_zero() {
        let (mut ctl, mut cam, mut scene, input) = rig();
        ctl.shoot_cooldown = 2;
        for _ in 0..5 {
            ctl.update(&mut cam, &mut scene, &input, 0.0);
        }
        assert_eq!(ctl.shoot_cooldown, 0);
    }

    #[test]
    fn movement_and_shot_share_the_camera_heading() {
        let (mut ctl, mut cam, mut scene, mut input) = rig();
        cam.yaw = 0.7;
        let eye = cam.eye;
        input.key_down("w");
        input.key_down(" ");

        ctl.update(&mut cam, &mut scene, &input, 0.0);

        let step = cam.eye - eye;
        let v = scene.projectiles.iter().next().unwrap().velocity;
        assert!((step.normalize() - cam.forward_flat()).length() < 1e-6);
        assert!((v.normalize() - cam.forward_flat()).length() < 1e-6);
    }

    #[test]
    fn shots_leave_from_the_camera_while_the_model_is_absent() {
        let (mut ctl, mut cam, mut scene, mut input) = rig();
        cam.eye = Vec3::new(1.0, 2.0, 3.0);
        input.key_down(" ");
        ctl.update(&mut cam, &mut scene, &input, 0.0);
        assert_eq!(scene.projectiles.iter().next().unwrap().position, cam.eye);
    }

    #[test]
    fn view_lock_is_skipped_until_the_model_is_ready() {
        let (_, cam, mut scene, _) = rig();
        // Must not panic while the slot is still loading
        lock_first_person_view(&mut scene, &cam, 0.0);

        scene.player_model = ModelSlot::Loading;
        scene.player_model.resolve(Ok(Mesh::empty()));
        lock_first_person_view(&mut scene, &cam, 0.0);

        let model = scene.player_model.ready().unwrap();
        // Offset behind and below the eye (yaw = 0, bob at t = 0)
        let swing = std::f32::consts::FRAC_PI_6;
        assert!((model.position.x - (cam.eye.x - swing.sin() * 0.75)).abs() < 1e-6);
        assert!((model.position.z - (cam.eye.z + swing.cos() * 0.75)).abs() < 1e-6);
        assert!((model.position.y - (cam.eye.y - 0.5)).abs() < 0.02);
        assert!((model.rotation.y - (cam.yaw - std::f32::consts::PI)).abs() < 1e-6);
    }
}
