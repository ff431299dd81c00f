use glam::Vec3;

use crate::controller::input::InputState;
use crate::controller::player::{lock_first_person_view, PlayerController};
use crate::model::{Camera, Scene};

/// Small margin shaved off the window size so the drawing surface never
/// trips scrollbars.
pub const RESIZE_MARGIN: (f64, f64) = (2.0, 2.5);

/// The whole mutable world: camera, scene, and the player controller.
/// `step` is GPU-free, so the simulation can run (and be tested) without a
/// window, a surface, or a real clock.
pub struct WorldState {
    pub camera: Camera,
    pub scene: Scene,
    pub controller: PlayerController,
}

impl WorldState {
    pub fn new(width: u32, height: u32) -> Self {
        let controller = PlayerController::new();
        let mut camera = Camera::new(width, height);
        camera.eye = Vec3::new(0.0, controller.height, -5.0);
        camera.set_look_at(Vec3::new(0.0, controller.height, 0.0));

        Self {
            camera,
            scene: Scene::new(),
            controller,
        }
    }

    /// One fixed-order frame step: decorative spin, input-driven camera
    /// update (including fire), projectile advance, then the first-person
    /// view lock. The view lock must see this frame's camera, so it runs
    /// last.
    pub fn step(&mut self, input: &InputState, now_ms: f64) {
        self.scene.spin_blocks();
        self.controller
            .update(&mut self.camera, &mut self.scene, input, now_ms);
        self.scene.projectiles.advance(now_ms);
        lock_first_person_view(&mut self.scene, &self.camera, now_ms);
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        use std::cell::RefCell;
        use std::rc::Rc;
        use wgpu::{Device, Queue, Surface};
        use web_sys::Window;

        use crate::view::RenderState;

        /// Per-frame driver for the browser build: re-armed from
        /// requestAnimationFrame, it resizes to the window, steps the world
        /// and pushes the result into GPU buffers. Drawing happens in the
        /// caller right after.
        pub struct FrameLoopContext {
            pub world: Rc<RefCell<WorldState>>,
            pub input: Rc<RefCell<InputState>>,
        }

        impl FrameLoopContext {
            pub fn update(
                &mut self,
                device: &Device,
                queue: &Queue,
                window: &Window,
                surface: &Surface,
                render_state: &mut RenderState,
            ) {
                let now_ms = window.performance().map(|p| p.now()).unwrap_or(0.0);

                self.handle_resize(window, device, surface, render_state);

                self.world.borrow_mut().step(&self.input.borrow(), now_ms);
                render_state.prepare(device, queue, &self.world.borrow());
            }

            fn handle_resize(
                &self,
                window: &Window,
                device: &Device,
                surface: &Surface,
                render_state: &mut RenderState,
            ) {
                let (Ok(w), Ok(h)) = (window.inner_width(), window.inner_height()) else {
                    return;
                };
                let nw = (w.as_f64().unwrap_or(800.0) - RESIZE_MARGIN.0).max(1.0) as u32;
                let nh = (h.as_f64().unwrap_or(600.0) - RESIZE_MARGIN.1).max(1.0) as u32;
                if nw != render_state.width || nh != render_state.height {
                    self.world.borrow_mut().camera.set_aspect(nw, nh);
                    render_state.resize(device, surface, nw, nh);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::projectile::LIFETIME_MS;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    #[test]
    fn starts_at_the_reference_pose() {
        let world = WorldState::new(800, 600);
        assert_eq!(world.camera.eye, Vec3::new(0.0, 2.0, -5.0));
        // Spawns looking at the scene center, i.e. half a turn from the
        // default -z facing
        assert!((world.camera.yaw.abs() - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn idle_steps_only_spin_the_blocks() {
        let mut world = WorldState::new(800, 600);
        let input = InputState::new();
        let eye = world.camera.eye;

        world.step(&input, 0.0);
        world.step(&input, FRAME_MS);

        assert_eq!(world.camera.eye, eye);
        assert_eq!(world.scene.projectiles.len(), 0);
        assert!(world.scene.blocks[0].rotation.x > 0.0);
    }

    #[test]
    fn a_fired_projectile_advances_within_the_same_frame() {
        let mut world = WorldState::new(800, 600);
        let mut input = InputState::new();
        input.key_down(" ");

        world.step(&input, 0.0);
        let p = world.scene.projectiles.iter().next().unwrap();
        // Fired from the camera (no model loaded), then advanced once
        assert_eq!(p.position, world.camera.eye + p.velocity);
    }

    #[test]
    fn projectiles_expire_through_the_frame_clock() {
        let mut world = WorldState::new(800, 600);
        let mut input = InputState::new();
        let before = world.scene.projectiles.len();

        input.key_down(" ");
        let mut now = 0.0;
        world.step(&input, now);
        input.key_up(" ");
        assert_eq!(world.scene.projectiles.len(), before + 1);

        while now <= LIFETIME_MS + FRAME_MS {
            now += FRAME_MS;
            world.step(&input, now);
        }
        assert_eq!(world.scene.projectiles.len(), before);
    }

    #[test]
    fn view_lock_tracks_the_post_move_camera() {
        let mut world = WorldState::new(800, 600);
        world.scene.player_model.resolve(Ok(crate::utils::Mesh::empty()));

        let mut input = InputState::new();
        input.key_down("w");
        world.step(&input, 0.0);

        // The model offset is computed from the camera position *after*
        // this frame's movement was applied.
        let cam = &world.camera;
        let swing = cam.yaw + std::f32::consts::FRAC_PI_6;
        let model = world.scene.player_model.ready().unwrap();
        assert!((model.position.x - (cam.eye.x - swing.sin() * 0.75)).abs() < 1e-5);
        assert!((model.position.z - (cam.eye.z + swing.cos() * 0.75)).abs() < 1e-5);
    }
}
