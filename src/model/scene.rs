use glam::Vec3;

use crate::model::projectile::ProjectileSystem;
use crate::utils::{create_box_mesh, create_floor_mesh, Mesh};

/// Sky color behind everything (0x94bdff).
pub const SKY_COLOR: [f64; 3] = [0.58, 0.741, 1.0];

pub const FLOOR_SIZE: f32 = 100.0;
pub const BLOCK_SIZE: f32 = 3.0;
/// Cosmetic spin applied to each decorative block, radians per frame.
pub const BLOCK_SPIN: f32 = 0.01;

/// White ambient term.
pub const AMBIENT_INTENSITY: f32 = 0.2;

/// The single point light of the scene.
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: f32,
    pub range: f32,
}

/// A decorative cube that spins in place every frame.
pub struct SpinBlock {
    pub mesh: Mesh,
    pub position: Vec3,
    pub rotation: Vec3,
}

impl SpinBlock {
    fn new(color: [f32; 4], position: Vec3) -> Self {
        Self {
            mesh: create_box_mesh(BLOCK_SIZE, BLOCK_SIZE, BLOCK_SIZE, color),
            position,
            rotation: Vec3::ZERO,
        }
    }

    pub fn spin(&mut self) {
        self.rotation.x += BLOCK_SPIN;
        self.rotation.y += BLOCK_SPIN;
    }
}

/// The asynchronously loaded first-person model. Posed every frame by the
/// view lock once ready.
pub struct PlayerModel {
    pub mesh: Mesh,
    pub position: Vec3,
    pub rotation: Vec3,
}

/// One-way slot for the player model: `Loading` until the fetch resolves,
/// then `Ready` or `Failed` forever. Dependent steps skip while not ready.
#[derive(Default)]
pub enum ModelSlot {
    #[default]
    Loading,
    Ready(PlayerModel),
    Failed,
}

impl ModelSlot {
    /// Resolve the pending load. Later resolutions are ignored.
    pub fn resolve(&mut self, result: Result<Mesh, crate::model::asset::AssetError>) {
        if !matches!(self, ModelSlot::Loading) {
            return;
        }
        match result {
            Ok(mesh) => {
                tracing::info!(vertices = mesh.vertices.len(), "player model ready");
                *self = ModelSlot::Ready(PlayerModel {
                    mesh,
                    position: Vec3::ZERO,
                    rotation: Vec3::ZERO,
                });
            }
            Err(e) => {
                // Permanent degraded state: the demo runs without the model
                tracing::warn!("player model unavailable: {e}");
                *self = ModelSlot::Failed;
            }
        }
    }

    pub fn ready(&self) -> Option<&PlayerModel> {
        match self {
            ModelSlot::Ready(model) => Some(model),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut PlayerModel> {
        match self {
            ModelSlot::Ready(model) => Some(model),
            _ => None,
        }
    }
}

/// Everything renderable: the static floor and blocks, the maybe-loaded
/// player model, and the live projectiles. Static meshes are built once at
/// startup and never destroyed.
pub struct Scene {
    pub floor: Mesh,
    pub blocks: [SpinBlock; 4],
    pub player_model: ModelSlot,
    pub projectiles: ProjectileSystem,
    pub lamp: PointLight,
}

impl Scene {
    pub fn new() -> Self {
        let red = [1.0, 0.0, 0.0, 1.0];
        let green = [0.0, 1.0, 0.0, 1.0];
        let blue = [0.0, 0.0, 1.0, 1.0];
        let yellow = [1.0, 1.0, 0.0, 1.0];

        Self {
            floor: create_floor_mesh(FLOOR_SIZE, FLOOR_SIZE, [1.0, 1.0, 1.0, 1.0]),
            blocks: [
                SpinBlock::new(red, Vec3::new(8.5, 3.0, 8.5)),
                SpinBlock::new(green, Vec3::new(8.5, 3.0, -8.5)),
                SpinBlock::new(blue, Vec3::new(-8.5, 3.0, -8.5)),
                SpinBlock::new(yellow, Vec3::new(-8.5, 3.0, 8.5)),
            ],
            player_model: ModelSlot::default(),
            projectiles: ProjectileSystem::new(),
            lamp: PointLight {
                position: Vec3::new(-3.0, 6.0, -3.0),
                intensity: 0.8,
                range: 18.0,
            },
        }
    }

    pub fn spin_blocks(&mut self) {
        for block in &mut self.blocks {
            block.spin();
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Mesh;

    #[test]
    fn blocks_spin_by_a_fixed_step_each_frame() {
        let mut scene = Scene::new();
        scene.spin_blocks();
        scene.spin_blocks();
        for block in &scene.blocks {
            assert!((block.rotation.x - 2.0 * BLOCK_SPIN).abs() < 1e-6);
            assert!((block.rotation.y - 2.0 * BLOCK_SPIN).abs() < 1e-6);
            assert_eq!(block.rotation.z, 0.0);
        }
    }

    #[test]
    fn model_slot_transitions_once() {
        let mut slot = ModelSlot::default();
        assert!(slot.ready().is_none());

        slot.resolve(Ok(Mesh::empty()));
        assert!(slot.ready().is_some());

        // A second resolution must not reset the slot
        slot.resolve(Err(crate::model::asset::AssetError::Decode(
            tobj::LoadError::ReadError,
        )));
        assert!(slot.ready().is_some());
    }

    #[test]
    fn failed_load_is_a_permanent_degraded_state() {
        let mut slot = ModelSlot::default();
        slot.resolve(Err(crate::model::asset::AssetError::Decode(
            tobj::LoadError::ReadError,
        )));
        assert!(slot.ready().is_none());
        slot.resolve(Ok(Mesh::empty()));
        assert!(slot.ready().is_none());
    }
}
