// MODEL: scene state and data
pub mod asset;
pub mod camera;
pub mod projectile;
pub mod scene;

pub use asset::AssetError;
pub use camera::Camera;
pub use projectile::{Projectile, ProjectileSystem};
pub use scene::{ModelSlot, PlayerModel, Scene, SpinBlock};
