// CONTROLLER: input, game logic, and the update loop
pub mod frame_loop;
pub mod input;
pub mod player;

pub use frame_loop::WorldState;
#[cfg(target_arch = "wasm32")]
pub use frame_loop::FrameLoopContext;
pub use input::{InputProcessor, InputState, KeyBindings};
pub use player::{lock_first_person_view, PlayerController, FIRE_COOLDOWN_FRAMES};
