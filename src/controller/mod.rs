// CONTROLLER: Input, per-tick update, and frame loop glue
pub mod input;
pub mod simulation;
pub mod frame_loop;

pub use input::{Direction, InputEvent, InputState, KeyBindings, apply_key_event};
pub use simulation::{SimConfig, Simulation};
pub use frame_loop::{FrameData, FrameLoopContext, FpsCounter, InstanceData, SceneUniform};
