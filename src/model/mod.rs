// MODEL: Scene graph and camera
pub mod camera;
pub mod scene;

pub use camera::Camera;
pub use scene::{DroneScene, Lighting, NodeId, SceneGraph, SceneNode, Shape, Transform, PROPELLER_OFFSETS};
