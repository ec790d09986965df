use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::utils::{create_box_mesh, create_cylinder_mesh, create_plane_mesh, Mesh};

/// Index of a node inside a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Parent-relative transform. Rotation is Euler radians applied in XYZ order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// Geometry a node draws with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Plane { width: f32, height: f32 },
    Box { width: f32, height: f32, depth: f32 },
    Cylinder { radius_top: f32, radius_bottom: f32, height: f32, segments: u32 },
}

impl Shape {
    pub fn build(&self) -> Mesh {
        match *self {
            Shape::Plane { width, height } => create_plane_mesh(width, height),
            Shape::Box { width, height, depth } => create_box_mesh(width, height, depth),
            Shape::Cylinder { radius_top, radius_bottom, height, segments } => {
                create_cylinder_mesh(radius_top, radius_bottom, height, segments)
            }
        }
    }
}

/// Linear RGBA colour from a 0xRRGGBB hex value (sRGB encoded)
pub fn color_from_hex(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
    };
    [channel(16), channel(8), channel(0), 1.0]
}

pub struct SceneNode {
    pub name: &'static str,
    pub shape: Option<Shape>,
    pub color: [f32; 4],
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena-backed retained scene graph. Nodes are never removed.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &'static str, shape: Option<Shape>, color: [f32; 4], transform: Transform) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name,
            shape,
            color,
            transform,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Attach `child` under `parent`. Parents are always created before their
    /// children, so world matrices can be resolved in index order; any other
    /// pairing is refused and leaves the graph untouched.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent.0 >= child.0 || child.0 >= self.nodes.len() {
            tracing::warn!(parent = parent.0, child = child.0, "refusing attach: parent must precede child");
            return false;
        }
        if let Some(old) = self.nodes[child.0].parent.replace(parent) {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[parent.0].children.push(child);
        true
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn transform(&self, id: NodeId) -> &Transform {
        &self.nodes[id.0].transform
    }

    pub fn transform_mut(&mut self, id: NodeId) -> &mut Transform {
        &mut self.nodes[id.0].transform
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = &self.nodes[id.0];
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// World matrix of every node, indexed like the nodes themselves
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut out: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.transform.matrix();
            let world = match node.parent {
                Some(parent) => out[parent.0] * local,
                None => local,
            };
            out.push(world);
        }
        out
    }
}

/// Ambient plus a single point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub point_position: Vec3,
    pub point_color: [f32; 3],
    pub point_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.6,
            point_position: Vec3::new(10.0, 10.0, 10.0),
            point_color: [1.0, 1.0, 1.0],
            point_intensity: 1.0,
        }
    }
}

pub const PROPELLER_OFFSETS: [Vec3; 4] = [
    Vec3::new(-0.6, 0.3, -0.6),
    Vec3::new(0.6, 0.3, -0.6),
    Vec3::new(-0.6, 0.3, 0.6),
    Vec3::new(0.6, 0.3, 0.6),
];

/// The demo scene: ground, drone body and its four propellers
pub struct DroneScene {
    pub graph: SceneGraph,
    pub ground: NodeId,
    pub drone: NodeId,
    pub propellers: [NodeId; 4],
}

impl DroneScene {
    pub fn build() -> Self {
        let mut graph = SceneGraph::new();

        let ground = graph.add(
            "ground",
            Some(Shape::Plane { width: 50.0, height: 50.0 }),
            color_from_hex(0x555555),
            Transform {
                position: Vec3::new(0.0, -1.0, 0.0),
                rotation: Vec3::new(-FRAC_PI_2, 0.0, 0.0),
                ..Transform::default()
            },
        );

        let drone = graph.add(
            "drone",
            Some(Shape::Box { width: 1.0, height: 0.5, depth: 1.0 }),
            color_from_hex(0x00ff00),
            Transform::default(),
        );

        let propeller_shape = Shape::Cylinder { radius_top: 0.1, radius_bottom: 0.1, height: 0.05, segments: 32 };
        let propellers = PROPELLER_OFFSETS.map(|offset| {
            let id = graph.add(
                "propeller",
                Some(propeller_shape),
                color_from_hex(0x000000),
                Transform {
                    position: offset,
                    rotation: Vec3::new(FRAC_PI_2, 0.0, 0.0),
                    ..Transform::default()
                },
            );
            graph.attach(drone, id);
            id
        });

        tracing::debug!(nodes = graph.len(), "built drone scene");

        Self { graph, ground, drone, propellers }
    }

    pub fn drone_position(&self) -> Vec3 {
        self.graph.transform(self.drone).position
    }

    pub fn propeller_angle(&self, index: usize) -> f32 {
        self.graph.transform(self.propellers[index]).rotation.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_propellers_under_the_drone() {
        let scene = DroneScene::build();
        assert_eq!(scene.graph.len(), 6);
        assert_eq!(scene.graph.node(scene.drone).children, scene.propellers.to_vec());
        for (p, offset) in scene.propellers.iter().zip(PROPELLER_OFFSETS) {
            let node = scene.graph.node(*p);
            assert_eq!(node.parent, Some(scene.drone));
            assert_eq!(node.transform.position, offset);
            assert_eq!(node.transform.rotation.z, 0.0);
        }
        assert_eq!(scene.graph.node(scene.ground).parent, None);
    }

    #[test]
    fn drone_starts_at_origin() {
        let scene = DroneScene::build();
        assert_eq!(scene.drone_position(), Vec3::ZERO);
    }

    #[test]
    fn child_world_position_follows_parent() {
        let mut scene = DroneScene::build();
        scene.graph.transform_mut(scene.drone).position = Vec3::new(2.0, 1.0, -3.0);
        for (p, offset) in scene.propellers.iter().zip(PROPELLER_OFFSETS) {
            let world = scene.graph.world_matrix(*p).w_axis.truncate();
            assert!(world.abs_diff_eq(Vec3::new(2.0, 1.0, -3.0) + offset, 1e-6));
        }
    }

    #[test]
    fn batched_matrices_match_recursive() {
        let mut scene = DroneScene::build();
        scene.graph.transform_mut(scene.drone).position = Vec3::new(0.5, -0.2, 4.0);
        scene.graph.transform_mut(scene.propellers[2]).rotation.z = 1.3;
        let all = scene.graph.world_matrices();
        for (id, _) in scene.graph.iter() {
            assert!(all[id.index()].abs_diff_eq(scene.graph.world_matrix(id), 1e-6));
        }
    }

    #[test]
    fn ground_lies_flat_below_drone() {
        let scene = DroneScene::build();
        let m = scene.graph.world_matrix(scene.ground);
        // plane normal +Z rotated to +Y
        let normal = m.transform_vector3(Vec3::Z);
        assert!(normal.abs_diff_eq(Vec3::Y, 1e-6));
        assert_eq!(m.w_axis.truncate(), Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn reattach_moves_child() {
        let mut graph = SceneGraph::new();
        let a = graph.add("a", None, [1.0; 4], Transform::default());
        let b = graph.add("b", None, [1.0; 4], Transform::default());
        let c = graph.add("c", None, [1.0; 4], Transform::from_position(Vec3::X));
        graph.attach(a, c);
        graph.attach(b, c);
        assert!(graph.node(a).children.is_empty());
        assert_eq!(graph.node(b).children, vec![c]);
        assert_eq!(graph.node(c).parent, Some(b));
    }

    #[test]
    fn attach_refuses_child_created_first() {
        let mut graph = SceneGraph::new();
        let a = graph.add("a", None, [1.0; 4], Transform::default());
        let b = graph.add("b", None, [1.0; 4], Transform::default());
        assert!(!graph.attach(b, a));
        assert!(!graph.attach(a, a));
        assert!(graph.node(b).children.is_empty());
        assert_eq!(graph.node(a).parent, None);
        assert!(graph.attach(a, b));
    }

    #[test]
    fn nodes_carry_their_names() {
        let scene = DroneScene::build();
        assert!(!scene.graph.is_empty());
        assert_eq!(scene.graph.node(scene.drone).name, "drone");
        assert_eq!(scene.graph.node(scene.ground).name, "ground");
    }

    #[test]
    fn hex_colours() {
        assert_eq!(color_from_hex(0x00ff00), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(color_from_hex(0x000000), [0.0, 0.0, 0.0, 1.0]);
        let grey = color_from_hex(0x555555);
        assert!(grey[0] > 0.08 && grey[0] < 0.1);
    }
}
