use crate::controller::Simulation;
use crate::model::{Camera, Lighting, SceneGraph};
use crate::ui;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub ambient: [f32; 4],
    pub light_pos: [f32; 4],
    pub light_color: [f32; 4],
}

impl SceneUniform {
    pub fn new(camera: &Camera, lighting: &Lighting) -> Self {
        let scaled = |c: [f32; 3], k: f32| [c[0] * k, c[1] * k, c[2] * k, 1.0];
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            ambient: scaled(lighting.ambient_color, lighting.ambient_intensity),
            light_pos: lighting.point_position.extend(1.0).to_array(),
            light_color: scaled(lighting.point_color, lighting.point_intensity),
        }
    }
}

/// Per-node model matrix and colour, uploaded as instance data
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceData {
    /// One entry per scene node, in node order
    pub fn from_scene(graph: &SceneGraph) -> Vec<InstanceData> {
        graph
            .world_matrices()
            .into_iter()
            .zip(graph.iter())
            .map(|(world, (_, node))| InstanceData {
                model: world.to_cols_array_2d(),
                color: node.color,
            })
            .collect()
    }
}

/// Everything the renderer needs for one frame
pub struct FrameData {
    pub uniform: SceneUniform,
    pub instances: Vec<InstanceData>,
}

/// Frames-per-second over a rolling one second window
#[derive(Debug, Default)]
pub struct FpsCounter {
    frame_count: u32,
    timer: f32,
    fps: f32,
}

impl FpsCounter {
    pub fn record(&mut self, dt: f32) {
        self.frame_count += 1;
        self.timer += dt;
        if self.timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.timer;
            self.frame_count = 0;
            self.timer = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Main frame loop state. Platform shells feed it input and a clock, then
/// hand the returned [`FrameData`] to the renderer.
pub struct FrameLoopContext {
    pub sim: Simulation,
    pub egui_ctx: egui::Context,
    fps: FpsCounter,
    last_time: Option<f64>,
}

impl FrameLoopContext {
    pub fn new(sim: Simulation) -> Self {
        Self {
            sim,
            egui_ctx: egui::Context::default(),
            fps: FpsCounter::default(),
            last_time: None,
        }
    }

    /// Tick the simulation once and collect the frame's GPU data. `now` (in
    /// seconds) only feeds the FPS readout.
    pub fn update(&mut self, now: f64) -> FrameData {
        let dt = self.last_time.map_or(0.0, |last| (now - last).max(0.0)) as f32;
        self.last_time = Some(now);
        self.fps.record(dt);

        self.sim.tick();

        if self.sim.ticks() % 600 == 0 {
            tracing::debug!(
                ticks = self.sim.ticks(),
                position = %self.sim.drone_position(),
                fps = self.fps.fps(),
                "frame loop"
            );
        }

        FrameData {
            uniform: SceneUniform::new(&self.sim.camera, &self.sim.lighting),
            instances: InstanceData::from_scene(&self.sim.scene.graph),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.sim.camera.set_aspect(width, height);
    }

    /// Build the HUD for this frame
    pub fn build_ui(&self, raw_input: egui::RawInput) -> egui::FullOutput {
        ui::build_ui(&self.egui_ctx, raw_input, &self.sim, self.fps.fps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SimConfig;
    use glam::{Mat4, Vec3};

    fn ctx() -> FrameLoopContext {
        FrameLoopContext::new(Simulation::new(SimConfig::default(), 800, 600))
    }

    #[test]
    fn gpu_structs_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<SceneUniform>(), 112);
        assert_eq!(std::mem::size_of::<InstanceData>(), 80);
    }

    #[test]
    fn update_ticks_once_per_frame() {
        let mut ctx = ctx();
        ctx.sim.handle_key("w", true);
        ctx.update(0.0);
        ctx.update(0.5);
        ctx.update(3.0);
        assert_eq!(ctx.sim.ticks(), 3);
        // wall clock gaps do not scale movement
        assert!(ctx.sim.drone_position().abs_diff_eq(Vec3::new(0.0, 0.0, -0.3), 1e-5));
    }

    #[test]
    fn instances_carry_world_transforms() {
        let mut ctx = ctx();
        ctx.sim.handle_key("d", true);
        let frame = ctx.update(0.0);
        assert_eq!(frame.instances.len(), ctx.sim.scene.graph.len());

        let drone = ctx.sim.scene.drone.index();
        let m = Mat4::from_cols_array_2d(&frame.instances[drone].model);
        assert!(m.w_axis.truncate().abs_diff_eq(Vec3::new(0.1, 0.0, 0.0), 1e-6));

        let prop = ctx.sim.scene.propellers[3].index();
        let m = Mat4::from_cols_array_2d(&frame.instances[prop].model);
        assert!(m.w_axis.truncate().abs_diff_eq(Vec3::new(0.7, 0.3, 0.6), 1e-5));
        assert_eq!(frame.instances[prop].color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn uniform_scales_light_by_intensity() {
        let ctx = ctx();
        let u = SceneUniform::new(&ctx.sim.camera, &ctx.sim.lighting);
        assert_eq!(u.ambient, [0.6, 0.6, 0.6, 1.0]);
        assert_eq!(u.light_pos, [10.0, 10.0, 10.0, 1.0]);
        assert_eq!(u.light_color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn fps_counter_averages_over_a_second() {
        let mut fps = FpsCounter::default();
        for _ in 0..60 {
            fps.record(1.0 / 60.0);
        }
        // float drift may leave the window one frame short
        fps.record(1.0 / 60.0);
        assert!((fps.fps() - 60.0).abs() < 1.5, "fps {}", fps.fps());
    }
}
