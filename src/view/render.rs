use wgpu::*;
use wgpu::util::DeviceExt;

use crate::controller::{FrameData, InstanceData, SceneUniform};
use crate::model::SceneGraph;
use crate::utils::{MeshBuffer, Vertex};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const CLEAR_COLOR: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };

fn create_attachment(
    device: &Device,
    label: &str,
    format: TextureFormat,
    sample_count: u32,
    width: u32,
    height: u32,
) -> TextureView {
    device
        .create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&TextureViewDescriptor::default())
}

/// Size-dependent render targets: depth, plus a multisampled colour buffer
/// that resolves into the surface when MSAA is on.
struct Targets {
    depth: TextureView,
    msaa_color: Option<TextureView>,
}

impl Targets {
    fn new(device: &Device, format: TextureFormat, sample_count: u32, width: u32, height: u32) -> Self {
        let depth = create_attachment(device, "depth_texture", DEPTH_FORMAT, sample_count, width, height);
        let msaa_color = (sample_count > 1)
            .then(|| create_attachment(device, "msaa_color_texture", format, sample_count, width, height));
        Self { depth, msaa_color }
    }

    /// Colour attachment for the scene pass: (render target, resolve target)
    fn color<'a>(&'a self, surface_view: &'a TextureView) -> (&'a TextureView, Option<&'a TextureView>) {
        match &self.msaa_color {
            Some(msaa) => (msaa, Some(surface_view)),
            None => (surface_view, None),
        }
    }
}

fn create_mesh_pipeline(
    device: &Device,
    format: TextureFormat,
    sample_count: u32,
    bind_group_layout: &BindGroupLayout,
) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("mesh_shader"),
        source: ShaderSource::Wgsl(include_str!("../shaders/mesh.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("mesh_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("mesh_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[
                VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
                    step_mode: VertexStepMode::Vertex,
                    attributes: &vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                },
                VertexBufferLayout {
                    array_stride: std::mem::size_of::<InstanceData>() as BufferAddress,
                    step_mode: VertexStepMode::Instance,
                    attributes: &vertex_attr_array![
                        2 => Float32x4,
                        3 => Float32x4,
                        4 => Float32x4,
                        5 => Float32x4,
                        6 => Float32x4,
                    ],
                },
            ],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState { format, blend: Some(BlendState::REPLACE), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: Some(Face::Back),
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: sample_count, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// egui output already tessellated for this frame
pub struct UiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

impl UiFrame {
    pub fn from_output(ctx: &egui::Context, output: egui::FullOutput) -> Self {
        let primitives = ctx.tessellate(output.shapes, output.pixels_per_point);
        Self {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        }
    }
}

/// GPU side of the scene graph: one mesh per drawable node, one instance slot
/// per node.
pub struct SceneRenderer {
    pipeline: RenderPipeline,
    scene_buffer: Buffer,
    scene_bind_group: BindGroup,
    instance_buffer: Buffer,
    node_count: usize,
    meshes: Vec<Option<MeshBuffer>>,
    format: TextureFormat,
    sample_count: u32,
    targets: Targets,
    egui_renderer: egui_wgpu::Renderer,
}

impl SceneRenderer {
    pub fn new(
        device: &Device,
        format: TextureFormat,
        sample_count: u32,
        width: u32,
        height: u32,
        graph: &SceneGraph,
    ) -> Self {
        let scene_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("scene_uniform"),
            size: std::mem::size_of::<SceneUniform>() as BufferAddress,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("scene_bind_group_layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let scene_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &bind_group_layout,
            entries: &[BindGroupEntry { binding: 0, resource: scene_buffer.as_entire_binding() }],
        });

        let pipeline = create_mesh_pipeline(device, format, sample_count, &bind_group_layout);

        // Topology is fixed after start-up, so meshes and the instance slot
        // count are sized once.
        if graph.is_empty() {
            tracing::warn!("scene graph has no nodes, only the HUD will be drawn");
        }
        let meshes: Vec<Option<MeshBuffer>> = graph
            .iter()
            .map(|(_, node)| {
                let mesh = node.shape?.build();
                (!mesh.is_empty()).then(|| mesh.upload(device, node.name))
            })
            .collect();
        let node_count = graph.len();
        let instance_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some("instance_buffer"),
            contents: bytemuck::cast_slice(&InstanceData::from_scene(graph)),
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        });

        let targets = Targets::new(device, format, sample_count, width, height);

        // egui draws after the resolve, straight onto the single-sampled surface
        let egui_renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        tracing::info!(
            nodes = node_count,
            meshes = meshes.iter().flatten().count(),
            ?format,
            sample_count,
            "scene renderer ready"
        );

        Self {
            pipeline,
            scene_buffer,
            scene_bind_group,
            instance_buffer,
            node_count,
            meshes,
            format,
            sample_count,
            targets,
            egui_renderer,
        }
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        self.targets = Targets::new(device, self.format, self.sample_count, width, height);
    }

    /// Draw the scene, then the HUD on top. Surface errors go back to the
    /// caller, which decides whether to reconfigure or skip.
    pub fn draw_frame(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &Surface,
        size: [u32; 2],
        frame_data: &FrameData,
        ui: Option<UiFrame>,
    ) -> Result<(), SurfaceError> {
        let frame = surface.get_current_texture()?;

        queue.write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&frame_data.uniform));
        let instance_count = frame_data.instances.len().min(self.node_count);
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&frame_data.instances[..instance_count]));

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let (color_view, resolve_target) = self.targets.color(&view);
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if instance_count > 0 {
                rp.set_pipeline(&self.pipeline);
                rp.set_bind_group(0, &self.scene_bind_group, &[]);
                rp.set_vertex_buffer(1, self.instance_buffer.slice(..));
            }

            for (i, mesh) in self.meshes.iter().enumerate().take(instance_count) {
                let Some(mesh) = mesh else { continue };
                let slot = i as u32;
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, slot..slot + 1);
            }
        }

        if let Some(ui) = ui {
            self.draw_ui(device, queue, &mut encoder, &view, size, ui);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn draw_ui(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        view: &TextureView,
        size: [u32; 2],
        ui: UiFrame,
    ) {
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: size,
            pixels_per_point: ui.pixels_per_point,
        };

        for (id, image_delta) in &ui.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &ui.primitives, &screen_descriptor);

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &ui.primitives, &screen_descriptor);
        }

        for id in &ui.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
