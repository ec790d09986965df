use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

// Import from the library crate
use skydrone::{
    error::AppError,
    logging,
    controller::{input::native::key_event_to_input, FrameLoopContext, InputEvent, SimConfig, Simulation},
    view::{render::UiFrame, GpuContext, SceneRenderer},
};

/// Everything that only exists once the window is up
struct Graphics {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: SceneRenderer,
    egui_state: egui_winit::State,
    frame_ctx: FrameLoopContext,
}

impl Graphics {
    fn new(event_loop: &ActiveEventLoop) -> Result<Self, AppError> {
        let window_attributes = Window::default_attributes()
            .with_title("skydrone")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let gpu = pollster::block_on(GpuContext::new_native(window.clone()))?;

        let sim = Simulation::new(SimConfig::default(), gpu.width(), gpu.height());
        let renderer = SceneRenderer::new(
            &gpu.device,
            gpu.format,
            gpu.sample_count,
            gpu.width(),
            gpu.height(),
            &sim.scene.graph,
        );
        let frame_ctx = FrameLoopContext::new(sim);

        let egui_state = egui_winit::State::new(
            frame_ctx.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(Self { window, gpu, renderer, egui_state, frame_ctx })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gpu.resize(new_size.width, new_size.height);
            self.renderer.resize(&self.gpu.device, new_size.width, new_size.height);
            self.frame_ctx.resize(new_size.width, new_size.height);
        }
    }

    /// One tick plus one drawn frame. Returns false when the app should exit.
    fn redraw(&mut self, now: f64) -> bool {
        let frame = self.frame_ctx.update(now);

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let output = self.frame_ctx.build_ui(raw_input);
        self.egui_state
            .handle_platform_output(&self.window, output.platform_output.clone());
        let ui = UiFrame::from_output(&self.frame_ctx.egui_ctx, output);

        let size = [self.gpu.width(), self.gpu.height()];
        match self.renderer.draw_frame(&self.gpu.device, &self.gpu.queue, &self.gpu.surface, size, &frame, Some(ui)) {
            Ok(()) => true,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost, reconfiguring");
                self.resize(self.window.inner_size());
                true
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory");
                false
            }
            Err(e) => {
                tracing::warn!("skipping frame: {e:?}");
                true
            }
        }
    }
}

#[derive(Default)]
struct App {
    graphics: Option<Graphics>,
    start: Option<Instant>,
    error: Option<AppError>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match Graphics::new(event_loop) {
            Ok(graphics) => {
                tracing::info!("skydrone running");
                self.start = Some(Instant::now());
                self.graphics = Some(graphics);
            }
            Err(e) => {
                tracing::error!("start-up failed: {e}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(gfx) = self.graphics.as_mut() else { return };

        // The HUD is display-only, so egui never swallows drone keys
        let _ = gfx.egui_state.on_window_event(&gfx.window, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(physical_size) => gfx.resize(physical_size),
            WindowEvent::Focused(false) => gfx.frame_ctx.sim.handle_event(&InputEvent::FocusLost),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.logical_key == Key::Named(NamedKey::Escape) {
                    event_loop.exit();
                    return;
                }
                if let Some(input) = key_event_to_input(&event) {
                    gfx.frame_ctx.sim.handle_event(&input);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = self.start.map_or(0.0, |s| s.elapsed().as_secs_f64());
                if !gfx.redraw(now) {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gfx) = &self.graphics {
            gfx.window.request_redraw();
        }
    }
}

fn run() -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::default();
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
