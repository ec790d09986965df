// Re-export all public modules so they can be used from main.rs
pub mod error;
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use std::{cell::RefCell, rc::Rc};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::{input::wasm::keyboard_event_to_input, FrameLoopContext, InputEvent, SimConfig, Simulation};
#[cfg(target_arch = "wasm32")]
use error::AppError;
#[cfg(target_arch = "wasm32")]
use view::{render::UiFrame, GpuContext, SceneRenderer};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(window, document, canvas).await?;
    Ok(())
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(window: Window, document: Document, canvas: HtmlCanvasElement) -> error::Result<()> {
    let (width, height) = (canvas.width(), canvas.height());
    let mut gpu = GpuContext::new(&canvas, width, height).await?;

    let sim = Simulation::new(SimConfig::default(), gpu.width(), gpu.height());
    let mut renderer = SceneRenderer::new(
        gpu.device.as_ref(),
        gpu.format,
        gpu.sample_count,
        gpu.width(),
        gpu.height(),
        &sim.scene.graph,
    );
    let frame_ctx = Rc::new(RefCell::new(FrameLoopContext::new(sim)));

    setup_input_listeners(&document, &window, frame_ctx.clone())?;

    let window_for_loop = window.clone();
    RafLoop::new(window, move || {
        let now = window_for_loop.performance().map(|p| p.now()).unwrap_or(0.0) / 1000.0;
        let mut ctx = frame_ctx.borrow_mut();

        handle_resize(&window_for_loop, &canvas, &mut gpu, &mut renderer, &mut ctx);

        let frame = ctx.update(now);

        let mut raw_input = egui::RawInput::default();
        raw_input.time = Some(now);
        raw_input.screen_rect = Some(egui::Rect::from_min_size(
            egui::Pos2::ZERO,
            egui::vec2(gpu.width() as f32, gpu.height() as f32),
        ));
        let output = ctx.build_ui(raw_input);
        let ui = UiFrame::from_output(&ctx.egui_ctx, output);

        let size = [gpu.width(), gpu.height()];
        match renderer.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, size, &frame, Some(ui)) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost, reconfiguring");
                gpu.resize(size[0], size[1]);
            }
            Err(e) => tracing::warn!("skipping frame: {e:?}"),
        }
    })
    .start();

    tracing::info!(width, height, "skydrone running");
    Ok(())
}

/// Keep canvas, surface, depth buffer and camera aspect in step with the window
#[cfg(target_arch = "wasm32")]
fn handle_resize(
    window: &Window,
    canvas: &HtmlCanvasElement,
    gpu: &mut GpuContext,
    renderer: &mut SceneRenderer,
    ctx: &mut FrameLoopContext,
) {
    let (nw, nh) = window_size(window);
    if nw == gpu.width() && nh == gpu.height() {
        return;
    }
    canvas.set_width(nw);
    canvas.set_height(nh);
    gpu.resize(nw, nh);
    renderer.resize(gpu.device.as_ref(), gpu.width(), gpu.height());
    ctx.resize(gpu.width(), gpu.height());
    tracing::debug!(width = nw, height = nh, "resized");
}

/// Setup keyboard and focus listeners
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    frame_ctx: Rc<RefCell<FrameLoopContext>>,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let frame_ctx = frame_ctx.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let mut ctx = frame_ctx.borrow_mut();
            // Space would scroll the page
            if ctx.sim.bindings.is_bound(&e.key()) {
                e.prevent_default();
            }
            ctx.sim.handle_event(&keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let frame_ctx = frame_ctx.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            frame_ctx.borrow_mut().sim.handle_event(&keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss - clear all keys
    {
        let frame_ctx = frame_ctx.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            frame_ctx.borrow_mut().sim.handle_event(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change - clear all keys
    {
        let doc = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            let visible = !doc.hidden();
            frame_ctx.borrow_mut().sim.handle_event(&InputEvent::VisibilityChanged { visible });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let dim = |v: Result<JsValue, JsValue>, fallback: f64| {
        v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback).max(1.0) as u32
    };
    (dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0))
}

/// Full-window canvas appended to the document body
#[cfg(target_arch = "wasm32")]
fn init_canvas() -> error::Result<(Window, Document, HtmlCanvasElement)> {
    let window = web_sys::window().ok_or(AppError::NoWindow)?;
    let document = window.document().ok_or(AppError::NoDocument)?;
    let body = document.body().ok_or(AppError::NoBody)?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| AppError::Canvas("created element is not a canvas".into()))?;
    let (width, height) = window_size(&window);
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

/// Runs a callback once per display repaint, forever
#[cfg(target_arch = "wasm32")]
struct RafLoop {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RafLoop {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn request_frame(window: &Window, callback: &Closure<dyn FnMut()>) -> bool {
        match window.request_animation_frame(callback.as_ref().unchecked_ref::<js_sys::Function>()) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("requestAnimationFrame failed, stopping render loop: {e:?}");
                false
            }
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            // Schedule the next repaint before doing this frame's work
            let scheduled = callback_clone
                .borrow()
                .as_ref()
                .is_some_and(|cb| Self::request_frame(&window, cb));
            if !scheduled {
                return;
            }
            inner.borrow_mut().as_mut()();
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            Self::request_frame(&self.window, cb);
        }

        // The closure re-arms itself and lives for the rest of the page
        std::mem::forget(callback);
    }
}
