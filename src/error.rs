//! Start-up errors. Nothing in the per-frame path can fail in a way we handle;
//! these cover the window, canvas and GPU bring-up.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no global `window`")]
    NoWindow,
    #[error("no document on window")]
    NoDocument,
    #[error("no body on document")]
    NoBody,
    #[error("canvas setup failed: {0}")]
    Canvas(String),
    #[error("DOM call failed: {0}")]
    Dom(String),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("surface reports no supported formats or alpha modes")]
    SurfaceUnsupported,
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[cfg(not(target_arch = "wasm32"))]
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[cfg(not(target_arch = "wasm32"))]
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for AppError {
    fn from(v: wasm_bindgen::JsValue) -> Self {
        AppError::Dom(format!("{v:?}"))
    }
}

#[cfg(target_arch = "wasm32")]
impl From<AppError> for wasm_bindgen::JsValue {
    fn from(e: AppError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
