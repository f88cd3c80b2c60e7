pub mod asset;
pub mod color;
pub mod error;
pub mod math;
pub mod renderer;
pub mod settings;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use color::{Color, ColorArg};
pub use error::RendererError;
pub use renderer::{GlowFactory, HeadlessFactory, Renderer};
pub use settings::{ContextAttribute, ContextAttributes};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    // Set panic hook to get better error messages
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    let _ = console_log::init_with_level(log::Level::Info);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    init_logging();
    log::info!("sketch-gl loaded");
}
