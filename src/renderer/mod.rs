pub mod camera;
pub mod geometry;
pub mod gl;
pub mod glow_backend;
pub mod headless;
pub mod immediate;
pub mod lights;
pub mod material;
#[allow(clippy::module_inception)]
pub mod renderer;
pub mod shader;
pub mod texture;

pub use camera::{Camera, CameraMode, Projection};
pub use geometry::Geometry;
pub use gl::{ContextFactory, GlContext, Primitive};
pub use glow_backend::{GlowContext, GlowFactory};
pub use headless::{HeadlessContext, HeadlessFactory};
pub use lights::{LightCounts, LightKind, LightVector};
pub use material::{DrawMode, TextureHandle};
pub use renderer::Renderer;
pub use shader::{BuiltinShaders, ProgramKey, ShaderId, ShaderSource, UniformValue};
pub use texture::Texture;
