//! The narrow slice of GL the renderer talks to.
//!
//! Implemented by [`GlowContext`](super::glow_backend::GlowContext) for real
//! WebGL2 / GLES contexts and by [`HeadlessContext`](super::headless::HeadlessContext)
//! for tests. Every call is synchronous and takes effect in call order.

use std::fmt::Debug;

use crate::error::RendererError;
use crate::settings::ContextAttributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// GPU type of an active attribute or uniform, as reported by introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlType {
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    FloatMat3,
    FloatMat4,
    Int,
    Bool,
    Sampler2D,
    Other(u32),
}

impl GlType {
    /// Float/int components per element, or `None` for matrices and samplers.
    pub fn components(&self) -> Option<usize> {
        match self {
            GlType::Float | GlType::Int | GlType::Bool => Some(1),
            GlType::FloatVec2 => Some(2),
            GlType::FloatVec3 => Some(3),
            GlType::FloatVec4 => Some(4),
            _ => None,
        }
    }
}

/// One entry of `getActiveAttrib` / `getActiveUniform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    pub name: String,
    pub kind: GlType,
    pub size: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    DepthTest,
    CullFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

pub trait GlContext {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type UniformLocation: Clone + Debug;
    type Texture: Copy + Debug;
    type Buffer: Copy + Debug;

    /// Compiles one stage. `Err` carries the compiler log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;
    fn delete_shader(&mut self, shader: Self::Shader);
    /// Links two compiled stages. `Err` carries the linker log.
    fn link_program(
        &mut self,
        vertex: Self::Shader,
        fragment: Self::Shader,
    ) -> Result<Self::Program, String>;
    fn delete_program(&mut self, program: Self::Program);

    fn active_attributes(&self, program: Self::Program) -> Vec<ActiveVariable>;
    fn active_uniforms(&self, program: Self::Program) -> Vec<ActiveVariable>;
    fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;

    fn use_program(&mut self, program: Option<Self::Program>);

    /// Writes `data` as `components`-wide float vectors (1 to 4).
    fn uniform_f32_slice(&mut self, location: &Self::UniformLocation, components: usize, data: &[f32]);
    /// Writes `data` as column-major `dim`x`dim` matrices (3 or 4).
    fn uniform_matrix_f32_slice(&mut self, location: &Self::UniformLocation, dim: usize, data: &[f32]);
    fn uniform_i32_slice(&mut self, location: &Self::UniformLocation, data: &[i32]);

    fn set_capability(&mut self, capability: Capability, enabled: bool);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn depth_mask(&mut self, enabled: bool);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear(&mut self, color: [f32; 4]);

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<Self::Texture, String>;
    fn delete_texture(&mut self, texture: Self::Texture);
    fn bind_texture(&mut self, unit: u32, texture: Option<Self::Texture>);

    fn create_buffer(&mut self) -> Result<Self::Buffer, String>;
    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn upload_vertices(&mut self, buffer: Self::Buffer, data: &[f32]);
    fn upload_indices(&mut self, buffer: Self::Buffer, data: &[u16]);
    /// Points `location` at `buffer`, tightly packed floats.
    fn vertex_attribute(&mut self, location: u32, buffer: Self::Buffer, components: i32);
    fn draw_elements(&mut self, primitive: Primitive, indices: Self::Buffer, count: i32);
    fn draw_arrays(&mut self, primitive: Primitive, first: i32, count: i32);

    /// RGBA8 rows, bottom row first.
    fn read_pixels(&mut self, x: i32, y: i32, width: i32, height: i32) -> Vec<u8>;
}

/// Creates (and re-creates) the context a renderer draws with.
pub trait ContextFactory {
    type Context: GlContext;

    fn create(
        &mut self,
        attributes: &ContextAttributes,
        width: u32,
        height: u32,
    ) -> Result<Self::Context, RendererError>;

    /// Resizes the drawing buffer backing `context`.
    fn resize(&mut self, _context: &mut Self::Context, _width: u32, _height: u32) {}
}
