//! [`GlContext`] over `glow`, for WebGL2 in the browser and GLES/GL 3.3
//! natively.

use glow::{HasContext, PixelPackData, PixelUnpackData};

use crate::error::RendererError;
use crate::renderer::gl::{
    ActiveVariable, BlendFactor, Capability, ContextFactory, GlContext, GlType, Primitive,
    ShaderStage,
};
use crate::settings::ContextAttributes;

pub struct GlowContext {
    gl: glow::Context,
    vao: glow::VertexArray,
    attributes: ContextAttributes,
}

impl GlowContext {
    /// Takes ownership of `gl` and binds the single vertex array object all
    /// attribute pointers are recorded in.
    pub fn new(gl: glow::Context, attributes: ContextAttributes) -> Result<Self, RendererError> {
        let vao = unsafe {
            let vao = gl
                .create_vertex_array()
                .map_err(RendererError::ContextCreation)?;
            gl.bind_vertex_array(Some(vao));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            vao
        };
        Ok(Self {
            gl,
            vao,
            attributes,
        })
    }

    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }

    pub fn attributes(&self) -> &ContextAttributes {
        &self.attributes
    }
}

impl Drop for GlowContext {
    fn drop(&mut self) {
        unsafe { self.gl.delete_vertex_array(self.vao) };
    }
}

fn gl_type(raw: u32) -> GlType {
    match raw {
        glow::FLOAT => GlType::Float,
        glow::FLOAT_VEC2 => GlType::FloatVec2,
        glow::FLOAT_VEC3 => GlType::FloatVec3,
        glow::FLOAT_VEC4 => GlType::FloatVec4,
        glow::FLOAT_MAT3 => GlType::FloatMat3,
        glow::FLOAT_MAT4 => GlType::FloatMat4,
        glow::INT => GlType::Int,
        glow::BOOL => GlType::Bool,
        glow::SAMPLER_2D => GlType::Sampler2D,
        other => GlType::Other(other),
    }
}

fn capability(capability: Capability) -> u32 {
    match capability {
        Capability::Blend => glow::BLEND,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
    }
}

fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
    }
}

fn primitive(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Points => glow::POINTS,
        Primitive::Lines => glow::LINES,
        Primitive::LineStrip => glow::LINE_STRIP,
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
        Primitive::TriangleFan => glow::TRIANGLE_FAN,
    }
}

impl GlContext for GlowContext {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type UniformLocation = glow::UniformLocation;
    type Texture = glow::Texture;
    type Buffer = glow::Buffer;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<glow::Shader, String> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(kind)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(shader)
        }
    }

    fn delete_shader(&mut self, shader: glow::Shader) {
        unsafe { self.gl.delete_shader(shader) };
    }

    fn link_program(
        &mut self,
        vertex: glow::Shader,
        fragment: glow::Shader,
    ) -> Result<glow::Program, String> {
        unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vertex);
            self.gl.detach_shader(program, fragment);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(log);
            }
            Ok(program)
        }
    }

    fn delete_program(&mut self, program: glow::Program) {
        unsafe { self.gl.delete_program(program) };
    }

    fn active_attributes(&self, program: glow::Program) -> Vec<ActiveVariable> {
        unsafe {
            (0..self.gl.get_active_attributes(program))
                .filter_map(|i| self.gl.get_active_attribute(program, i))
                .map(|a| ActiveVariable {
                    name: a.name,
                    kind: gl_type(a.atype),
                    size: a.size,
                })
                .collect()
        }
    }

    fn active_uniforms(&self, program: glow::Program) -> Vec<ActiveVariable> {
        unsafe {
            (0..self.gl.get_active_uniforms(program))
                .filter_map(|i| self.gl.get_active_uniform(program, i))
                .map(|u| ActiveVariable {
                    name: u.name,
                    kind: gl_type(u.utype),
                    size: u.size,
                })
                .collect()
        }
    }

    fn attribute_location(&self, program: glow::Program, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn uniform_location(&self, program: glow::Program, name: &str) -> Option<glow::UniformLocation> {
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn use_program(&mut self, program: Option<glow::Program>) {
        unsafe { self.gl.use_program(program) };
    }

    fn uniform_f32_slice(&mut self, location: &glow::UniformLocation, components: usize, data: &[f32]) {
        let location = Some(location);
        unsafe {
            match components {
                1 => self.gl.uniform_1_f32_slice(location, data),
                2 => self.gl.uniform_2_f32_slice(location, data),
                3 => self.gl.uniform_3_f32_slice(location, data),
                _ => self.gl.uniform_4_f32_slice(location, data),
            }
        }
    }

    fn uniform_matrix_f32_slice(&mut self, location: &glow::UniformLocation, dim: usize, data: &[f32]) {
        let location = Some(location);
        unsafe {
            if dim == 3 {
                self.gl.uniform_matrix_3_f32_slice(location, false, data);
            } else {
                self.gl.uniform_matrix_4_f32_slice(location, false, data);
            }
        }
    }

    fn uniform_i32_slice(&mut self, location: &glow::UniformLocation, data: &[i32]) {
        unsafe { self.gl.uniform_1_i32_slice(Some(location), data) };
    }

    fn set_capability(&mut self, cap: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability(cap));
            } else {
                self.gl.disable(capability(cap));
            }
        }
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(blend_factor(src), blend_factor(dst)) };
    }

    fn depth_mask(&mut self, enabled: bool) {
        unsafe { self.gl.depth_mask(enabled) };
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    fn clear(&mut self, [r, g, b, a]: [f32; 4]) {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<glow::Texture, String> {
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(format!(
                "expected {} bytes of RGBA data, got {}",
                width as usize * height as usize * 4,
                rgba.len()
            ));
        }
        unsafe {
            let texture = self.gl.create_texture()?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(Some(rgba)),
            );
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(texture)
        }
    }

    fn delete_texture(&mut self, texture: glow::Texture) {
        unsafe { self.gl.delete_texture(texture) };
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<glow::Texture>) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn create_buffer(&mut self) -> Result<glow::Buffer, String> {
        unsafe { self.gl.create_buffer() }
    }

    fn delete_buffer(&mut self, buffer: glow::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) };
    }

    fn upload_vertices(&mut self, buffer: glow::Buffer, data: &[f32]) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::DYNAMIC_DRAW,
            );
        }
    }

    fn upload_indices(&mut self, buffer: glow::Buffer, data: &[u16]) {
        unsafe {
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
        }
    }

    fn vertex_attribute(&mut self, location: u32, buffer: glow::Buffer, components: i32) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.enable_vertex_attrib_array(location);
            self.gl
                .vertex_attrib_pointer_f32(location, components, glow::FLOAT, false, 0, 0);
        }
    }

    fn draw_elements(&mut self, mode: Primitive, indices: glow::Buffer, count: i32) {
        unsafe {
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(indices));
            self.gl
                .draw_elements(primitive(mode), count, glow::UNSIGNED_SHORT, 0);
        }
    }

    fn draw_arrays(&mut self, mode: Primitive, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(primitive(mode), first, count) };
    }

    fn read_pixels(&mut self, x: i32, y: i32, width: i32, height: i32) -> Vec<u8> {
        let mut pixels = vec![0u8; width.max(0) as usize * height.max(0) as usize * 4];
        if pixels.is_empty() {
            return pixels;
        }
        unsafe {
            self.gl.read_pixels(
                x,
                y,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelPackData::Slice(Some(&mut pixels)),
            );
        }
        pixels
    }
}

type CreateFn = dyn FnMut(&ContextAttributes, u32, u32) -> Result<glow::Context, String>;
type ResizeFn = dyn FnMut(u32, u32);

/// Builds [`GlowContext`]s from a caller-supplied constructor, so the same
/// renderer runs on a browser canvas or any native GL loader.
pub struct GlowFactory {
    create: Box<CreateFn>,
    resize: Option<Box<ResizeFn>>,
}

impl GlowFactory {
    pub fn new(
        create: impl FnMut(&ContextAttributes, u32, u32) -> Result<glow::Context, String> + 'static,
    ) -> Self {
        Self {
            create: Box::new(create),
            resize: None,
        }
    }

    /// Called with the new size whenever the renderer is resized.
    pub fn with_resize(mut self, resize: impl FnMut(u32, u32) + 'static) -> Self {
        self.resize = Some(Box::new(resize));
        self
    }
}

impl ContextFactory for GlowFactory {
    type Context = GlowContext;

    fn create(
        &mut self,
        attributes: &ContextAttributes,
        width: u32,
        height: u32,
    ) -> Result<GlowContext, RendererError> {
        let gl = (self.create)(attributes, width, height).map_err(RendererError::ContextCreation)?;
        GlowContext::new(gl, *attributes)
    }

    fn resize(&mut self, _context: &mut GlowContext, width: u32, height: u32) {
        if let Some(resize) = self.resize.as_mut() {
            resize(width, height);
        }
    }
}
