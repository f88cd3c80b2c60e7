//! A software stand-in for a GL context.
//!
//! Nothing is rasterised. The context keeps enough bookkeeping to behave
//! like WebGL from the caller's point of view: shaders are "compiled" by
//! scanning their declarations, programs report active attributes and
//! uniforms (arrays as `name[0]`), uniform writes land on the bound program
//! only, and every draw call is recorded together with the uniform values
//! and attribute data it would have consumed.

use std::collections::{HashMap, HashSet};

use glam::{Mat3, Mat4, Vec3};

use crate::error::RendererError;
use crate::renderer::gl::{
    ActiveVariable, BlendFactor, Capability, ContextFactory, GlContext, GlType, Primitive,
    ShaderStage,
};
use crate::settings::ContextAttributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    program: usize,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
}

impl UniformData {
    pub fn floats(&self) -> Option<&[f32]> {
        match self {
            UniformData::Floats(v) => Some(v),
            UniformData::Ints(_) => None,
        }
    }

    pub fn ints(&self) -> Option<&[i32]> {
        match self {
            UniformData::Ints(v) => Some(v),
            UniformData::Floats(_) => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessStats {
    pub shaders_compiled: usize,
    pub programs_linked: usize,
    pub program_switches: usize,
    /// Calls GL would have rejected (writes to an unbound program, draws
    /// without a program).
    pub errors: usize,
}

/// A recorded draw call.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub primitive: Primitive,
    /// First vertex of an array draw; zero for indexed draws.
    pub first: usize,
    pub count: usize,
    pub uniforms: HashMap<String, UniformData>,
    /// Attribute name → (components, data).
    pub attributes: HashMap<String, (i32, Vec<f32>)>,
    pub indices: Option<Vec<u16>>,
    pub blend: bool,
    pub depth_write: bool,
    pub textures: HashMap<u32, TextureHandle>,
}

impl DrawCall {
    pub fn uniform_floats(&self, name: &str) -> Option<&[f32]> {
        self.uniforms.get(name).and_then(UniformData::floats)
    }

    pub fn uniform_ints(&self, name: &str) -> Option<&[i32]> {
        self.uniforms.get(name).and_then(UniformData::ints)
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        let data = self.uniform_floats(name)?;
        (data.len() == 16).then(|| Mat4::from_cols_slice(data))
    }

    pub fn mat3(&self, name: &str) -> Option<Mat3> {
        let data = self.uniform_floats(name)?;
        (data.len() == 9).then(|| Mat3::from_cols_slice(data))
    }

    /// Vertices of a three-component attribute, in buffer order.
    pub fn vec3_attribute(&self, name: &str) -> Option<Vec<Vec3>> {
        let (components, data) = self.attributes.get(name)?;
        (*components == 3).then(|| data.chunks_exact(3).map(Vec3::from_slice).collect())
    }
}

#[derive(Debug, Default, Clone)]
struct Declarations {
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
    varyings: Vec<String>,
}

#[derive(Debug)]
struct CompiledShader {
    stage: ShaderStage,
    declarations: Declarations,
}

#[derive(Debug)]
struct LinkedProgram {
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
    values: HashMap<String, UniformData>,
    deleted: bool,
}

#[derive(Debug)]
struct TextureData {
    width: u32,
    height: u32,
}

#[derive(Debug, Clone)]
enum BufferData {
    Empty,
    Vertices(Vec<f32>),
    Indices(Vec<u16>),
}

pub struct HeadlessContext {
    attributes: ContextAttributes,
    width: u32,
    height: u32,
    shaders: Vec<Option<CompiledShader>>,
    programs: Vec<LinkedProgram>,
    current_program: Option<usize>,
    capabilities: HashSet<Capability>,
    blend_func: (BlendFactor, BlendFactor),
    depth_mask: bool,
    viewport: [i32; 4],
    clear_bytes: [u8; 4],
    textures: Vec<Option<TextureData>>,
    bound_textures: HashMap<u32, usize>,
    buffers: Vec<Option<BufferData>>,
    attribute_pointers: HashMap<u32, (usize, i32)>,
    draws: Vec<DrawCall>,
    stats: HeadlessStats,
}

impl HeadlessContext {
    pub fn new(attributes: ContextAttributes, width: u32, height: u32) -> Self {
        Self {
            attributes,
            width,
            height,
            shaders: Vec::new(),
            programs: Vec::new(),
            current_program: None,
            capabilities: HashSet::new(),
            blend_func: (BlendFactor::One, BlendFactor::One),
            depth_mask: true,
            viewport: [0, 0, width as i32, height as i32],
            clear_bytes: [0, 0, 0, 0],
            textures: Vec::new(),
            bound_textures: HashMap::new(),
            buffers: Vec::new(),
            attribute_pointers: HashMap::new(),
            draws: Vec::new(),
            stats: HeadlessStats::default(),
        }
    }

    pub fn attributes(&self) -> &ContextAttributes {
        &self.attributes
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize_drawing_buffer(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program.map(ProgramHandle)
    }

    pub fn capability_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn blend_enabled(&self) -> bool {
        self.capability_enabled(Capability::Blend)
    }

    pub fn depth_write_enabled(&self) -> bool {
        self.depth_mask
    }

    pub fn blend_factors(&self) -> (BlendFactor, BlendFactor) {
        self.blend_func
    }

    pub fn viewport_rect(&self) -> [i32; 4] {
        self.viewport
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.bound_textures.get(&unit).copied().map(TextureHandle)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.iter().filter(|t| t.is_some()).count()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.iter().filter(|p| !p.deleted).count()
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures
            .get(texture.0)
            .and_then(Option::as_ref)
            .map(|t| (t.width, t.height))
    }

    /// Last value written to `name` on `program`.
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<&UniformData> {
        let bare = name.strip_suffix("[0]").unwrap_or(name);
        self.programs.get(program.0)?.values.get(bare)
    }

    fn write_uniform(&mut self, location: &UniformLocation, data: UniformData) {
        if self.current_program != Some(location.program) {
            self.stats.errors += 1;
            return;
        }
        if let Some(program) = self.programs.get_mut(location.program) {
            program.values.insert(location.name.clone(), data);
        }
    }

    fn record_draw(
        &mut self,
        primitive: Primitive,
        first: usize,
        count: usize,
        indices: Option<Vec<u16>>,
    ) {
        let Some(index) = self.current_program else {
            self.stats.errors += 1;
            return;
        };
        let program = &self.programs[index];

        let mut attributes = HashMap::new();
        for (location, (buffer, components)) in &self.attribute_pointers {
            let Some(attribute) = program.attributes.get(*location as usize) else {
                continue;
            };
            if let Some(Some(BufferData::Vertices(data))) = self.buffers.get(*buffer) {
                attributes.insert(attribute.name.clone(), (*components, data.clone()));
            }
        }

        let draw = DrawCall {
            program: ProgramHandle(index),
            primitive,
            first,
            count,
            uniforms: program.values.clone(),
            attributes,
            indices,
            blend: self.blend_enabled(),
            depth_write: self.depth_mask,
            textures: self
                .bound_textures
                .iter()
                .map(|(unit, tex)| (*unit, TextureHandle(*tex)))
                .collect(),
        };
        self.draws.push(draw);
    }
}

impl GlContext for HeadlessContext {
    type Shader = ShaderHandle;
    type Program = ProgramHandle;
    type UniformLocation = UniformLocation;
    type Texture = TextureHandle;
    type Buffer = BufferHandle;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        for (line_no, line) in source.lines().enumerate() {
            if let Some(message) = line.trim().strip_prefix("#error") {
                return Err(format!(
                    "ERROR: 0:{}: '#error' : {}",
                    line_no + 1,
                    message.trim()
                ));
            }
        }
        if !source.contains("void main") {
            return Err("ERROR: 0:0: '' : missing main function".to_string());
        }

        let declarations = parse_declarations(source);
        if stage == ShaderStage::Fragment && !declarations.attributes.is_empty() {
            return Err(
                "ERROR: 0:0: 'attribute' : supported in vertex shaders only".to_string(),
            );
        }

        self.stats.shaders_compiled += 1;
        self.shaders.push(Some(CompiledShader {
            stage,
            declarations,
        }));
        Ok(ShaderHandle(self.shaders.len() - 1))
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(slot) = self.shaders.get_mut(shader.0) {
            *slot = None;
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        let lookup = |handle: ShaderHandle| {
            self.shaders
                .get(handle.0)
                .and_then(Option::as_ref)
                .ok_or_else(|| format!("link error: shader {} is not compiled", handle.0))
        };
        let vs = lookup(vertex)?;
        let fs = lookup(fragment)?;
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("link error: expected one vertex and one fragment shader".to_string());
        }

        for varying in &fs.declarations.varyings {
            if !vs.declarations.varyings.contains(varying) {
                return Err(format!(
                    "link error: varying {} is not written by the vertex shader",
                    varying
                ));
            }
        }

        let mut uniforms = vs.declarations.uniforms.clone();
        for uniform in &fs.declarations.uniforms {
            match uniforms.iter().find(|u| u.name == uniform.name) {
                Some(existing) if existing.kind != uniform.kind || existing.size != uniform.size => {
                    return Err(format!(
                        "link error: uniform {} declared with different types",
                        uniform.name
                    ));
                }
                Some(_) => {}
                None => uniforms.push(uniform.clone()),
            }
        }

        let program = LinkedProgram {
            attributes: vs.declarations.attributes.clone(),
            uniforms,
            values: HashMap::new(),
            deleted: false,
        };
        self.stats.programs_linked += 1;
        self.programs.push(program);
        Ok(ProgramHandle(self.programs.len() - 1))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(p) = self.programs.get_mut(program.0) {
            p.deleted = true;
        }
        if self.current_program == Some(program.0) {
            self.current_program = None;
        }
    }

    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.programs
            .get(program.0)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.programs
            .get(program.0)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let p = self.programs.get(program.0)?;
        p.attributes
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(program.0)?;
        let bare = name.strip_suffix("[0]").unwrap_or(name);
        p.uniforms
            .iter()
            .any(|u| u.name.strip_suffix("[0]").unwrap_or(&u.name) == bare)
            .then(|| UniformLocation {
                program: program.0,
                name: bare.to_string(),
            })
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let index = program
            .map(|p| p.0)
            .filter(|i| self.programs.get(*i).is_some_and(|p| !p.deleted));
        self.stats.program_switches += 1;
        self.current_program = index;
    }

    fn uniform_f32_slice(&mut self, location: &UniformLocation, _components: usize, data: &[f32]) {
        self.write_uniform(location, UniformData::Floats(data.to_vec()));
    }

    fn uniform_matrix_f32_slice(&mut self, location: &UniformLocation, _dim: usize, data: &[f32]) {
        self.write_uniform(location, UniformData::Floats(data.to_vec()));
    }

    fn uniform_i32_slice(&mut self, location: &UniformLocation, data: &[i32]) {
        self.write_uniform(location, UniformData::Ints(data.to_vec()));
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.capabilities.insert(capability);
        } else {
            self.capabilities.remove(&capability);
        }
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.blend_func = (src, dst);
    }

    fn depth_mask(&mut self, enabled: bool) {
        self.depth_mask = enabled;
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.viewport = [x, y, width, height];
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_bytes = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<TextureHandle, String> {
        if width == 0 || height == 0 {
            return Err("texture dimensions must be non-zero".to_string());
        }
        if rgba.len() != (width * height * 4) as usize {
            return Err(format!(
                "expected {} bytes of RGBA data, got {}",
                width * height * 4,
                rgba.len()
            ));
        }
        self.textures.push(Some(TextureData { width, height }));
        Ok(TextureHandle(self.textures.len() - 1))
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(slot) = self.textures.get_mut(texture.0) {
            *slot = None;
        }
        self.bound_textures.retain(|_, t| *t != texture.0);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        match texture {
            Some(t) => {
                self.bound_textures.insert(unit, t.0);
            }
            None => {
                self.bound_textures.remove(&unit);
            }
        }
    }

    fn create_buffer(&mut self) -> Result<BufferHandle, String> {
        self.buffers.push(Some(BufferData::Empty));
        Ok(BufferHandle(self.buffers.len() - 1))
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(slot) = self.buffers.get_mut(buffer.0) {
            *slot = None;
        }
        self.attribute_pointers.retain(|_, (b, _)| *b != buffer.0);
    }

    fn upload_vertices(&mut self, buffer: BufferHandle, data: &[f32]) {
        if let Some(slot) = self.buffers.get_mut(buffer.0) {
            *slot = Some(BufferData::Vertices(data.to_vec()));
        }
    }

    fn upload_indices(&mut self, buffer: BufferHandle, data: &[u16]) {
        if let Some(slot) = self.buffers.get_mut(buffer.0) {
            *slot = Some(BufferData::Indices(data.to_vec()));
        }
    }

    fn vertex_attribute(&mut self, location: u32, buffer: BufferHandle, components: i32) {
        self.attribute_pointers
            .insert(location, (buffer.0, components));
    }

    fn draw_elements(&mut self, primitive: Primitive, indices: BufferHandle, count: i32) {
        let count = count.max(0) as usize;
        let data = match self.buffers.get(indices.0) {
            Some(Some(BufferData::Indices(data))) => data.iter().take(count).copied().collect(),
            _ => {
                self.stats.errors += 1;
                return;
            }
        };
        self.record_draw(primitive, 0, count, Some(data));
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: i32, count: i32) {
        self.record_draw(primitive, first.max(0) as usize, count.max(0) as usize, None);
    }

    fn read_pixels(&mut self, x: i32, y: i32, width: i32, height: i32) -> Vec<u8> {
        let (width, height) = (width.max(0) as usize, height.max(0) as usize);
        let mut out = Vec::with_capacity(width * height * 4);
        for row in 0..height as i64 {
            for col in 0..width as i64 {
                let (gx, gy) = (i64::from(x) + col, i64::from(y) + row);
                let inside = gx >= 0
                    && gy >= 0
                    && gx < i64::from(self.width)
                    && gy < i64::from(self.height);
                out.extend_from_slice(&if inside { self.clear_bytes } else { [0; 4] });
            }
        }
        out
    }
}

/// Scans `uniform`, `attribute` and `varying` declarations, one per line.
fn parse_declarations(source: &str) -> Declarations {
    let mut declarations = Declarations::default();

    for line in source.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        let Some(statement) = line.strip_suffix(';') else {
            continue;
        };
        let mut tokens = statement.split_whitespace();
        let Some(qualifier) = tokens.next() else {
            continue;
        };
        if !matches!(qualifier, "uniform" | "attribute" | "varying") {
            continue;
        }
        let mut ty = tokens.next().unwrap_or("");
        if matches!(ty, "lowp" | "mediump" | "highp") {
            ty = tokens.next().unwrap_or("");
        }
        let Some(declarator) = tokens.next() else {
            continue;
        };

        let (name, size) = match declarator.split_once('[') {
            Some((name, rest)) => (name, rest.trim_end_matches(']').parse::<i32>().unwrap_or(1)),
            None => (declarator, 1),
        };

        match qualifier {
            "varying" => declarations.varyings.push(name.to_string()),
            "attribute" => declarations.attributes.push(ActiveVariable {
                name: name.to_string(),
                kind: glsl_type(ty),
                size,
            }),
            _ => declarations.uniforms.push(ActiveVariable {
                name: if declarator.contains('[') {
                    format!("{}[0]", name)
                } else {
                    name.to_string()
                },
                kind: glsl_type(ty),
                size,
            }),
        }
    }

    declarations
}

fn glsl_type(ty: &str) -> GlType {
    match ty {
        "float" => GlType::Float,
        "vec2" => GlType::FloatVec2,
        "vec3" => GlType::FloatVec3,
        "vec4" => GlType::FloatVec4,
        "mat3" => GlType::FloatMat3,
        "mat4" => GlType::FloatMat4,
        "int" => GlType::Int,
        "bool" => GlType::Bool,
        "sampler2D" => GlType::Sampler2D,
        _ => GlType::Other(0),
    }
}

/// Factory for [`HeadlessContext`]s; counts how many contexts it created.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    contexts_created: usize,
    fail_next: Option<String>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contexts_created(&self) -> usize {
        self.contexts_created
    }

    /// Makes the next `create` call fail with `reason`.
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }
}

impl ContextFactory for HeadlessFactory {
    type Context = HeadlessContext;

    fn create(
        &mut self,
        attributes: &ContextAttributes,
        width: u32,
        height: u32,
    ) -> Result<HeadlessContext, RendererError> {
        if let Some(reason) = self.fail_next.take() {
            return Err(RendererError::ContextCreation(reason));
        }
        self.contexts_created += 1;
        Ok(HeadlessContext::new(*attributes, width, height))
    }

    fn resize(&mut self, context: &mut HeadlessContext, width: u32, height: u32) {
        context.resize_drawing_buffer(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "
attribute vec3 aPosition;
uniform mat4 uModelViewMatrix;
uniform vec3 uLights[8];
varying vec3 vColor;
void main() {}
";
    const FS: &str = "
precision mediump float;
uniform vec4 uMaterialColor;
uniform sampler2D uSampler;
varying vec3 vColor;
void main() {}
";

    fn linked() -> (HeadlessContext, ProgramHandle) {
        let mut gl = HeadlessContext::new(ContextAttributes::default(), 10, 10);
        let vs = gl.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = gl.compile_shader(ShaderStage::Fragment, FS).unwrap();
        let program = gl.link_program(vs, fs).unwrap();
        (gl, program)
    }

    #[test]
    fn introspection_reports_arrays_with_index_suffix() {
        let (gl, program) = linked();
        let uniforms = gl.active_uniforms(program);
        let lights = uniforms.iter().find(|u| u.name == "uLights[0]").unwrap();
        assert_eq!(lights.size, 8);
        assert_eq!(lights.kind, GlType::FloatVec3);
        assert!(uniforms.iter().any(|u| u.kind == GlType::Sampler2D));
        assert_eq!(gl.attribute_location(program, "aPosition"), Some(0));
    }

    #[test]
    fn error_directive_fails_compilation() {
        let mut gl = HeadlessContext::new(ContextAttributes::default(), 1, 1);
        let log = gl
            .compile_shader(ShaderStage::Fragment, "void main() {}\n#error broken")
            .unwrap_err();
        assert!(log.contains("broken"));
        assert_eq!(gl.stats().shaders_compiled, 0);
    }

    #[test]
    fn unmatched_varying_fails_link() {
        let mut gl = HeadlessContext::new(ContextAttributes::default(), 1, 1);
        let vs = gl.compile_shader(ShaderStage::Vertex, "void main() {}").unwrap();
        let fs = gl
            .compile_shader(ShaderStage::Fragment, "varying vec2 vUv;\nvoid main() {}")
            .unwrap();
        assert!(gl.link_program(vs, fs).unwrap_err().contains("vUv"));
    }

    #[test]
    fn uniform_writes_need_bound_program() {
        let (mut gl, program) = linked();
        let loc = gl.uniform_location(program, "uMaterialColor").unwrap();
        gl.uniform_f32_slice(&loc, 4, &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(gl.stats().errors, 1);
        assert!(gl.uniform_value(program, "uMaterialColor").is_none());

        gl.use_program(Some(program));
        gl.uniform_f32_slice(&loc, 4, &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            gl.uniform_value(program, "uMaterialColor"),
            Some(&UniformData::Floats(vec![1.0, 0.0, 0.0, 1.0]))
        );
    }

    #[test]
    fn read_pixels_returns_clear_color_inside_canvas() {
        let mut gl = HeadlessContext::new(ContextAttributes::default(), 2, 2);
        gl.clear([1.0, 0.0, 0.0, 1.0]);
        let px = gl.read_pixels(1, 1, 2, 1);
        assert_eq!(px, vec![255, 0, 0, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn read_pixels_near_coordinate_limits() {
        let mut gl = HeadlessContext::new(ContextAttributes::default(), 2, 2);
        assert_eq!(gl.read_pixels(i32::MAX, i32::MAX, 2, 1), vec![0; 8]);
        assert!(gl.read_pixels(0, 0, -5, 3).is_empty());
    }

    #[test]
    fn array_draws_record_first_vertex() {
        let (mut gl, program) = linked();
        gl.use_program(Some(program));
        gl.draw_arrays(Primitive::Points, 4, 2);
        assert_eq!(gl.draws()[0].first, 4);
        assert_eq!(gl.draws()[0].count, 2);
    }

    #[test]
    fn factory_can_fail_once() {
        let mut factory = HeadlessFactory::new();
        factory.fail_next("lost");
        assert!(factory.create(&ContextAttributes::default(), 1, 1).is_err());
        assert!(factory.create(&ContextAttributes::default(), 1, 1).is_ok());
        assert_eq!(factory.contexts_created(), 1);
    }
}
