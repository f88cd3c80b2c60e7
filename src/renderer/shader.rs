//! Shader program cache and typed uniform writes.
//!
//! Programs are keyed by their (vertex, fragment) source ids, compiled and
//! introspected once, and live until the context goes away.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use glam::{Mat3, Mat4};
use log::{debug, trace};

use crate::error::RendererError;
use crate::renderer::gl::{GlContext, GlType, ShaderStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderId {
    NormalVert,
    LightVert,
    ImmediateVert,
    NormalFrag,
    BasicFrag,
    LightTextureFrag,
    VertexColorFrag,
}

/// Supplies GLSL source text by id.
pub trait ShaderSource {
    fn source(&self, id: ShaderId) -> Option<Cow<'_, str>>;
}

/// The GLSL shipped with the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinShaders;

impl ShaderSource for BuiltinShaders {
    fn source(&self, id: ShaderId) -> Option<Cow<'_, str>> {
        let text = match id {
            ShaderId::NormalVert => include_str!("../shader/normal.vert.glsl"),
            ShaderId::LightVert => include_str!("../shader/light.vert.glsl"),
            ShaderId::ImmediateVert => include_str!("../shader/immediate.vert.glsl"),
            ShaderId::NormalFrag => include_str!("../shader/normal.frag.glsl"),
            ShaderId::BasicFrag => include_str!("../shader/basic.frag.glsl"),
            ShaderId::LightTextureFrag => include_str!("../shader/light_texture.frag.glsl"),
            ShaderId::VertexColorFrag => include_str!("../shader/vertex_color.frag.glsl"),
        };
        Some(Cow::Borrowed(text))
    }
}

/// Per-id overrides, falling back to nothing for ids not in the map.
impl ShaderSource for HashMap<ShaderId, String> {
    fn source(&self, id: ShaderId) -> Option<Cow<'_, str>> {
        self.get(&id).map(|s| Cow::Borrowed(s.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub vertex: ShaderId,
    pub fragment: ShaderId,
}

impl ProgramKey {
    /// Unlit programs, flat color.
    pub const BASIC: Self = Self::new(ShaderId::NormalVert, ShaderId::BasicFrag);
    /// Normals visualised as color.
    pub const NORMAL: Self = Self::new(ShaderId::NormalVert, ShaderId::NormalFrag);
    /// Lights, materials and textures.
    pub const LIGHT: Self = Self::new(ShaderId::LightVert, ShaderId::LightTextureFrag);
    /// Per-vertex colors for immediate-mode shapes.
    pub const IMMEDIATE: Self = Self::new(ShaderId::ImmediateVert, ShaderId::VertexColorFrag);

    pub const fn new(vertex: ShaderId, fragment: ShaderId) -> Self {
        Self { vertex, fragment }
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}+{:?}", self.vertex, self.fragment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    pub location: u32,
    pub kind: GlType,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo<L> {
    pub location: L,
    pub kind: GlType,
    pub size: i32,
    pub sampler_slot: Option<u32>,
}

/// A value headed for a uniform. The variant must agree with the declared
/// GPU type; arrays go through `Floats`.
#[derive(Debug, Clone, Copy)]
pub enum UniformValue<'a, T> {
    Float(f32),
    Floats(&'a [f32]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3(Mat3),
    Mat4(Mat4),
    Bool(bool),
    Int(i32),
    Sampler(T),
}

pub struct ShaderProgram<C: GlContext> {
    key: ProgramKey,
    program: C::Program,
    attributes: HashMap<String, AttributeInfo>,
    uniforms: HashMap<String, UniformInfo<C::UniformLocation>>,
}

impl<C: GlContext> ShaderProgram<C> {
    pub fn key(&self) -> ProgramKey {
        self.key
    }

    pub fn handle(&self) -> C::Program {
        self.program
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.get(name)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformInfo<C::UniformLocation>> {
        self.uniforms.get(name)
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Number of elements `name` was declared with (1 for non-arrays).
    pub fn uniform_capacity(&self, name: &str) -> Option<usize> {
        self.uniforms.get(name).map(|u| u.size.max(0) as usize)
    }
}

pub struct ShaderCache<C: GlContext> {
    programs: HashMap<ProgramKey, ShaderProgram<C>>,
    compile_count: usize,
}

impl<C: GlContext> ShaderCache<C> {
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
            compile_count: 0,
        }
    }

    /// Returns the program for `key`, compiling and linking it on first use.
    /// A failed build leaves the cache untouched.
    pub fn get_or_create(
        &mut self,
        gl: &mut C,
        sources: &dyn ShaderSource,
        key: ProgramKey,
    ) -> Result<&ShaderProgram<C>, RendererError> {
        match self.programs.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let program = build_program(gl, sources, key)?;
                self.compile_count += 1;
                debug!(
                    "Compiled shader program {} ({} attributes, {} uniforms)",
                    key,
                    program.attributes.len(),
                    program.uniforms.len()
                );
                Ok(entry.insert(program))
            }
        }
    }

    pub fn get(&self, key: ProgramKey) -> Option<&ShaderProgram<C>> {
        self.programs.get(&key)
    }

    /// Writes `value` to `name` on the program for `key`, which must be the
    /// bound program. Names the program does not declare are ignored.
    pub fn set_uniform(
        &self,
        gl: &mut C,
        key: ProgramKey,
        name: &str,
        value: UniformValue<'_, C::Texture>,
    ) -> Result<(), RendererError> {
        let Some(uniform) = self.programs.get(&key).and_then(|p| p.uniform(name)) else {
            trace!("Ignoring uniform {} not declared by {}", name, key);
            return Ok(());
        };
        write_uniform(gl, name, uniform, value)
    }

    /// Number of programs built since the cache was created.
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Deletes every program from `gl` and empties the cache.
    pub fn release(&mut self, gl: &mut C) {
        for (_, program) in self.programs.drain() {
            gl.delete_program(program.program);
        }
    }
}

impl<C: GlContext> Default for ShaderCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn build_program<C: GlContext>(
    gl: &mut C,
    sources: &dyn ShaderSource,
    key: ProgramKey,
) -> Result<ShaderProgram<C>, RendererError> {
    let vertex_source = sources
        .source(key.vertex)
        .ok_or(RendererError::MissingShaderSource(key.vertex))?;
    let fragment_source = sources
        .source(key.fragment)
        .ok_or(RendererError::MissingShaderSource(key.fragment))?;

    let vertex = gl
        .compile_shader(ShaderStage::Vertex, &vertex_source)
        .map_err(|log| RendererError::ShaderCompile {
            stage: ShaderStage::Vertex,
            id: key.vertex,
            log,
        })?;
    let fragment = match gl.compile_shader(ShaderStage::Fragment, &fragment_source) {
        Ok(shader) => shader,
        Err(log) => {
            gl.delete_shader(vertex);
            return Err(RendererError::ShaderCompile {
                stage: ShaderStage::Fragment,
                id: key.fragment,
                log,
            });
        }
    };

    let linked = gl.link_program(vertex, fragment);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);
    let program = linked.map_err(|log| RendererError::ProgramLink { key, log })?;

    let mut attributes = HashMap::new();
    for attribute in gl.active_attributes(program) {
        let Some(location) = gl.attribute_location(program, &attribute.name) else {
            continue;
        };
        attributes.insert(
            attribute.name,
            AttributeInfo {
                location,
                kind: attribute.kind,
                size: attribute.size,
            },
        );
    }

    let mut uniforms = HashMap::new();
    let mut next_sampler = 0u32;
    for uniform in gl.active_uniforms(program) {
        let Some(location) = gl.uniform_location(program, &uniform.name) else {
            continue;
        };
        let sampler_slot = (uniform.kind == GlType::Sampler2D).then(|| {
            next_sampler += 1;
            next_sampler - 1
        });
        let name = uniform
            .name
            .strip_suffix("[0]")
            .unwrap_or(&uniform.name)
            .to_string();
        uniforms.insert(
            name,
            UniformInfo {
                location,
                kind: uniform.kind,
                size: uniform.size,
                sampler_slot,
            },
        );
    }

    Ok(ShaderProgram {
        key,
        program,
        attributes,
        uniforms,
    })
}

fn write_uniform<C: GlContext>(
    gl: &mut C,
    name: &str,
    uniform: &UniformInfo<C::UniformLocation>,
    value: UniformValue<'_, C::Texture>,
) -> Result<(), RendererError> {
    let mismatch = || RendererError::UniformTypeMismatch {
        name: name.to_string(),
        expected: uniform.kind,
    };
    let location = &uniform.location;

    match (uniform.kind, value) {
        (GlType::Float, UniformValue::Float(v)) => gl.uniform_f32_slice(location, 1, &[v]),
        (GlType::FloatVec3, UniformValue::Vec3(v)) => gl.uniform_f32_slice(location, 3, &v),
        (GlType::FloatVec4, UniformValue::Vec4(v)) => gl.uniform_f32_slice(location, 4, &v),
        (
            kind @ (GlType::Float | GlType::FloatVec2 | GlType::FloatVec3 | GlType::FloatVec4),
            UniformValue::Floats(data),
        ) => {
            let components = kind.components().unwrap_or(1);
            let capacity = components * uniform.size.max(1) as usize;
            if data.is_empty() || data.len() % components != 0 || data.len() > capacity {
                return Err(mismatch());
            }
            gl.uniform_f32_slice(location, components, data);
        }
        (GlType::FloatMat3, UniformValue::Mat3(m)) => {
            gl.uniform_matrix_f32_slice(location, 3, &m.to_cols_array())
        }
        (GlType::FloatMat4, UniformValue::Mat4(m)) => {
            gl.uniform_matrix_f32_slice(location, 4, &m.to_cols_array())
        }
        (GlType::Bool | GlType::Int, UniformValue::Bool(b)) => {
            gl.uniform_i32_slice(location, &[i32::from(b)])
        }
        (GlType::Bool | GlType::Int, UniformValue::Int(v)) => gl.uniform_i32_slice(location, &[v]),
        (GlType::Sampler2D, UniformValue::Sampler(texture)) => {
            let slot = uniform.sampler_slot.ok_or_else(mismatch)?;
            gl.bind_texture(slot, Some(texture));
            gl.uniform_i32_slice(location, &[slot as i32]);
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::headless::{HeadlessContext, UniformData};
    use crate::settings::ContextAttributes;

    fn context() -> HeadlessContext {
        HeadlessContext::new(ContextAttributes::default(), 4, 4)
    }

    #[test]
    fn second_lookup_hits_cache() {
        let mut gl = context();
        let mut cache = ShaderCache::new();
        let first = cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::LIGHT)
            .unwrap()
            .handle();
        let second = cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::LIGHT)
            .unwrap()
            .handle();
        assert_eq!(first, second);
        assert_eq!(cache.compile_count(), 1);
        assert_eq!(gl.stats().programs_linked, 1);
    }

    #[test]
    fn array_uniforms_use_bare_names() {
        let mut gl = context();
        let mut cache = ShaderCache::new();
        let program = cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::LIGHT)
            .unwrap();
        assert_eq!(program.uniform_capacity("uAmbientColor"), Some(8));
        assert!(program.uniform("uAmbientColor[0]").is_none());
        assert_eq!(program.uniform("uSampler").unwrap().sampler_slot, Some(0));
        assert_eq!(program.uniform("uMaterialColor").unwrap().sampler_slot, None);
        assert!(program.attribute("aTexCoord").is_some());
    }

    #[test]
    fn compile_failure_is_not_cached() {
        let mut gl = context();
        let mut sources: HashMap<ShaderId, String> = HashMap::new();
        sources.insert(ShaderId::NormalVert, "void main() {}".into());
        sources.insert(ShaderId::BasicFrag, "#error no precision\nvoid main() {}".into());
        let mut cache = ShaderCache::new();

        let err = cache
            .get_or_create(&mut gl, &sources, ProgramKey::BASIC)
            .err()
            .unwrap();
        match err {
            RendererError::ShaderCompile { stage, id, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(id, ShaderId::BasicFrag);
                assert!(log.contains("no precision"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(cache.is_empty());
        assert_eq!(cache.compile_count(), 0);
    }

    #[test]
    fn vertex_compile_failure_is_not_cached() {
        let mut gl = context();
        let mut sources: HashMap<ShaderId, String> = HashMap::new();
        sources.insert(ShaderId::NormalVert, "#error bad vertex\nvoid main() {}".into());
        sources.insert(ShaderId::BasicFrag, "void main() {}".into());
        let mut cache = ShaderCache::new();

        let err = cache
            .get_or_create(&mut gl, &sources, ProgramKey::BASIC)
            .err()
            .unwrap();
        match err {
            RendererError::ShaderCompile { stage, id, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert_eq!(id, ShaderId::NormalVert);
                assert!(log.contains("bad vertex"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(cache.is_empty());
        assert_eq!(cache.compile_count(), 0);
        assert_eq!(gl.stats().shaders_compiled, 0);
    }

    #[test]
    fn link_failure_is_not_cached() {
        let mut gl = context();
        let mut sources: HashMap<ShaderId, String> = HashMap::new();
        sources.insert(ShaderId::NormalVert, "void main() {}".into());
        sources.insert(ShaderId::BasicFrag, "varying vec2 vUv;\nvoid main() {}".into());
        let mut cache = ShaderCache::new();

        let err = cache
            .get_or_create(&mut gl, &sources, ProgramKey::BASIC)
            .err()
            .unwrap();
        match err {
            RendererError::ProgramLink { key, log } => {
                assert_eq!(key, ProgramKey::BASIC);
                assert!(log.contains("vUv"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(cache.is_empty());
        assert_eq!(cache.compile_count(), 0);
        assert_eq!(gl.stats().programs_linked, 0);
    }

    #[test]
    fn release_deletes_programs() {
        let mut gl = context();
        let mut cache = ShaderCache::new();
        cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::NORMAL)
            .unwrap();
        cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::LIGHT)
            .unwrap();
        assert_eq!(gl.live_programs(), 2);
        cache.release(&mut gl);
        assert!(cache.is_empty());
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn missing_source_is_reported() {
        let mut gl = context();
        let sources: HashMap<ShaderId, String> = HashMap::new();
        let mut cache = ShaderCache::new();
        let err = cache
            .get_or_create(&mut gl, &sources, ProgramKey::NORMAL)
            .err()
            .unwrap();
        assert_eq!(err, RendererError::MissingShaderSource(ShaderId::NormalVert));
    }

    #[test]
    fn typed_writes_dispatch_on_declared_type() {
        let mut gl = context();
        let mut cache = ShaderCache::new();
        let handle = cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::LIGHT)
            .unwrap()
            .handle();
        gl.use_program(Some(handle));
        let key = ProgramKey::LIGHT;

        cache
            .set_uniform(&mut gl, key, "uSpecular", UniformValue::Bool(true))
            .unwrap();
        cache
            .set_uniform(&mut gl, key, "uAmbientColor", UniformValue::Floats(&[0.5, 0.5, 0.5]))
            .unwrap();
        cache
            .set_uniform(&mut gl, key, "uModelViewMatrix", UniformValue::Mat4(Mat4::IDENTITY))
            .unwrap();

        assert_eq!(
            gl.uniform_value(handle, "uSpecular"),
            Some(&UniformData::Ints(vec![1]))
        );
        assert_eq!(
            gl.uniform_value(handle, "uAmbientColor"),
            Some(&UniformData::Floats(vec![0.5, 0.5, 0.5]))
        );
        assert_eq!(
            gl.uniform_value(handle, "uModelViewMatrix")
                .and_then(UniformData::floats)
                .map(<[f32]>::len),
            Some(16)
        );
    }

    #[test]
    fn mismatched_and_unknown_uniforms() {
        let mut gl = context();
        let mut cache = ShaderCache::new();
        let handle = cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::BASIC)
            .unwrap()
            .handle();
        gl.use_program(Some(handle));

        assert!(cache
            .set_uniform(&mut gl, ProgramKey::BASIC, "uNoSuchThing", UniformValue::Float(1.0))
            .is_ok());
        let err = cache
            .set_uniform(&mut gl, ProgramKey::BASIC, "uMaterialColor", UniformValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, RendererError::UniformTypeMismatch { .. }));
        assert!(cache
            .set_uniform(&mut gl, ProgramKey::BASIC, "uMaterialColor", UniformValue::Floats(&[1.0; 8]))
            .is_err());
    }

    #[test]
    fn sampler_binds_to_assigned_slot() {
        let mut gl = context();
        let texture = gl.create_texture(1, 1, &[255; 4]).unwrap();
        let mut cache = ShaderCache::new();
        let handle = cache
            .get_or_create(&mut gl, &BuiltinShaders, ProgramKey::LIGHT)
            .unwrap()
            .handle();
        gl.use_program(Some(handle));
        cache
            .set_uniform(&mut gl, ProgramKey::LIGHT, "uSampler", UniformValue::Sampler(texture))
            .unwrap();
        assert_eq!(gl.bound_texture(0), Some(texture));
        assert_eq!(
            gl.uniform_value(handle, "uSampler"),
            Some(&UniformData::Ints(vec![0]))
        );
    }
}
