//! Immediate-mode shapes: vertices collected between `begin_shape` and
//! `end_shape`, colored per vertex with the fill color current at the time
//! each vertex was added.

use glam::Vec3;
use log::warn;

use crate::color::Color;
use crate::error::RendererError;
use crate::renderer::gl::{ContextFactory, GlContext, Primitive};
use crate::renderer::material::{DrawMode, MATERIAL_COLOR};
use crate::renderer::renderer::Renderer;
use crate::renderer::shader::{ProgramKey, UniformValue};

const POINT_SIZE: &str = "uPointSize";

#[derive(Debug, Clone, PartialEq)]
pub struct ImmediateShape {
    primitive: Primitive,
    positions: Vec<f32>,
    colors: Vec<f32>,
    /// Program to restore once the shape is drawn.
    previous_shader: Option<ProgramKey>,
}

impl ImmediateShape {
    fn new(primitive: Primitive, previous_shader: Option<ProgramKey>) -> Self {
        Self {
            primitive,
            positions: Vec::new(),
            colors: Vec::new(),
            previous_shader,
        }
    }

    fn push(&mut self, position: Vec3, color: Color) {
        self.positions.extend_from_slice(&position.to_array());
        self.colors.extend_from_slice(&color.rgba());
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub(crate) fn previous_shader(&self) -> Option<ProgramKey> {
        self.previous_shader
    }
}

/// Vertex buffers reused by every immediate-mode draw.
pub(crate) struct ImmediateBuffers<B> {
    positions: B,
    colors: B,
}

impl<B> ImmediateBuffers<B> {
    pub(crate) fn release<C: GlContext<Buffer = B>>(self, gl: &mut C) {
        gl.delete_buffer(self.positions);
        gl.delete_buffer(self.colors);
    }
}

impl<F: ContextFactory> Renderer<F> {
    pub fn begin_shape(&mut self, primitive: Primitive) -> Result<(), RendererError> {
        let previous = match self.immediate.take() {
            Some(open) => {
                warn!("begin_shape() called inside an open shape; discarding the open shape");
                open.previous_shader
            }
            None => self.current_shader,
        };
        self.use_shader(ProgramKey::IMMEDIATE)?;
        self.immediate = Some(ImmediateShape::new(primitive, previous));
        Ok(())
    }

    /// Adds a vertex, transformed by the model-view matrix at draw time.
    pub fn vertex(&mut self, x: f32, y: f32, z: f32) {
        let fill = self.fill_color;
        match self.immediate.as_mut() {
            Some(shape) => shape.push(Vec3::new(x, y, z), fill),
            None => warn!("vertex() called outside begin_shape()/end_shape()"),
        }
    }

    pub fn is_drawing_immediate(&self) -> bool {
        self.immediate.is_some()
    }

    pub fn end_shape(&mut self) -> Result<(), RendererError> {
        let Some(shape) = self.immediate.take() else {
            warn!("end_shape() called without begin_shape()");
            return Ok(());
        };
        if shape.vertex_count() > 0 {
            self.draw_immediate(&shape)?;
        }
        if let Some(previous) = shape.previous_shader {
            self.use_shader(previous)?;
            if previous == ProgramKey::BASIC && self.draw_mode == DrawMode::Fill {
                // fill() inside the shape only reached the vertex colors
                let fill = self.fill_color;
                self.set_uniform(MATERIAL_COLOR, UniformValue::Vec4(fill.rgba()))?;
            }
        }
        Ok(())
    }

    fn draw_immediate(&mut self, shape: &ImmediateShape) -> Result<(), RendererError> {
        self.use_shader(ProgramKey::IMMEDIATE)?;
        self.set_matrix_uniforms()?;
        let weight = self.stroke_weight;
        self.set_uniform(POINT_SIZE, UniformValue::Float(weight))?;

        let buffers = match self.immediate_buffers.take() {
            Some(buffers) => buffers,
            None => ImmediateBuffers {
                positions: self.gl.create_buffer().map_err(RendererError::BufferCreation)?,
                colors: self.gl.create_buffer().map_err(RendererError::BufferCreation)?,
            },
        };
        self.gl.upload_vertices(buffers.positions, &shape.positions);
        self.gl.upload_vertices(buffers.colors, &shape.colors);

        if let Some(program) = self.shaders.get(ProgramKey::IMMEDIATE) {
            if let Some(position) = program.attribute("aPosition") {
                self.gl.vertex_attribute(position.location, buffers.positions, 3);
            }
            if let Some(color) = program.attribute("aVertexColor") {
                self.gl.vertex_attribute(color.location, buffers.colors, 4);
            }
        }
        self.gl
            .draw_arrays(shape.primitive, 0, shape.vertex_count() as i32);
        self.immediate_buffers = Some(buffers);
        Ok(())
    }
}
