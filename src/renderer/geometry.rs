//! Retained meshes: CPU-side construction and the GPU buffers they are
//! uploaded into.

use std::collections::HashSet;
use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::error::RendererError;
use crate::renderer::gl::{GlContext, Primitive};
use crate::renderer::material::DrawMode;
use crate::renderer::shader::ShaderProgram;

/// Largest vertex count addressable with 16-bit indices.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub faces: Vec<[u16; 3]>,
}

impl Geometry {
    /// Axis-aligned box centred on the origin, four vertices per face so
    /// each face keeps its own normal.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        // (normal, u axis, v axis) with u x v = normal
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let size = Vec3::new(width, height, depth);
        let mut geometry = Geometry::default();

        for (normal, u, v) in FACES {
            let base = geometry.positions.len() as u16;
            let center = normal * 0.5;
            let corners = [
                (center - u * 0.5 - v * 0.5, Vec2::new(0.0, 1.0)),
                (center + u * 0.5 - v * 0.5, Vec2::new(1.0, 1.0)),
                (center + u * 0.5 + v * 0.5, Vec2::new(1.0, 0.0)),
                (center - u * 0.5 + v * 0.5, Vec2::new(0.0, 0.0)),
            ];
            for (position, uv) in corners {
                geometry.positions.push(position * size);
                geometry.normals.push(normal);
                geometry.uvs.push(uv);
            }
            geometry.faces.push([base, base + 1, base + 2]);
            geometry.faces.push([base, base + 2, base + 3]);
        }
        geometry
    }

    /// UV sphere. Detail is clamped so the mesh fits 16-bit indices.
    pub fn sphere(radius: f32, detail_x: u32, detail_y: u32) -> Self {
        let segments = detail_x.clamp(3, 128);
        let rings = detail_y.clamp(2, 128);
        let mut geometry = Geometry::default();

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for segment in 0..=segments {
                let theta = 2.0 * PI * segment as f32 / segments as f32;
                let normal = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                geometry.positions.push(normal * radius);
                geometry.normals.push(normal);
                geometry.uvs.push(Vec2::new(
                    segment as f32 / segments as f32,
                    ring as f32 / rings as f32,
                ));
            }
        }

        for ring in 0..rings {
            for segment in 0..segments {
                let current = (ring * (segments + 1) + segment) as u16;
                let next = current + segments as u16 + 1;
                geometry.faces.push([current, current + 1, next]);
                geometry.faces.push([current + 1, next + 1, next]);
            }
        }
        geometry
    }

    /// Quad in the XY plane facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Geometry {
            positions: vec![
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
            uvs: vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ],
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Unique triangle edges in first-seen order, used for wireframe draws.
    pub fn edges(&self) -> Vec<[u16; 2]> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for &[a, b, c] in &self.faces {
            for (from, to) in [(a, b), (b, c), (c, a)] {
                let edge = [from.min(to), from.max(to)];
                if seen.insert(edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    fn validate(&self) -> Result<(), RendererError> {
        let n = self.positions.len();
        if n > MAX_VERTICES {
            return Err(RendererError::BufferCreation(format!(
                "{} vertices do not fit 16-bit indices",
                n
            )));
        }
        if self.normals.len() != n || self.uvs.len() != n {
            return Err(RendererError::BufferCreation(format!(
                "attribute lengths differ: {} positions, {} normals, {} uvs",
                n,
                self.normals.len(),
                self.uvs.len()
            )));
        }
        if let Some(face) = self.faces.iter().find(|f| f.iter().any(|&i| i as usize >= n)) {
            return Err(RendererError::BufferCreation(format!(
                "face {:?} indexes past {} vertices",
                face, n
            )));
        }
        Ok(())
    }
}

/// A [`Geometry`] living in GPU buffers.
pub struct GpuGeometry<C: GlContext> {
    positions: C::Buffer,
    normals: C::Buffer,
    uvs: C::Buffer,
    triangles: C::Buffer,
    triangle_indices: i32,
    edges: C::Buffer,
    edge_indices: i32,
}

impl<C: GlContext> GpuGeometry<C> {
    pub fn upload(gl: &mut C, geometry: &Geometry) -> Result<Self, RendererError> {
        geometry.validate()?;

        let positions: Vec<f32> = geometry.positions.iter().flat_map(|p| p.to_array()).collect();
        let normals: Vec<f32> = geometry.normals.iter().flat_map(|n| n.to_array()).collect();
        let uvs: Vec<f32> = geometry.uvs.iter().flat_map(|uv| uv.to_array()).collect();
        let triangles: Vec<u16> = geometry.faces.iter().flatten().copied().collect();
        let edges: Vec<u16> = geometry.edges().into_iter().flatten().collect();

        let mut buffer = || gl.create_buffer().map_err(RendererError::BufferCreation);
        let handles = [buffer()?, buffer()?, buffer()?, buffer()?, buffer()?];
        let [pos_buf, normal_buf, uv_buf, tri_buf, edge_buf] = handles;

        gl.upload_vertices(pos_buf, &positions);
        gl.upload_vertices(normal_buf, &normals);
        gl.upload_vertices(uv_buf, &uvs);
        gl.upload_indices(tri_buf, &triangles);
        gl.upload_indices(edge_buf, &edges);

        log::debug!(
            "Uploaded geometry: {} vertices, {} triangles",
            geometry.vertex_count(),
            geometry.faces.len()
        );

        Ok(Self {
            positions: pos_buf,
            normals: normal_buf,
            uvs: uv_buf,
            triangles: tri_buf,
            triangle_indices: triangles.len() as i32,
            edges: edge_buf,
            edge_indices: edges.len() as i32,
        })
    }

    /// Binds whichever of position/normal/uv the program consumes and
    /// issues the draw. Wireframe draws the edge list as lines.
    pub fn draw(&self, gl: &mut C, program: &ShaderProgram<C>, mode: DrawMode) {
        for (name, buffer, components) in [
            ("aPosition", self.positions, 3),
            ("aNormal", self.normals, 3),
            ("aTexCoord", self.uvs, 2),
        ] {
            if let Some(attribute) = program.attribute(name) {
                gl.vertex_attribute(attribute.location, buffer, components);
            }
        }
        match mode {
            DrawMode::Wireframe => gl.draw_elements(Primitive::Lines, self.edges, self.edge_indices),
            DrawMode::Fill | DrawMode::Texture => {
                gl.draw_elements(Primitive::Triangles, self.triangles, self.triangle_indices)
            }
        }
    }

    pub fn release(self, gl: &mut C) {
        for buffer in [self.positions, self.normals, self.uvs, self.triangles, self.edges] {
            gl.delete_buffer(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_faces_wind_outward() {
        let geometry = Geometry::cuboid(2.0, 4.0, 6.0);
        assert_eq!(geometry.vertex_count(), 24);
        assert_eq!(geometry.faces.len(), 12);
        for face in &geometry.faces {
            let [a, b, c] = face.map(|i| geometry.positions[i as usize]);
            let winding = (b - a).cross(c - a).normalize();
            assert!(winding.abs_diff_eq(geometry.normals[face[0] as usize], 1e-5));
        }
        let max = geometry
            .positions
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc.max(p.abs()));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn sphere_detail_is_clamped_to_index_range() {
        let geometry = Geometry::sphere(1.0, 10_000, 10_000);
        assert!(geometry.vertex_count() <= MAX_VERTICES);
        assert!(geometry.validate().is_ok());
        for (p, n) in geometry.positions.iter().zip(&geometry.normals) {
            assert!((n.length() - 1.0).abs() < 1e-4);
            assert!(p.abs_diff_eq(*n, 1e-6));
        }
    }

    #[test]
    fn quad_edges_include_diagonal_once() {
        let edges = Geometry::plane(1.0, 1.0).edges();
        assert_eq!(edges.len(), 5);
        assert!(edges.contains(&[0, 2]));
    }

    #[test]
    fn mismatched_attributes_are_rejected() {
        let mut geometry = Geometry::plane(1.0, 1.0);
        geometry.uvs.pop();
        assert!(matches!(
            geometry.validate(),
            Err(RendererError::BufferCreation(_))
        ));
    }
}
