use glam::Vec3;

use crate::error::RendererError;

pub(crate) const AMBIENT_COUNT: &str = "uAmbientLightCount";
pub(crate) const AMBIENT_COLOR: &str = "uAmbientColor";
pub(crate) const DIRECTIONAL_COUNT: &str = "uDirectionalLightCount";
pub(crate) const DIRECTIONAL_COLOR: &str = "uDirectionalColor";
pub(crate) const DIRECTIONAL_DIRECTION: &str = "uLightingDirection";
pub(crate) const POINT_COUNT: &str = "uPointLightCount";
pub(crate) const POINT_COLOR: &str = "uPointLightColor";
pub(crate) const POINT_LOCATION: &str = "uPointLightLocation";
pub(crate) const USE_LIGHTING: &str = "uUseLighting";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
}

/// A light direction or position: three numbers or one vector.
#[derive(Debug, Clone, PartialEq)]
pub enum LightVector {
    Components(f32, f32, f32),
    Vector(Vec3),
    Values(Vec<f32>),
}

impl LightVector {
    pub fn resolve(&self) -> Result<Vec3, RendererError> {
        let v = match self {
            LightVector::Components(x, y, z) => Vec3::new(*x, *y, *z),
            LightVector::Vector(v) => *v,
            LightVector::Values(values) => match values.as_slice() {
                [x, y, z] => Vec3::new(*x, *y, *z),
                other => {
                    return Err(RendererError::InvalidLightArguments(format!(
                        "expected x, y and z, got {} values",
                        other.len()
                    )))
                }
            },
        };
        if !v.is_finite() {
            return Err(RendererError::InvalidLightArguments(format!(
                "non-finite light vector {:?}",
                v
            )));
        }
        Ok(v)
    }
}

impl From<(f32, f32, f32)> for LightVector {
    fn from((x, y, z): (f32, f32, f32)) -> Self {
        LightVector::Components(x, y, z)
    }
}

impl From<[f32; 3]> for LightVector {
    fn from([x, y, z]: [f32; 3]) -> Self {
        LightVector::Components(x, y, z)
    }
}

impl From<Vec3> for LightVector {
    fn from(v: Vec3) -> Self {
        LightVector::Vector(v)
    }
}

impl From<&[f32]> for LightVector {
    fn from(values: &[f32]) -> Self {
        LightVector::Values(values.to_vec())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LightCounts {
    pub ambient: usize,
    pub directional: usize,
    pub point: usize,
}

impl LightCounts {
    pub fn total(&self) -> usize {
        self.ambient + self.directional + self.point
    }
}

/// Lights added since the last reset, packed the way the light shader's
/// uniform arrays expect (three floats per entry). Counts are derived from
/// the packed data, so they always match what has been written.
#[derive(Debug, Default, Clone)]
pub struct LightAccumulator {
    ambient_colors: Vec<f32>,
    directional_colors: Vec<f32>,
    directional_directions: Vec<f32>,
    point_colors: Vec<f32>,
    point_locations: Vec<f32>,
}

impl LightAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.ambient_colors.clear();
        self.directional_colors.clear();
        self.directional_directions.clear();
        self.point_colors.clear();
        self.point_locations.clear();
    }

    pub fn counts(&self) -> LightCounts {
        LightCounts {
            ambient: self.ambient_colors.len() / 3,
            directional: self.directional_colors.len() / 3,
            point: self.point_colors.len() / 3,
        }
    }

    pub fn add_ambient(&mut self, color: [f32; 3], capacity: usize) -> Result<(), RendererError> {
        check_capacity(LightKind::Ambient, self.counts().ambient, capacity)?;
        self.ambient_colors.extend_from_slice(&color);
        Ok(())
    }

    pub fn add_directional(
        &mut self,
        color: [f32; 3],
        direction: Vec3,
        capacity: usize,
    ) -> Result<(), RendererError> {
        check_capacity(LightKind::Directional, self.counts().directional, capacity)?;
        self.directional_colors.extend_from_slice(&color);
        self.directional_directions
            .extend_from_slice(&direction.to_array());
        Ok(())
    }

    pub fn add_point(
        &mut self,
        color: [f32; 3],
        location: Vec3,
        capacity: usize,
    ) -> Result<(), RendererError> {
        check_capacity(LightKind::Point, self.counts().point, capacity)?;
        self.point_colors.extend_from_slice(&color);
        self.point_locations.extend_from_slice(&location.to_array());
        Ok(())
    }

    pub fn ambient_colors(&self) -> &[f32] {
        &self.ambient_colors
    }

    pub fn directional_colors(&self) -> &[f32] {
        &self.directional_colors
    }

    pub fn directional_directions(&self) -> &[f32] {
        &self.directional_directions
    }

    pub fn point_colors(&self) -> &[f32] {
        &self.point_colors
    }

    pub fn point_locations(&self) -> &[f32] {
        &self.point_locations
    }
}

fn check_capacity(kind: LightKind, used: usize, capacity: usize) -> Result<(), RendererError> {
    if used >= capacity {
        return Err(RendererError::LightCapacityExceeded { kind, capacity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_written_entries() {
        let mut lights = LightAccumulator::new();
        lights.add_ambient([0.1, 0.2, 0.3], 8).unwrap();
        lights.add_point([1.0; 3], Vec3::new(0.0, 0.0, 5.0), 8).unwrap();
        lights.add_point([1.0; 3], Vec3::ZERO, 8).unwrap();
        assert_eq!(
            lights.counts(),
            LightCounts {
                ambient: 1,
                directional: 0,
                point: 2
            }
        );
        assert_eq!(&lights.point_locations()[..3], &[0.0, 0.0, 5.0]);

        lights.reset();
        assert_eq!(lights.counts().total(), 0);
    }

    #[test]
    fn capacity_is_enforced_without_partial_writes() {
        let mut lights = LightAccumulator::new();
        lights.add_directional([1.0; 3], Vec3::X, 1).unwrap();
        let err = lights
            .add_directional([1.0; 3], Vec3::Y, 1)
            .unwrap_err();
        assert_eq!(
            err,
            RendererError::LightCapacityExceeded {
                kind: LightKind::Directional,
                capacity: 1
            }
        );
        assert_eq!(lights.directional_directions().len(), 3);
    }

    #[test]
    fn light_vector_shapes() {
        assert_eq!(LightVector::from((1.0, 2.0, 3.0)).resolve().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(LightVector::from(Vec3::Z).resolve().unwrap(), Vec3::Z);
        assert!(matches!(
            LightVector::from(&[1.0, 2.0][..]).resolve(),
            Err(RendererError::InvalidLightArguments(_))
        ));
        assert!(LightVector::from((f32::NAN, 0.0, 0.0)).resolve().is_err());
    }
}
