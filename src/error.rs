use crate::renderer::gl::{GlType, ShaderStage};
use crate::renderer::lights::LightKind;
use crate::renderer::shader::{ProgramKey, ShaderId};

#[derive(Debug, Clone, PartialEq)]
pub enum RendererError {
    ContextCreation(String),
    MissingShaderSource(ShaderId),
    ShaderCompile {
        stage: ShaderStage,
        id: ShaderId,
        log: String,
    },
    ProgramLink {
        key: ProgramKey,
        log: String,
    },
    MatrixStackUnderflow,
    DegenerateTransform(&'static str),
    InvalidLightArguments(String),
    InvalidColorArguments(String),
    LightCapacityExceeded {
        kind: LightKind,
        capacity: usize,
    },
    UniformTypeMismatch {
        name: String,
        expected: GlType,
    },
    TextureCreation(String),
    BufferCreation(String),
    UnknownTexture,
}

impl std::fmt::Display for RendererError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RendererError::ContextCreation(e) => write!(f, "Context creation failed: {}", e),
            RendererError::MissingShaderSource(id) => {
                write!(f, "No shader source registered for {:?}", id)
            }
            RendererError::ShaderCompile { stage, id, log } => {
                write!(f, "{:?} shader {:?} failed to compile: {}", stage, id, log)
            }
            RendererError::ProgramLink { key, log } => {
                write!(f, "Program {} failed to link: {}", key, log)
            }
            RendererError::MatrixStackUnderflow => {
                write!(f, "pop() called without a matching push()")
            }
            RendererError::DegenerateTransform(what) => {
                write!(f, "Degenerate transform: {}", what)
            }
            RendererError::InvalidLightArguments(e) => write!(f, "Invalid light arguments: {}", e),
            RendererError::InvalidColorArguments(e) => write!(f, "Invalid color arguments: {}", e),
            RendererError::LightCapacityExceeded { kind, capacity } => write!(
                f,
                "Too many {:?} lights: the shader only declares {} slots",
                kind, capacity
            ),
            RendererError::UniformTypeMismatch { name, expected } => write!(
                f,
                "Value written to uniform {} does not match its declared type {:?}",
                name, expected
            ),
            RendererError::TextureCreation(e) => write!(f, "Texture creation failed: {}", e),
            RendererError::BufferCreation(e) => write!(f, "Buffer creation failed: {}", e),
            RendererError::UnknownTexture => write!(f, "Texture handle does not belong to this renderer"),
        }
    }
}

impl std::error::Error for RendererError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_keeps_diagnostic_text() {
        let err = RendererError::ShaderCompile {
            stage: ShaderStage::Fragment,
            id: ShaderId::BasicFrag,
            log: "ERROR: 0:3: 'foo' : undeclared identifier".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("BasicFrag"));
        assert!(text.contains("undeclared identifier"));
    }
}
