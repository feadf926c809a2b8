//! Penumbra - deferred renderer with screen-space occlusion
//!
//! One render graph drives four pipeline variants over a shared skeleton:
//!
//! - Geometry pass writes view-space position, normal and albedo+specular
//! - Occlusion pass estimates ambient (SSAO) or directional (SSDO) occlusion
//! - Blur pass removes the noise-tile pattern from the occlusion buffer
//! - Lighting pass composes attenuated Blinn-Phong point lights
//! - Depth transplant copies G-buffer depth into the display depth buffer
//! - Overlay pass draws light markers and the skybox against that depth
//!
//! The `reference` module evaluates the same math on the CPU.

pub mod assets;
pub mod config;
pub mod graph;
pub mod kernel;
pub mod light;
pub mod mesh;
pub mod passes;
pub mod pipeline;
pub mod reference;
pub mod resources;
pub mod shaders;
pub mod variant;

mod camera;
mod renderer;

pub use camera::{Camera, CameraUniform};
pub use config::{LightingSettings, OcclusionSettings, RendererConfig};
pub use kernel::{NoiseTile, OcclusionKernel};
pub use light::LightSource;
pub use mesh::{GpuMesh, Model, ModelMesh, Vertex};
pub use renderer::{FrameInputs, Renderer};
pub use variant::{OcclusionStrategy, PipelineVariant, StageFlags};

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or driving the renderer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Resource construction error: {0}")]
    Resource(String),

    #[error("Shader build error: {0}")]
    Shader(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Asset load error: {0}")]
    Asset(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WGPU error: {0}")]
    Wgpu(String),
}

impl From<wgpu::Error> for Error {
    fn from(err: wgpu::Error) -> Self {
        Error::Wgpu(err.to_string())
    }
}
