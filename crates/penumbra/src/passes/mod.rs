//! Built-in render passes
//!
//! One pass per stage of the frame skeleton. Each pass builds its pipelines
//! up front through the shared `PipelineCache`, so shader and pipeline
//! errors surface when the renderer is constructed.

pub mod blur;
pub mod depth_transplant;
pub mod geometry;
pub mod lighting;
pub mod occlusion;
pub mod overlay;

pub use blur::BlurPass;
pub use depth_transplant::DepthTransplantPass;
pub use geometry::GeometryPass;
pub use lighting::LightingPass;
pub use occlusion::OcclusionPass;
pub use overlay::OverlayPass;
