//! Built-in WGSL sources
//!
//! Specialization constants are declared by the pipeline cache as `override`
//! items prepended to each source; the shaders only reference them.

pub const GEOMETRY: &str = include_str!("../../shaders/passes/geometry.wgsl");
pub const OCCLUSION: &str = include_str!("../../shaders/passes/occlusion.wgsl");
pub const BLUR: &str = include_str!("../../shaders/passes/blur.wgsl");
pub const LIGHTING: &str = include_str!("../../shaders/passes/lighting.wgsl");
pub const LIGHT_MARKER: &str = include_str!("../../shaders/passes/light_marker.wgsl");
pub const SKYBOX: &str = include_str!("../../shaders/passes/skybox.wgsl");
pub const DEPTH_TRANSPLANT: &str = include_str!("../../shaders/passes/depth_transplant.wgsl");
